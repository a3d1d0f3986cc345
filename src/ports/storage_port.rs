// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Storage Port
//!
//! The object storage sink. Used only for the metadata side artifacts; table
//! data is written by the extract jobs directly.

use crate::domain::errors::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Write;

/// Optional attributes applied to the stored object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriterOptions {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl WriterOptions {
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_content_encoding(mut self, encoding: &str) -> Self {
        self.content_encoding = Some(encoding.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Opens a writer for the bucket-relative `path`.
    async fn open_writer(&self, path: &str, options: WriterOptions) -> Result<Box<dyn ObjectWriter>>;
}

/// A writable, closable byte sink. Nothing is guaranteed to be visible in
/// storage until `close` returns `Ok`.
#[async_trait]
pub trait ObjectWriter: Write + Send {
    async fn close(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_options_builder() {
        let opts = WriterOptions::default()
            .with_content_type("application/json")
            .with_content_encoding("gzip")
            .with_metadata("run-timestamp", "20240101T000000");
        assert_eq!(opts.content_type.as_deref(), Some("application/json"));
        assert_eq!(opts.content_encoding.as_deref(), Some("gzip"));
        assert_eq!(opts.metadata.get("run-timestamp").map(String::as_str), Some("20240101T000000"));
    }
}
