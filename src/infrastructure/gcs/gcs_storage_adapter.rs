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
//! Object storage on GCS through `gcloud storage cp`.
//!
//! Bytes are staged in a local temp file; `close` uploads the file with the
//! writer options applied as object attributes.

use crate::domain::errors::{ExportError, Result};
use crate::ports::storage_port::{ObjectWriter, StoragePort, WriterOptions};
use async_trait::async_trait;
use log::{debug, info};
use std::io::{self, Write};
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;

pub struct GcsStorageAdapter {
    binary: String,
    bucket: String,
}

impl GcsStorageAdapter {
    pub fn new(binary: Option<String>, bucket: &str) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| "gcloud".to_string()),
            bucket: bucket.trim_end_matches('/').to_string(),
        }
    }

    pub fn object_uri(&self, path: &str) -> String {
        format!("gs://{}/{}", self.bucket, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl StoragePort for GcsStorageAdapter {
    async fn open_writer(&self, path: &str, options: WriterOptions) -> Result<Box<dyn ObjectWriter>> {
        let uri = self.object_uri(path);
        let staging = NamedTempFile::new().map_err(|e| ExportError::sink(uri.as_str(), e))?;
        Ok(Box::new(GcsObjectWriter {
            binary: self.binary.clone(),
            uri,
            options,
            staging,
        }))
    }
}

pub struct GcsObjectWriter {
    binary: String,
    uri: String,
    options: WriterOptions,
    staging: NamedTempFile,
}

/// Arguments of the upload, source file first.
pub fn upload_args(source: &str, uri: &str, options: &WriterOptions) -> Vec<String> {
    let mut args = vec![
        "storage".to_string(),
        "cp".to_string(),
        source.to_string(),
        uri.to_string(),
    ];
    if let Some(ct) = &options.content_type {
        args.push(format!("--content-type={}", ct));
    }
    if let Some(ce) = &options.content_encoding {
        args.push(format!("--content-encoding={}", ce));
    }
    if !options.metadata.is_empty() {
        let pairs: Vec<String> = options
            .metadata
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        args.push(format!("--custom-metadata={}", pairs.join(",")));
    }
    args
}

impl Write for GcsObjectWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.staging.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.staging.flush()
    }
}

#[async_trait]
impl ObjectWriter for GcsObjectWriter {
    async fn close(mut self: Box<Self>) -> Result<()> {
        self.staging
            .flush()
            .map_err(|e| ExportError::sink(self.uri.as_str(), e))?;
        let source = self.staging.path().to_string_lossy().into_owned();
        let args = upload_args(&source, &self.uri, &self.options);
        debug!("Running {} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExportError::sink(self.uri.as_str(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExportError::sink(
                self.uri.as_str(),
                format!("upload failed ({}): {}", output.status, stderr.trim()),
            ));
        }
        info!("Uploaded {}", self.uri);
        Ok(())
    }
}
