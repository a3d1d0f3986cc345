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
//! Metadata side artifacts of a snapshot run.
//!
//! INFORMATION_SCHEMA rows are written as one gzip-compressed, newline-free
//! JSON array per object. These artifacts are load-bearing: any failure to
//! write them is a `SinkError` that aborts the run.

use crate::domain::errors::{ExportError, Result};
use crate::domain::run_root::RunRoot;
use crate::ports::catalog_port::SchemaRow;
use crate::ports::storage_port::{StoragePort, WriterOptions};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use std::sync::Arc;

pub struct CatalogArtifacts {
    storage: Arc<dyn StoragePort>,
    run_timestamp: String,
}

impl CatalogArtifacts {
    pub fn new(storage: Arc<dyn StoragePort>, root: &RunRoot) -> Self {
        Self {
            storage,
            run_timestamp: root.timestamp().to_string(),
        }
    }

    /// Stores `rows` at the bucket-relative `path`.
    pub async fn write_rows(&self, path: &str, rows: &[SchemaRow]) -> Result<()> {
        let options = WriterOptions::default()
            .with_content_type("application/json")
            .with_content_encoding("gzip")
            .with_metadata("run-timestamp", &self.run_timestamp);

        let writer = self
            .storage
            .open_writer(path, options)
            .await
            .map_err(|e| sink_error(path, e))?;

        let mut encoder = GzEncoder::new(writer, Compression::default());
        serde_json::to_writer(&mut encoder, rows).map_err(|e| ExportError::sink(path, e))?;
        let writer = encoder.finish().map_err(|e| ExportError::sink(path, e))?;

        writer.close().await.map_err(|e| sink_error(path, e))?;
        info!("Wrote {} rows to {}", rows.len(), path);
        Ok(())
    }
}

fn sink_error(path: &str, err: ExportError) -> ExportError {
    match err {
        ExportError::SinkError { .. } => err,
        other => ExportError::sink(path, other),
    }
}
