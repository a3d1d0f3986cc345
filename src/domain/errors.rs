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

//! Core error definitions for the snapshot exporter.
//!
//! This module provides a centralized `ExportError` enum and a `Result` type
//! used throughout the application. Every variant carries enough context
//! (dataset, table, destination) to diagnose a failure without re-running.

use thiserror::Error;

/// Error types encountered during a snapshot run.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Malformed exclusion pattern or invalid settings. Aborts before any export work.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failure enumerating datasets or the tables of one dataset.
    #[error("Catalog error for {scope}: {reason}")]
    CatalogError { scope: String, reason: String },

    /// Submission, wait, or remote-side failure of one table's extract job.
    #[error("Failed to export table {table:?} with URI {destination_uri:?}: {reason}")]
    ExportJobError {
        table: String,
        destination_uri: String,
        reason: String,
    },

    /// Failure opening, writing or closing a metadata artifact.
    #[error("Storage sink error for {path}: {reason}")]
    SinkError { path: String, reason: String },

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Export task panicked: {0}")]
    TaskPanicked(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ExportError {
    pub fn catalog(scope: impl Into<String>, reason: impl ToString) -> Self {
        ExportError::CatalogError {
            scope: scope.into(),
            reason: reason.to_string(),
        }
    }

    pub fn sink(path: impl Into<String>, reason: impl ToString) -> Self {
        ExportError::SinkError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the error only reflects a cancellation signal rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportError::Cancelled(_))
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::SerializationError(e.to_string())
    }
}

/// A specialized Result type for the snapshot exporter.
pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_job_error_carries_context() {
        let err = ExportError::ExportJobError {
            table: "events".to_string(),
            destination_uri: "gs://b/20240101T000000/ds/events/*.parquet.gz".to_string(),
            reason: "quota exceeded".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"events\""));
        assert!(msg.contains("gs://b/20240101T000000/ds/events/*.parquet.gz"));
        assert!(msg.contains("quota exceeded"));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cancelled_is_flagged() {
        assert!(ExportError::Cancelled("shutdown".into()).is_cancelled());
    }
}
