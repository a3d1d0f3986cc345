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

//! # Domain Entities
//!
//! The "Nouns" of a snapshot run: the request that drives it, the datasets
//! and tables the catalog hands us, and the outcomes we report back.
//!
//! Everything that leaves the process (reports, artifacts) derives
//! `Serialize` so it can be written as JSON.

use crate::domain::errors::ExportError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable description of one snapshot run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    /// Warehouse project whose datasets are enumerated.
    pub project_id: String,
    /// Bucket that receives every object of the run.
    pub bucket: String,
    /// Region/location the extract jobs run in.
    pub location: String,
    /// Glob patterns matched against `<dataset>.<table>`.
    pub exclusion_patterns: Vec<String>,
    /// Date-partitioned tables strictly older than this are skipped.
    pub retention_cutoff: DateTime<Utc>,
    /// Write the INFORMATION_SCHEMA side artifacts under the run root.
    pub write_catalog_metadata: bool,
    /// Optional cap on concurrent table exports inside one dataset.
    pub parallel: Option<usize>,
}

/// A named grouping of tables, as produced by catalog enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub dataset_id: String,
    pub project_id: String,
}

impl Dataset {
    pub fn new(project_id: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            project_id: project_id.into(),
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project_id, self.dataset_id)
    }
}

/// Kind of a catalog table. Only `Regular` tables have extractable rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableKind {
    Regular,
    View,
    Other(String),
}

impl TableKind {
    /// Maps the warehouse's textual table type (`TABLE`, `VIEW`, `EXTERNAL`, ...).
    pub fn from_warehouse_type(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TABLE" => TableKind::Regular,
            "VIEW" => TableKind::View,
            other => TableKind::Other(other.to_string()),
        }
    }

    pub fn is_regular(&self) -> bool {
        matches!(self, TableKind::Regular)
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Regular => write!(f, "TABLE"),
            TableKind::View => write!(f, "VIEW"),
            TableKind::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// A table as yielded by the catalog listing, before its kind is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableListing {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableListing {
    /// `<dataset>.<table>`, the name exclusion patterns are matched against.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.dataset_id, self.table_id)
    }

    pub fn with_kind(self, kind: TableKind) -> TableRef {
        TableRef {
            project_id: self.project_id,
            dataset_id: self.dataset_id,
            table_id: self.table_id,
            kind,
        }
    }
}

/// A table selected for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
    pub kind: TableKind,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

/// Columnar format the extract job writes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DestinationFormat {
    Parquet,
}

impl DestinationFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DestinationFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for DestinationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationFormat::Parquet => write!(f, "PARQUET"),
        }
    }
}

/// `ExtractJobSpec` is everything the job service needs to start one extract.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractJobSpec {
    pub job_id: String,
    pub table: TableRef,
    pub destination_uri: String,
    pub location: String,
    pub format: DestinationFormat,
    pub gzip: bool,
}

/// Terminal state of an extract job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub job_id: String,
    /// Remote-side failure reported by the job, if any.
    pub error: Option<String>,
}

impl JobStatus {
    pub fn done(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            error: None,
        }
    }

    pub fn failed(job_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            error: Some(error.into()),
        }
    }
}

/// `OutcomeStatus` is the "Report Card" grade of a dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Success,
    /// Nothing to export: empty dataset or every table filtered out.
    Empty,
    Failed,
}

/// Result of one attempted table export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportOutcome {
    pub table_id: String,
    pub destination_uri: String,
    pub success: bool,
    pub error: Option<String>,
    pub job_id: Option<String>,
    /// Wall-clock time from submission to terminal state, in seconds.
    pub duration: f64,
}

impl ExportOutcome {
    pub fn success(table_id: String, destination_uri: String, job_id: String, duration: f64) -> Self {
        Self {
            table_id,
            destination_uri,
            success: true,
            error: None,
            job_id: Some(job_id),
            duration,
        }
    }

    /// A table whose export failed or was stopped by a failing sibling.
    /// Objects may still exist at `destination_uri`.
    pub fn failure(table_id: String, destination_uri: String, error: String) -> Self {
        Self {
            table_id,
            destination_uri,
            success: false,
            error: Some(error),
            job_id: None,
            duration: 0.0,
        }
    }
}

/// What a successful dataset export hands back to the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetExport {
    pub root_uri: String,
    pub tables: Vec<ExportOutcome>,
}

/// A dataset export stopped by its first error.
///
/// `tables` holds one outcome per table that was handed to an export task,
/// successes included. It is empty when the dataset failed before fan-out.
#[derive(Debug)]
pub struct DatasetFailure {
    pub error: ExportError,
    pub tables: Vec<ExportOutcome>,
}

impl From<ExportError> for DatasetFailure {
    fn from(error: ExportError) -> Self {
        Self {
            error,
            tables: Vec::new(),
        }
    }
}

/// Per-dataset record in the snapshot result, including failed datasets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetOutcome {
    pub dataset_id: String,
    pub root_uri: String,
    pub status: OutcomeStatus,
    pub tables: Vec<ExportOutcome>,
    pub error: Option<String>,
}

impl DatasetOutcome {
    pub fn from_export(dataset_id: String, export: DatasetExport) -> Self {
        let status = if export.tables.is_empty() {
            OutcomeStatus::Empty
        } else {
            OutcomeStatus::Success
        };
        Self {
            dataset_id,
            root_uri: export.root_uri,
            status,
            tables: export.tables,
            error: None,
        }
    }

    pub fn failure(
        dataset_id: String,
        root_uri: String,
        error: String,
        tables: Vec<ExportOutcome>,
    ) -> Self {
        Self {
            dataset_id,
            root_uri,
            status: OutcomeStatus::Failed,
            tables,
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

/// Returned to the caller once every dataset has been attempted.
///
/// A run can succeed while individual datasets failed; inspect `datasets`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotResult {
    pub root_uri: String,
    pub run_timestamp: String,
    pub datasets: Vec<DatasetOutcome>,
}

impl SnapshotResult {
    pub fn failed_datasets(&self) -> impl Iterator<Item = &DatasetOutcome> {
        self.datasets.iter().filter(|d| d.is_failed())
    }

    /// Tables whose export finished successfully, failed datasets included.
    pub fn exported_tables(&self) -> usize {
        self.datasets
            .iter()
            .flat_map(|d| d.tables.iter())
            .filter(|t| t.success)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_kind_from_warehouse_type() {
        assert_eq!(TableKind::from_warehouse_type("TABLE"), TableKind::Regular);
        assert_eq!(TableKind::from_warehouse_type("view"), TableKind::View);
        assert_eq!(
            TableKind::from_warehouse_type("EXTERNAL"),
            TableKind::Other("EXTERNAL".to_string())
        );
        assert!(!TableKind::from_warehouse_type("MATERIALIZED_VIEW").is_regular());
    }

    #[test]
    fn test_qualified_name() {
        let listing = TableListing {
            project_id: "p".into(),
            dataset_id: "sales".into(),
            table_id: "orders".into(),
        };
        assert_eq!(listing.qualified_name(), "sales.orders");
        let table = listing.with_kind(TableKind::Regular);
        assert_eq!(table.to_string(), "p:sales.orders");
    }

    #[test]
    fn test_dataset_outcome_grades() {
        let empty = DatasetOutcome::from_export(
            "ds".into(),
            DatasetExport {
                root_uri: "gs://b/t/ds".into(),
                tables: vec![],
            },
        );
        assert_eq!(empty.status, OutcomeStatus::Empty);

        let failed = DatasetOutcome::failure(
            "ds".into(),
            "gs://b/t/ds".into(),
            "boom".into(),
            vec![
                ExportOutcome::success("a".into(), "gs://b/t/ds/a/*".into(), "j".into(), 1.0),
                ExportOutcome::failure("b".into(), "gs://b/t/ds/b/*".into(), "boom".into()),
            ],
        );
        assert!(failed.is_failed());

        let result = SnapshotResult {
            root_uri: "gs://b/t".into(),
            run_timestamp: "t".into(),
            datasets: vec![empty, failed],
        };
        assert_eq!(result.failed_datasets().count(), 1);
        assert_eq!(result.exported_tables(), 1);
    }
}
