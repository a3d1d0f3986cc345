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
//! Run report: a JSON summary of a finished snapshot written to local disk.

use crate::domain::entities::{OutcomeStatus, SnapshotResult};
use crate::domain::errors::{ExportError, Result};
use serde_json::{json, Value};
use std::path::Path;

/// Builds the report document for `result`.
pub fn build_report(result: &SnapshotResult, duration_secs: f64) -> Value {
    let count = |status: OutcomeStatus| result.datasets.iter().filter(|d| d.status == status).count();

    json!({
        "summary": {
            "root_uri": result.root_uri,
            "run_timestamp": result.run_timestamp,
            "total_datasets": result.datasets.len(),
            "success": count(OutcomeStatus::Success),
            "empty": count(OutcomeStatus::Empty),
            "failed": count(OutcomeStatus::Failed),
            "tables_exported": result.exported_tables(),
            "total_duration_seconds": duration_secs,
        },
        "details": result.datasets,
    })
}

/// Writes the report as pretty JSON, creating parent directories as needed.
pub fn write_report(path: &Path, result: &SnapshotResult, duration_secs: f64) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path).map_err(ExportError::IoError)?;
    serde_json::to_writer_pretty(file, &build_report(result, duration_secs))?;
    Ok(())
}
