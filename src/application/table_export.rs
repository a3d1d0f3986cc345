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
//! # Table Export Task
//!
//! Exports one table by starting a server-side extract job and waiting for
//! it to finish. Submission failures, wait failures and jobs that end in
//! error all come back as one `ExportJobError` naming the table and URI.
//!
//! A failed export may leave partial objects behind.

use crate::application::task_group::cancellable;
use crate::domain::entities::{DestinationFormat, ExportOutcome, ExtractJobSpec, TableRef};
use crate::domain::errors::{ExportError, Result};
use crate::ports::export_job_port::ExportJobPort;
use log::info;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

impl ExtractJobSpec {
    /// Gzip-compressed Parquet, the format every snapshot uses.
    pub fn compressed_parquet(
        job_id: String,
        table: TableRef,
        destination_uri: String,
        location: String,
    ) -> Self {
        Self {
            job_id,
            table,
            destination_uri,
            location,
            format: DestinationFormat::Parquet,
            gzip: true,
        }
    }
}

/// Runs one extract job to completion.
pub async fn export_table(
    jobs: &dyn ExportJobPort,
    spec: ExtractJobSpec,
    cancel: &CancellationToken,
) -> Result<ExportOutcome> {
    if cancel.is_cancelled() {
        return Err(ExportError::Cancelled(format!(
            "export of {} not started",
            spec.table
        )));
    }

    let start = Instant::now();
    info!("Exporting {} to {}", spec.table, spec.destination_uri);

    let mut job = cancellable(cancel, &format!("submitting {}", spec.table), jobs.submit(&spec))
        .await
        .map_err(|e| job_error(&spec, e))?;

    let status = cancellable(cancel, &format!("waiting for {}", job.job_id()), job.wait())
        .await
        .map_err(|e| job_error(&spec, e))?;

    if let Some(reason) = status.error {
        return Err(job_failed(&spec, reason));
    }

    let duration = start.elapsed().as_secs_f64();
    info!(
        "Exported {} in {:.1}s (job {})",
        spec.table, duration, status.job_id
    );
    Ok(ExportOutcome::success(
        spec.table.table_id,
        spec.destination_uri,
        status.job_id,
        duration,
    ))
}

fn job_failed(spec: &ExtractJobSpec, reason: String) -> ExportError {
    ExportError::ExportJobError {
        table: spec.table.table_id.clone(),
        destination_uri: spec.destination_uri.clone(),
        reason,
    }
}

fn job_error(spec: &ExtractJobSpec, err: ExportError) -> ExportError {
    match err {
        ExportError::Cancelled(what) => {
            ExportError::Cancelled(format!("{} ({})", what, spec.destination_uri))
        }
        ExportError::ExportJobError { .. } => err,
        other => job_failed(spec, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::TableKind;
    use crate::test_support::{FakeJobs, JobScript, PROJECT};
    use std::time::Duration;

    fn spec_for(table_id: &str) -> ExtractJobSpec {
        let table = TableRef {
            project_id: PROJECT.to_string(),
            dataset_id: "shop".to_string(),
            table_id: table_id.to_string(),
            kind: TableKind::Regular,
        };
        ExtractJobSpec::compressed_parquet(
            format!("job_{}", table_id),
            table,
            format!("gs://b/20240101T000000/shop/{}/*.parquet.gz", table_id),
            "EU".to_string(),
        )
    }

    #[tokio::test]
    async fn test_successful_export() {
        let jobs = FakeJobs::new();
        let outcome = export_table(&jobs, spec_for("users"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.table_id, "users");
        assert_eq!(outcome.job_id.as_deref(), Some("job_users"));
        assert_eq!(
            outcome.destination_uri,
            "gs://b/20240101T000000/shop/users/*.parquet.gz"
        );

        let submitted = jobs.submitted.lock().unwrap();
        assert_eq!(submitted[0].format, DestinationFormat::Parquet);
        assert!(submitted[0].gzip);
        assert_eq!(submitted[0].location, "EU");
    }

    #[tokio::test]
    async fn test_remote_failure_names_table_and_uri() {
        let jobs = FakeJobs::new().script(
            "users",
            JobScript::FailRemote(Duration::ZERO, "Access Denied".into()),
        );
        let err = export_table(&jobs, spec_for("users"), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            ExportError::ExportJobError {
                table,
                destination_uri,
                reason,
            } => {
                assert_eq!(table, "users");
                assert!(destination_uri.ends_with("/shop/users/*.parquet.gz"));
                assert_eq!(reason, "Access Denied");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_failure_is_an_export_job_error() {
        let jobs = FakeJobs::new().script("users", JobScript::FailSubmit("quota".into()));
        let err = export_table(&jobs, spec_for("users"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::ExportJobError { ref table, .. } if table == "users"));
        assert!(err.to_string().contains("quota"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_the_wait() {
        let jobs = FakeJobs::new().script("users", JobScript::Succeed(Duration::from_secs(3600)));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });

        let err = export_table(&jobs, spec_for("users"), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(jobs.finished_tables().is_empty());
    }

    #[tokio::test]
    async fn test_already_cancelled_never_submits() {
        let jobs = FakeJobs::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = export_table(&jobs, spec_for("users"), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(jobs.submitted_tables().is_empty());
    }
}
