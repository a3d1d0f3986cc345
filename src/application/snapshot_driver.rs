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
//! # Snapshot Export Driver
//!
//! Top level of a run:
//! 1. Compile the exclusion rules (a bad pattern aborts before any work).
//! 2. Fix the run timestamp; every object of the run lives under it.
//! 3. Write the dataset listing artifact, before any table export.
//! 4. Walk the datasets one at a time and export each of them.
//!
//! Across datasets the policy is fail-slow: a dataset that fails is recorded
//! in the result and the walk continues. Only failures that stop the walk
//! itself (listing datasets, writing a metadata artifact, cancellation)
//! surface as an error.

use crate::application::catalog_artifacts::CatalogArtifacts;
use crate::application::dataset_exporter::DatasetExporter;
use crate::application::task_group::cancellable;
use crate::domain::entities::{
    Dataset, DatasetOutcome, ExportOutcome, ExportRequest, SnapshotResult,
};
use crate::domain::errors::{ExportError, Result};
use crate::domain::run_root::RunRoot;
use crate::domain::table_filter::TableFilter;
use crate::ports::catalog_port::CatalogPort;
use crate::ports::export_job_port::ExportJobPort;
use crate::ports::storage_port::StoragePort;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use log::{error, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct SnapshotDriver {
    catalog: Arc<dyn CatalogPort>,
    jobs: Arc<dyn ExportJobPort>,
    storage: Arc<dyn StoragePort>,
}

impl SnapshotDriver {
    pub fn new(
        catalog: Arc<dyn CatalogPort>,
        jobs: Arc<dyn ExportJobPort>,
        storage: Arc<dyn StoragePort>,
    ) -> Self {
        Self {
            catalog,
            jobs,
            storage,
        }
    }

    /// Runs a snapshot stamped with the current time.
    pub async fn export_snapshot(
        &self,
        request: &ExportRequest,
        cancel: &CancellationToken,
    ) -> Result<SnapshotResult> {
        self.export_snapshot_at(request, Utc::now(), cancel).await
    }

    pub async fn export_snapshot_at(
        &self,
        request: &ExportRequest,
        started_at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<SnapshotResult> {
        let filter = Arc::new(TableFilter::new(
            &request.exclusion_patterns,
            request.retention_cutoff,
        )?);
        let root = RunRoot::new(&request.bucket, started_at);
        info!(
            "Starting export to {} (exclude patterns: {:?}, retention cutoff: {})",
            root.uri(),
            request.exclusion_patterns,
            request.retention_cutoff
        );

        let artifacts = CatalogArtifacts::new(Arc::clone(&self.storage), &root);
        if request.write_catalog_metadata {
            let rows = cancellable(
                cancel,
                "describing datasets",
                self.catalog.describe_datasets(&request.location),
            )
            .await?;
            artifacts.write_rows(&root.schemata_path(), &rows).await?;
            info!("Schema export complete: {}", root.schemata_path());
        }

        let exporter = DatasetExporter::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.jobs),
            filter,
            request.location.clone(),
            request.parallel,
        );

        let mut datasets = self.catalog.list_datasets();
        let mut outcomes = Vec::new();
        while let Some(next) =
            cancellable(cancel, "listing datasets", async { Ok(datasets.next().await) }).await?
        {
            let dataset = next.map_err(|e| match e {
                ExportError::CatalogError { .. } => e,
                other => ExportError::catalog(request.project_id.as_str(), other),
            })?;

            let outcome = self
                .export_one(&exporter, &artifacts, &dataset, &root, request, cancel)
                .await?;
            outcomes.push(outcome);
        }

        let result = SnapshotResult {
            root_uri: root.uri(),
            run_timestamp: root.timestamp().to_string(),
            datasets: outcomes,
        };
        info!(
            "Snapshot {} finished: {} datasets, {} failed, {} tables exported",
            result.root_uri,
            result.datasets.len(),
            result.failed_datasets().count(),
            result.exported_tables()
        );
        Ok(result)
    }

    /// Exports one dataset. `Err` only for run-fatal failures; a failed
    /// dataset comes back as a `Failed` outcome.
    async fn export_one(
        &self,
        exporter: &DatasetExporter,
        artifacts: &CatalogArtifacts,
        dataset: &Dataset,
        root: &RunRoot,
        request: &ExportRequest,
        cancel: &CancellationToken,
    ) -> Result<DatasetOutcome> {
        let dataset_uri = root.dataset_uri(&dataset.dataset_id);

        if request.write_catalog_metadata {
            let path = root.tables_path(&dataset.dataset_id);
            match cancellable(cancel, "describing tables", self.catalog.describe_tables(dataset))
                .await
            {
                Ok(rows) => {
                    artifacts.write_rows(&path, &rows).await?;
                    info!("Table schema export complete: {}", path);
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => return Ok(self.record_failure(dataset, dataset_uri, e, Vec::new())),
            }
        }

        match exporter.export_dataset(dataset, root, cancel).await {
            Ok(export) => {
                info!("Dataset export complete: {}", export.root_uri);
                Ok(DatasetOutcome::from_export(dataset.dataset_id.clone(), export))
            }
            Err(failure) if cancel.is_cancelled() => Err(ExportError::Cancelled(format!(
                "run stopped while exporting {}: {}",
                dataset.dataset_id, failure.error
            ))),
            Err(failure) => Ok(self.record_failure(
                dataset,
                dataset_uri,
                failure.error,
                failure.tables,
            )),
        }
    }

    fn record_failure(
        &self,
        dataset: &Dataset,
        dataset_uri: String,
        err: ExportError,
        tables: Vec<ExportOutcome>,
    ) -> DatasetOutcome {
        error!(
            "Failed to export dataset {}, continuing dump: {}",
            dataset.dataset_id, err
        );
        DatasetOutcome::failure(dataset.dataset_id.clone(), dataset_uri, err.to_string(), tables)
    }
}
