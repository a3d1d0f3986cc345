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
//! # Dataset Export Orchestrator
//!
//! Exports every eligible table of one dataset concurrently.
//!
//! All table tasks share one cancellation scope, a child of the run token.
//! The first failing table cancels the scope, the remaining tasks stop at
//! their next suspension point, and once everything has settled the first
//! error is returned (fail-fast inside a dataset) together with one outcome
//! per table: the exports that finished and the ones that failed or stopped.

use crate::application::catalog_walker::list_exportable_tables;
use crate::application::table_export::export_table;
use crate::application::task_group::TaskGroup;
use crate::domain::entities::{
    Dataset, DatasetExport, DatasetFailure, DestinationFormat, ExportOutcome, ExtractJobSpec,
};
use crate::domain::run_root::RunRoot;
use crate::domain::table_filter::TableFilter;
use crate::ports::catalog_port::CatalogPort;
use crate::ports::export_job_port::ExportJobPort;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct DatasetExporter {
    catalog: Arc<dyn CatalogPort>,
    jobs: Arc<dyn ExportJobPort>,
    filter: Arc<TableFilter>,
    location: String,
    parallel: Option<usize>,
}

impl DatasetExporter {
    pub fn new(
        catalog: Arc<dyn CatalogPort>,
        jobs: Arc<dyn ExportJobPort>,
        filter: Arc<TableFilter>,
        location: String,
        parallel: Option<usize>,
    ) -> Self {
        Self {
            catalog,
            jobs,
            filter,
            location,
            parallel,
        }
    }

    /// Exports `dataset` under `root` and returns its root URI with one
    /// outcome per exported table.
    pub async fn export_dataset(
        &self,
        dataset: &Dataset,
        root: &RunRoot,
        cancel: &CancellationToken,
    ) -> std::result::Result<DatasetExport, DatasetFailure> {
        let root_uri = root.dataset_uri(&dataset.dataset_id);
        let tables =
            list_exportable_tables(self.catalog.as_ref(), &self.filter, dataset, cancel).await?;

        if tables.is_empty() {
            info!(
                "No tables on dataset {} or all tables are excluded",
                dataset.dataset_id
            );
            return Ok(DatasetExport {
                root_uri,
                tables: Vec::new(),
            });
        }

        info!(
            "Starting export of {} tables in {}: {}",
            tables.len(),
            dataset.dataset_id,
            tables
                .iter()
                .map(|t| t.table_id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut group: TaskGroup<ExportOutcome> =
            TaskGroup::new(cancel.child_token(), self.parallel);
        let mut uris = HashMap::new();
        for table in tables {
            let job_id = root.job_id(&table.dataset_id, &table.table_id);
            let uri = root.table_uri(&table.dataset_id, &table.table_id, DestinationFormat::Parquet);
            uris.insert(table.table_id.clone(), uri.clone());
            let label = table.table_id.clone();
            let spec =
                ExtractJobSpec::compressed_parquet(job_id, table, uri, self.location.clone());
            let jobs = Arc::clone(&self.jobs);
            group.spawn(label, move |scope| async move {
                export_table(jobs.as_ref(), spec, &scope).await
            });
        }

        match group.try_wait_all().await {
            Ok(outcomes) => Ok(DatasetExport {
                root_uri,
                tables: sorted(outcomes),
            }),
            Err(failure) => {
                let mut tables = failure.succeeded;
                tables.extend(failure.failed.into_iter().map(|(table_id, error)| {
                    let uri = uris.remove(&table_id).unwrap_or_default();
                    ExportOutcome::failure(table_id, uri, error)
                }));
                Err(DatasetFailure {
                    error: failure.error,
                    tables: sorted(tables),
                })
            }
        }
    }
}

fn sorted(mut outcomes: Vec<ExportOutcome>) -> Vec<ExportOutcome> {
    outcomes.sort_by(|a, b| a.table_id.cmp(&b.table_id));
    outcomes
}
