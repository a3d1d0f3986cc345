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
//! # Catalog Walker
//!
//! Drains the table listing of one dataset and keeps only what can be
//! exported: regular tables that the [`TableFilter`] does not exclude.
//!
//! The listing is consumed to the end before anything is exported, so no
//! remote cursor stays open while the export tasks fan out.

use crate::application::task_group::cancellable;
use crate::domain::entities::{Dataset, TableRef};
use crate::domain::errors::{ExportError, Result};
use crate::domain::table_filter::TableFilter;
use crate::ports::catalog_port::CatalogPort;
use futures::StreamExt;
use log::debug;
use tokio_util::sync::CancellationToken;

/// Lists the tables of `dataset` that should be exported.
///
/// Any catalog error is fatal for this dataset and is returned as a
/// `CatalogError` scoped to it.
pub async fn list_exportable_tables(
    catalog: &dyn CatalogPort,
    filter: &TableFilter,
    dataset: &Dataset,
    cancel: &CancellationToken,
) -> Result<Vec<TableRef>> {
    let mut listings = catalog.list_tables(dataset);
    let mut tables = Vec::new();

    while let Some(listing) =
        cancellable(cancel, "listing tables", async { Ok(listings.next().await) }).await?
    {
        let listing = listing.map_err(|e| in_dataset(dataset, e))?;

        if filter.is_excluded(&listing.dataset_id, &listing.table_id) {
            debug!("Skipping excluded table: {}", listing.qualified_name());
            continue;
        }

        let kind = cancellable(cancel, "fetching table metadata", catalog.table_kind(&listing))
            .await
            .map_err(|e| in_dataset(dataset, e))?;
        if !kind.is_regular() {
            debug!("Skipping {} table: {}", kind, listing.qualified_name());
            continue;
        }

        tables.push(listing.with_kind(kind));
    }

    Ok(tables)
}

fn in_dataset(dataset: &Dataset, err: ExportError) -> ExportError {
    match err {
        ExportError::CatalogError { .. } | ExportError::Cancelled(_) => err,
        other => ExportError::catalog(dataset.to_string(), other),
    }
}
