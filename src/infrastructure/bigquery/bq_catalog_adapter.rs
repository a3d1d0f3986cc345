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
//! Catalog adapter backed by `bq ls`, `bq show` and `bq query`.

use super::bq_cli::BqCli;
use crate::domain::entities::{Dataset, TableKind, TableListing};
use crate::domain::errors::{ExportError, Result};
use crate::ports::catalog_port::{CatalogPort, SchemaRow};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use log::warn;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// `bq ls` pages at 50 entries unless told otherwise.
const DEFAULT_MAX_RESULTS: u32 = 100_000;

const SQL_SCHEMATA: &str = "SELECT * FROM `region-{location}`.INFORMATION_SCHEMA.SCHEMATA";
const SQL_TABLES: &str = "SELECT * FROM `{project}.{dataset}`.INFORMATION_SCHEMA.TABLES";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetEntry {
    dataset_reference: DatasetReference,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetReference {
    project_id: String,
    dataset_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableEntry {
    table_reference: TableReference,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableReference {
    project_id: String,
    dataset_id: String,
    table_id: String,
}

#[derive(Debug, Deserialize)]
struct TableShow {
    #[serde(rename = "type")]
    kind: String,
}

pub struct BqCatalogAdapter {
    cli: Arc<BqCli>,
    max_results: u32,
}

impl BqCatalogAdapter {
    pub fn new(cli: Arc<BqCli>) -> Self {
        Self {
            cli,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    async fn fetch_datasets(&self) -> Result<Vec<Dataset>> {
        let out = self
            .cli
            .run_json(
                &[],
                &[
                    "ls".to_string(),
                    "--datasets".to_string(),
                    format!("--max_results={}", self.max_results),
                    format!("{}:", self.cli.project_id()),
                ],
            )
            .await
            .map_err(|e| ExportError::catalog(self.cli.project_id(), e))?;
        let datasets =
            parse_datasets(out).map_err(|e| ExportError::catalog(self.cli.project_id(), e))?;
        self.warn_if_truncated(self.cli.project_id(), datasets.len());
        Ok(datasets)
    }

    async fn fetch_tables(&self, dataset: &Dataset) -> Result<Vec<TableListing>> {
        let out = self
            .cli
            .run_json(
                &[],
                &[
                    "ls".to_string(),
                    format!("--max_results={}", self.max_results),
                    dataset.to_string(),
                ],
            )
            .await
            .map_err(|e| ExportError::catalog(dataset.to_string(), e))?;
        let tables = parse_tables(out).map_err(|e| ExportError::catalog(dataset.to_string(), e))?;
        self.warn_if_truncated(&dataset.to_string(), tables.len());
        Ok(tables)
    }

    /// `bq ls` stops silently at `--max_results`; a full page may be partial.
    fn warn_if_truncated(&self, scope: &str, listed: usize) -> bool {
        let truncated = listed >= self.max_results as usize;
        if truncated {
            warn!(
                "Listing of {} returned {} entries, the --max_results cap; later entries are not exported",
                scope, listed
            );
        }
        truncated
    }

    async fn query_rows(&self, scope: &str, sql: String) -> Result<Vec<SchemaRow>> {
        let out = self
            .cli
            .run_json(
                &[],
                &[
                    "query".to_string(),
                    "--nouse_legacy_sql".to_string(),
                    format!("--max_rows={}", self.max_results),
                    sql,
                ],
            )
            .await
            .map_err(|e| ExportError::catalog(scope, e))?;
        parse_rows(out).map_err(|e| ExportError::catalog(scope, e))
    }
}

#[async_trait]
impl CatalogPort for BqCatalogAdapter {
    fn list_datasets(&self) -> BoxStream<'_, Result<Dataset>> {
        stream::once(async move {
            let datasets = self.fetch_datasets().await?;
            Ok::<_, ExportError>(stream::iter(datasets.into_iter().map(Ok::<_, ExportError>)))
        })
        .try_flatten()
        .boxed()
    }

    fn list_tables<'a>(&'a self, dataset: &'a Dataset) -> BoxStream<'a, Result<TableListing>> {
        stream::once(async move {
            let tables = self.fetch_tables(dataset).await?;
            Ok::<_, ExportError>(stream::iter(tables.into_iter().map(Ok::<_, ExportError>)))
        })
        .try_flatten()
        .boxed()
    }

    async fn table_kind(&self, table: &TableListing) -> Result<TableKind> {
        let id = format!("{}:{}.{}", table.project_id, table.dataset_id, table.table_id);
        let out = self
            .cli
            .run_json(&[], &["show".to_string(), id.clone()])
            .await
            .map_err(|e| ExportError::catalog(id.as_str(), e))?;
        let show: TableShow =
            serde_json::from_value(out).map_err(|e| ExportError::catalog(id.as_str(), e))?;
        Ok(TableKind::from_warehouse_type(&show.kind))
    }

    async fn describe_datasets(&self, location: &str) -> Result<Vec<SchemaRow>> {
        let sql = SQL_SCHEMATA.replace("{location}", &location.to_lowercase());
        self.query_rows(&format!("region-{}", location), sql).await
    }

    async fn describe_tables(&self, dataset: &Dataset) -> Result<Vec<SchemaRow>> {
        let sql = SQL_TABLES
            .replace("{project}", &dataset.project_id)
            .replace("{dataset}", &dataset.dataset_id);
        self.query_rows(&dataset.to_string(), sql).await
    }
}

fn as_array(out: Value) -> Vec<Value> {
    match out {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn parse_datasets(out: Value) -> Result<Vec<Dataset>> {
    as_array(out)
        .into_iter()
        .map(|v| {
            let entry: DatasetEntry = serde_json::from_value(v)?;
            Ok(Dataset::new(
                entry.dataset_reference.project_id,
                entry.dataset_reference.dataset_id,
            ))
        })
        .collect()
}

fn parse_tables(out: Value) -> Result<Vec<TableListing>> {
    as_array(out)
        .into_iter()
        .map(|v| {
            let entry: TableEntry = serde_json::from_value(v)?;
            Ok(TableListing {
                project_id: entry.table_reference.project_id,
                dataset_id: entry.table_reference.dataset_id,
                table_id: entry.table_reference.table_id,
            })
        })
        .collect()
}

fn parse_rows(out: Value) -> Result<Vec<SchemaRow>> {
    as_array(out)
        .into_iter()
        .map(|v| match v {
            Value::Object(row) => Ok(row),
            other => Err(ExportError::SerializationError(format!(
                "expected a row object, got {}",
                other
            ))),
        })
        .collect()
}
