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
//! In-memory port implementations shared by the unit tests.

use crate::domain::entities::{Dataset, ExtractJobSpec, JobStatus, TableKind, TableListing};
use crate::domain::errors::{ExportError, Result};
use crate::ports::catalog_port::{CatalogPort, SchemaRow};
use crate::ports::export_job_port::{ExportJob, ExportJobPort};
use crate::ports::storage_port::{ObjectWriter, StoragePort, WriterOptions};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PROJECT: &str = "test-project";

/// Scripted warehouse catalog.
#[derive(Default)]
pub struct FakeCatalog {
    datasets: Vec<String>,
    tables: HashMap<String, Vec<(String, TableKind)>>,
    broken_datasets: HashSet<String>,
    broken_describe: HashSet<String>,
    fail_dataset_listing: bool,
    pub kind_lookups: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, dataset: &str, tables: &[&str]) -> Self {
        let tables = tables
            .iter()
            .map(|t| (t.to_string(), TableKind::Regular))
            .collect();
        self.datasets.push(dataset.to_string());
        self.tables.insert(dataset.to_string(), tables);
        self
    }

    pub fn with_table(mut self, dataset: &str, table: &str, kind: TableKind) -> Self {
        if !self.datasets.iter().any(|d| d == dataset) {
            self.datasets.push(dataset.to_string());
        }
        self.tables
            .entry(dataset.to_string())
            .or_default()
            .push((table.to_string(), kind));
        self
    }

    /// Listing the tables of `dataset` fails after the first table.
    pub fn with_broken_dataset(mut self, dataset: &str) -> Self {
        self.broken_datasets.insert(dataset.to_string());
        self
    }

    /// The INFORMATION_SCHEMA.TABLES query for `dataset` fails.
    pub fn with_broken_describe(mut self, dataset: &str) -> Self {
        self.broken_describe.insert(dataset.to_string());
        self
    }

    pub fn with_failing_dataset_listing(mut self) -> Self {
        self.fail_dataset_listing = true;
        self
    }
}

#[async_trait]
impl CatalogPort for FakeCatalog {
    fn list_datasets(&self) -> BoxStream<'_, Result<Dataset>> {
        if self.fail_dataset_listing {
            return stream::iter(vec![Err(ExportError::catalog(PROJECT, "permission denied"))])
                .boxed();
        }
        stream::iter(
            self.datasets
                .iter()
                .map(|d| Ok(Dataset::new(PROJECT, d.as_str())))
                .collect::<Vec<_>>(),
        )
        .boxed()
    }

    fn list_tables<'a>(&'a self, dataset: &'a Dataset) -> BoxStream<'a, Result<TableListing>> {
        let mut items: Vec<Result<TableListing>> = self
            .tables
            .get(&dataset.dataset_id)
            .map(|tables| {
                tables
                    .iter()
                    .map(|(t, _)| {
                        Ok(TableListing {
                            project_id: dataset.project_id.clone(),
                            dataset_id: dataset.dataset_id.clone(),
                            table_id: t.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        if self.broken_datasets.contains(&dataset.dataset_id) {
            items.truncate(1);
            items.push(Err(ExportError::catalog(
                dataset.dataset_id.as_str(),
                "connection reset",
            )));
        }
        stream::iter(items).boxed()
    }

    async fn table_kind(&self, table: &TableListing) -> Result<TableKind> {
        self.kind_lookups
            .lock()
            .unwrap()
            .push(table.qualified_name());
        self.tables
            .get(&table.dataset_id)
            .and_then(|tables| tables.iter().find(|(t, _)| t == &table.table_id))
            .map(|(_, kind)| kind.clone())
            .ok_or_else(|| ExportError::catalog(table.qualified_name(), "not found"))
    }

    async fn describe_datasets(&self, location: &str) -> Result<Vec<SchemaRow>> {
        Ok(self
            .datasets
            .iter()
            .map(|d| row(json!({ "schema_name": d, "location": location })))
            .collect())
    }

    async fn describe_tables(&self, dataset: &Dataset) -> Result<Vec<SchemaRow>> {
        if self.broken_describe.contains(&dataset.dataset_id) {
            return Err(ExportError::catalog(dataset.dataset_id.as_str(), "query failed"));
        }
        Ok(self
            .tables
            .get(&dataset.dataset_id)
            .map(|tables| {
                tables
                    .iter()
                    .map(|(t, kind)| {
                        row(json!({ "table_name": t, "table_type": kind.to_string() }))
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn row(value: serde_json::Value) -> SchemaRow {
    match value {
        serde_json::Value::Object(map) => map,
        _ => SchemaRow::new(),
    }
}

/// How the fake job service treats one table.
#[derive(Clone, Debug)]
pub enum JobScript {
    Succeed(Duration),
    FailRemote(Duration, String),
    FailSubmit(String),
}

/// Scripted export job service. Tables without a script succeed immediately.
#[derive(Default)]
pub struct FakeJobs {
    scripts: HashMap<String, JobScript>,
    pub submitted: Arc<Mutex<Vec<ExtractJobSpec>>>,
    pub finished: Arc<Mutex<Vec<String>>>,
}

impl FakeJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, table: &str, script: JobScript) -> Self {
        self.scripts.insert(table.to_string(), script);
        self
    }

    pub fn submitted_tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = self
            .submitted
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.table.table_id.clone())
            .collect();
        tables.sort();
        tables
    }

    pub fn finished_tables(&self) -> Vec<String> {
        let mut tables = self.finished.lock().unwrap().clone();
        tables.sort();
        tables
    }
}

#[async_trait]
impl ExportJobPort for FakeJobs {
    async fn submit(&self, spec: &ExtractJobSpec) -> Result<Box<dyn ExportJob>> {
        let script = self
            .scripts
            .get(&spec.table.table_id)
            .cloned()
            .unwrap_or(JobScript::Succeed(Duration::ZERO));
        if let JobScript::FailSubmit(reason) = &script {
            return Err(ExportError::IoError(std::io::Error::other(reason.clone())));
        }
        self.submitted.lock().unwrap().push(spec.clone());
        Ok(Box::new(FakeJob {
            job_id: spec.job_id.clone(),
            table_id: spec.table.table_id.clone(),
            script,
            finished: self.finished.clone(),
        }))
    }
}

struct FakeJob {
    job_id: String,
    table_id: String,
    script: JobScript,
    finished: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ExportJob for FakeJob {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    async fn wait(&mut self) -> Result<JobStatus> {
        let status = match &self.script {
            JobScript::Succeed(delay) => {
                tokio::time::sleep(*delay).await;
                JobStatus::done(self.job_id.as_str())
            }
            JobScript::FailRemote(delay, reason) => {
                tokio::time::sleep(*delay).await;
                JobStatus::failed(self.job_id.as_str(), reason.as_str())
            }
            JobScript::FailSubmit(_) => unreachable!("never submitted"),
        };
        self.finished.lock().unwrap().push(self.table_id.clone());
        Ok(status)
    }
}

/// One object captured by `MemoryStorage`.
#[derive(Clone, Debug)]
pub struct StoredObject {
    pub options: WriterOptions,
    pub bytes: Vec<u8>,
}

/// Storage sink that keeps closed objects in memory.
#[derive(Default)]
pub struct MemoryStorage {
    pub objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
    fail_on_close: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_on_close: true,
            ..Self::default()
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl StoragePort for MemoryStorage {
    async fn open_writer(&self, path: &str, options: WriterOptions) -> Result<Box<dyn ObjectWriter>> {
        Ok(Box::new(MemoryWriter {
            path: path.to_string(),
            options,
            buf: Vec::new(),
            objects: self.objects.clone(),
            fail_on_close: self.fail_on_close,
        }))
    }
}

struct MemoryWriter {
    path: String,
    options: WriterOptions,
    buf: Vec<u8>,
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
    fail_on_close: bool,
}

impl Write for MemoryWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.write(data)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ObjectWriter for MemoryWriter {
    async fn close(self: Box<Self>) -> Result<()> {
        if self.fail_on_close {
            return Err(ExportError::sink(self.path, "bucket does not exist"));
        }
        let this = *self;
        this.objects.lock().unwrap().insert(
            this.path,
            StoredObject {
                options: this.options,
                bytes: this.buf,
            },
        );
        Ok(())
    }
}

/// Gunzips and parses a stored JSON artifact.
pub fn decode_json_gz(bytes: &[u8]) -> serde_json::Value {
    use std::io::Read;
    let mut decoder = flate2::read::GzDecoder::new(bytes);
    let mut text = String::new();
    decoder.read_to_string(&mut text).unwrap();
    assert!(!text.contains('\n'), "artifact must be newline-free");
    serde_json::from_str(&text).unwrap()
}
