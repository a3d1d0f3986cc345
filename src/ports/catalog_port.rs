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

//! # Catalog Port
//!
//! In Hexagonal Architecture, a **Port** is a contract the application
//! depends on without knowing who fulfils it.
//!
//! This Port describes the warehouse catalog: which datasets exist, which
//! tables live in a dataset, and what kind each table is. Listings are lazy,
//! single-pass streams over a (possibly paginated) remote API.

use crate::domain::entities::{Dataset, TableKind, TableListing};
use crate::domain::errors::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::{Map, Value};

/// One row of an INFORMATION_SCHEMA view, column name to value.
pub type SchemaRow = Map<String, Value>;

#[async_trait]
pub trait CatalogPort: Send + Sync {
    /// Lazily yields every dataset of the configured project.
    /// The stream ends normally when the listing is exhausted.
    fn list_datasets(&self) -> BoxStream<'_, Result<Dataset>>;

    /// Lazily yields every table of `dataset`, whatever its kind.
    fn list_tables<'a>(&'a self, dataset: &'a Dataset) -> BoxStream<'a, Result<TableListing>>;

    /// Fetches the lightweight metadata needed to know a table's kind.
    async fn table_kind(&self, table: &TableListing) -> Result<TableKind>;

    /// Rows of `region-<location>.INFORMATION_SCHEMA.SCHEMATA`.
    async fn describe_datasets(&self, location: &str) -> Result<Vec<SchemaRow>>;

    /// Rows of `<project>.<dataset>.INFORMATION_SCHEMA.TABLES`.
    async fn describe_tables(&self, dataset: &Dataset) -> Result<Vec<SchemaRow>>;
}
