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
//! # BigQuery Snapshot Exporter
//!
//! Snapshots every dataset of a BigQuery project into object storage as
//! GZIP-compressed Parquet, one timestamped directory per run.
//!
//! The crate follows the **Hexagonal Architecture** (Ports and Adapters):
//! `domain` and `application` only talk to the traits in `ports`, and
//! `infrastructure` implements those traits on top of `bq` and `gcloud`.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;

#[cfg(test)]
mod test_support;
