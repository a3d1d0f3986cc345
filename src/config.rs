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
//! Configuration: a YAML/JSON file overridden by command line flags.
//!
//! Every flag can also come from the environment, so the exporter runs as a
//! container job without a config file.

use crate::domain::entities::ExportRequest;
use crate::domain::errors::{ExportError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;

const MAX_RETENTION_DAYS: i64 = 36_500;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub warehouse: WarehouseConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WarehouseConfig {
    pub project_id: String,
    pub location: String,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageVendor {
    #[default]
    Gcs,
    Local,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub vendor: StorageVendor,
    pub bucket: String,
    /// Root directory for the `local` vendor.
    pub local_root: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExportConfig {
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    pub retention_days: Option<i64>,
    pub retention_cutoff: Option<NaiveDate>,
    pub write_catalog_metadata: Option<bool>,
    pub parallel: Option<usize>,
    pub report_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RuntimeConfig {
    pub timeout_secs: Option<u64>,
    pub bq_binary: Option<String>,
    pub gcloud_binary: Option<String>,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long, env = "BIGQUERY_PROJECT_ID")]
    pub project_id: Option<String>,
    #[arg(long, env = "BIGQUERY_LOCATION")]
    pub location: Option<String>,
    /// Glob patterns matched against `<dataset>.<table>`
    #[arg(long, env = "BIGQUERY_EXCLUDE_PATTERNS", value_delimiter = ',')]
    pub exclude_patterns: Option<Vec<String>>,
    /// Skip date-suffixed tables older than this many days
    #[arg(long, env = "BIGQUERY_RETENTION_DAYS")]
    pub retention_days: Option<i64>,
    /// Skip date-suffixed tables older than this date (YYYY-MM-DD)
    #[arg(long)]
    pub retention_cutoff: Option<NaiveDate>,

    #[arg(long, value_enum, env = "STORAGE_VENDOR")]
    pub storage_vendor: Option<StorageVendor>,
    #[arg(long, env = "STORAGE_BUCKET_NAME")]
    pub bucket: Option<String>,
    #[arg(long, env = "STORAGE_PATH")]
    pub local_root: Option<String>,

    /// Max concurrent table exports per dataset
    #[arg(long)]
    pub parallel: Option<usize>,
    #[arg(long)]
    pub no_catalog_metadata: bool,
    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<String>,
    /// Cancel the run after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)
                .map_err(|e| ExportError::ConfigError(format!("{}: {}", path, e)))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| ExportError::ConfigError(format!("{}: {}", path, e)))?
        };

        Ok(config)
    }

    /// Loads the file named by `--config` (if any) and applies CLI overrides.
    pub fn load(args: &CliArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge_cli(args);
        Ok(config)
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(p) = &args.project_id { self.warehouse.project_id = p.clone(); }
        if let Some(l) = &args.location { self.warehouse.location = l.clone(); }
        if let Some(p) = &args.exclude_patterns { self.export.exclude_patterns = p.clone(); }
        if let Some(d) = args.retention_days { self.export.retention_days = Some(d); }
        if let Some(c) = args.retention_cutoff { self.export.retention_cutoff = Some(c); }
        if let Some(v) = args.storage_vendor { self.storage.vendor = v; }
        if let Some(b) = &args.bucket { self.storage.bucket = b.clone(); }
        if let Some(r) = &args.local_root { self.storage.local_root = Some(r.clone()); }
        if let Some(p) = args.parallel { self.export.parallel = Some(p); }
        if args.no_catalog_metadata { self.export.write_catalog_metadata = Some(false); }
        if let Some(r) = &args.report { self.export.report_path = Some(r.clone()); }
        if let Some(t) = args.timeout_secs { self.runtime.timeout_secs = Some(t); }
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(ExportError::ConfigError(msg.to_string()));

        if self.warehouse.project_id.trim().is_empty() {
            return fail("warehouse project id is required");
        }
        if self.warehouse.location.trim().is_empty() {
            return fail("warehouse location is required");
        }
        if self.storage.bucket.trim().is_empty() {
            return fail("storage bucket is required");
        }
        if self.storage.vendor == StorageVendor::Local && self.storage.local_root.is_none() {
            return fail("local storage requires local_root");
        }
        if self.export.parallel == Some(0) {
            return fail("parallel must be at least 1");
        }
        if self.export.retention_days.is_some() && self.export.retention_cutoff.is_some() {
            return fail("set either retention_days or retention_cutoff, not both");
        }
        if let Some(days) = self.export.retention_days {
            if !(0..=MAX_RETENTION_DAYS).contains(&days) {
                return fail("retention_days must be between 0 and 36500");
            }
        }
        Ok(())
    }

    /// Cutoff below which date-suffixed tables are skipped.
    pub fn retention_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(days) = self.export.retention_days {
            return Duration::try_days(days)
                .and_then(|d| now.checked_sub_signed(d))
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
        }
        self.export
            .retention_cutoff
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|midnight| midnight.and_utc())
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn to_export_request(&self, now: DateTime<Utc>) -> ExportRequest {
        ExportRequest {
            project_id: self.warehouse.project_id.clone(),
            bucket: self.storage.bucket.clone(),
            location: self.warehouse.location.clone(),
            exclusion_patterns: self
                .export
                .exclude_patterns
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            retention_cutoff: self.retention_cutoff(now),
            write_catalog_metadata: self.export.write_catalog_metadata.unwrap_or(true),
            parallel: self.export.parallel,
        }
    }
}
