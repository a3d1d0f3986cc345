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

//! Destination layout of one snapshot run.
//!
//! ```text
//! gs://<bucket>/<runTimestamp>/INFORMATION_SCHEMA.SCHEMATA.json.gz
//! gs://<bucket>/<runTimestamp>/<dataset>/INFORMATION_SCHEMA.TABLES.json.gz
//! gs://<bucket>/<runTimestamp>/<dataset>/<table>/*.parquet.gz
//! ```
//!
//! The run timestamp sorts chronologically, so consecutive runs never collide.

use crate::domain::entities::DestinationFormat;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// `YYYYMMDDThhmmss`, UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

pub const DEFAULT_SCHEME: &str = "gs";
pub const SCHEMATA_ARTIFACT: &str = "INFORMATION_SCHEMA.SCHEMATA.json.gz";
pub const TABLES_ARTIFACT: &str = "INFORMATION_SCHEMA.TABLES.json.gz";

const JOB_ID_DIGEST_BYTES: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRoot {
    scheme: String,
    bucket: String,
    timestamp: String,
}

impl RunRoot {
    pub fn new(bucket: &str, started_at: DateTime<Utc>) -> Self {
        Self::with_scheme(DEFAULT_SCHEME, bucket, started_at)
    }

    pub fn with_scheme(scheme: &str, bucket: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            scheme: scheme.to_string(),
            bucket: bucket.trim_end_matches('/').to_string(),
            timestamp: started_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// `gs://<bucket>/<runTimestamp>`
    pub fn uri(&self) -> String {
        format!("{}://{}/{}", self.scheme, self.bucket, self.timestamp)
    }

    pub fn dataset_uri(&self, dataset_id: &str) -> String {
        format!("{}/{}", self.uri(), dataset_id)
    }

    /// Wildcard URI the extract job shards the table into.
    pub fn table_uri(&self, dataset_id: &str, table_id: &str, format: DestinationFormat) -> String {
        format!(
            "{}/{}/*.{}.gz",
            self.dataset_uri(dataset_id),
            table_id,
            format.extension()
        )
    }

    /// Bucket-relative object path of the dataset listing.
    pub fn schemata_path(&self) -> String {
        format!("{}/{}", self.timestamp, SCHEMATA_ARTIFACT)
    }

    /// Bucket-relative object path of one dataset's table listing.
    pub fn tables_path(&self, dataset_id: &str) -> String {
        format!("{}/{}/{}", self.timestamp, dataset_id, TABLES_ARTIFACT)
    }

    /// Deterministic extract job id, restricted to `[A-Za-z0-9_-]`.
    ///
    /// Sanitizing alone maps `raw_data.events` and `raw.data_events` to the
    /// same text, so the id ends with a digest of the unsanitized
    /// `<dataset>.<table>`.
    pub fn job_id(&self, dataset_id: &str, table_id: &str) -> String {
        let readable: String = format!("snapshot_{}_{}_{}", self.timestamp, dataset_id, table_id)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let digest = Sha256::digest(format!("{}.{}", dataset_id, table_id).as_bytes());
        format!("{}_{}", readable, hex::encode(&digest[..JOB_ID_DIGEST_BYTES]))
    }
}
