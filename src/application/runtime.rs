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
//! # Runtime Context
//!
//! The "Engine Room" of the application. It wires the adapters for the
//! configured vendors and owns the run-wide cancellation token:
//! 1. **Warehouse**: one shared `bq` wrapper behind the catalog and job ports.
//! 2. **Storage**: GCS or a local directory, per `storage.vendor`.
//! 3. **Shutdown**: Ctrl-C and the optional `timeout_secs` deadline both
//!    cancel the run token; running extract commands are killed with it.

use crate::application::snapshot_driver::SnapshotDriver;
use crate::config::{AppConfig, StorageVendor};
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::bigquery::bq_catalog_adapter::BqCatalogAdapter;
use crate::infrastructure::bigquery::bq_cli::BqCli;
use crate::infrastructure::bigquery::bq_extract_adapter::BqExtractAdapter;
use crate::infrastructure::gcs::gcs_storage_adapter::GcsStorageAdapter;
use crate::infrastructure::local_storage::local_storage_adapter::LocalStorageAdapter;
use crate::ports::storage_port::StoragePort;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// `RuntimeContext` holds the resources that live for the whole run.
pub struct RuntimeContext {
    pub driver: SnapshotDriver,
    pub cancel: CancellationToken,
}

impl RuntimeContext {
    /// Builds the adapters. Must be called inside a tokio runtime.
    pub fn init(config: &AppConfig) -> Result<Self> {
        let cli = Arc::new(BqCli::new(
            config.runtime.bq_binary.clone(),
            &config.warehouse.project_id,
            &config.warehouse.location,
        ));
        let driver = SnapshotDriver::new(
            Arc::new(BqCatalogAdapter::new(Arc::clone(&cli))),
            Arc::new(BqExtractAdapter::new(cli)),
            storage_for(config)?,
        );

        let cancel = CancellationToken::new();
        spawn_shutdown_watchers(&cancel, config.runtime.timeout_secs);
        Ok(Self { driver, cancel })
    }
}

fn storage_for(config: &AppConfig) -> Result<Arc<dyn StoragePort>> {
    let bucket = &config.storage.bucket;
    match config.storage.vendor {
        StorageVendor::Gcs => {
            info!("Metadata artifacts go to gs://{}", bucket);
            Ok(Arc::new(GcsStorageAdapter::new(
                config.runtime.gcloud_binary.clone(),
                bucket,
            )))
        }
        StorageVendor::Local => {
            let root = config.storage.local_root.as_deref().ok_or_else(|| {
                ExportError::ConfigError("local storage requires local_root".to_string())
            })?;
            info!("Metadata artifacts go to {}/{}", root, bucket);
            Ok(Arc::new(LocalStorageAdapter::new(root, bucket)))
        }
    }
}

fn spawn_shutdown_watchers(cancel: &CancellationToken, timeout_secs: Option<u64>) {
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            res = tokio::signal::ctrl_c() => {
                match res {
                    Ok(()) => warn!("Interrupted, cancelling the run"),
                    Err(e) => warn!("Cannot listen for Ctrl-C ({}), cancelling the run", e),
                }
                token.cancel();
            }
        }
    });

    if let Some(secs) = timeout_secs {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    warn!("Run deadline of {}s reached, cancelling the run", secs);
                    token.cancel();
                }
            }
        });
    }
}
