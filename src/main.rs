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
use bq_snapshot_exporter::application::report::write_report;
use bq_snapshot_exporter::application::runtime::RuntimeContext;
use bq_snapshot_exporter::config::{AppConfig, CliArgs};
use chrono::Utc;
use clap::Parser;
use log::{error, info, warn};
use std::path::Path;
use std::process;
use std::time::Instant;

#[tokio::main]
async fn main() {
    // 1. Initialize Logging
    env_logger::init();

    // 2. Parse Arguments and Load Config
    let args = CliArgs::parse();
    let config = match AppConfig::load(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }
    let request = config.to_export_request(Utc::now());

    // 3. Wire Adapters
    let ctx = match RuntimeContext::init(&config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Failed to initialize runtime: {}", e);
            process::exit(1);
        }
    };

    // 4. Run the Snapshot
    info!("Starting snapshot of project {}...", request.project_id);
    let started = Instant::now();
    let result = match ctx.driver.export_snapshot(&request, &ctx.cancel).await {
        Ok(result) => result,
        Err(e) => {
            error!("Snapshot failed: {}", e);
            process::exit(1);
        }
    };
    let duration = started.elapsed().as_secs_f64();

    for failed in result.failed_datasets() {
        warn!(
            "Dataset {} failed: {}",
            failed.dataset_id,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
    info!(
        "Snapshot {} finished in {:.1}s. {}/{} datasets exported, {} tables.",
        result.root_uri,
        duration,
        result.datasets.len() - result.failed_datasets().count(),
        result.datasets.len(),
        result.exported_tables()
    );

    // 5. Report
    if let Some(path) = &config.export.report_path {
        match write_report(Path::new(path), &result, duration) {
            Ok(()) => info!("Report written to {}", path),
            Err(e) => error!("Failed to write report {}: {}", path, e),
        }
    }
}
