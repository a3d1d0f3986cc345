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
//! Extract jobs through the `bq` CLI.
//!
//! `submit` starts the job with `--nosync` under a caller-chosen job id;
//! `wait` runs `bq wait` on that id. Both child processes die with the
//! future that spawned them.

use super::bq_cli::BqCli;
use crate::domain::entities::{ExtractJobSpec, JobStatus};
use crate::domain::errors::Result;
use crate::ports::export_job_port::{ExportJob, ExportJobPort};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobDocument {
    status: JobState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobState {
    state: String,
    error_result: Option<JobErrorProto>,
}

#[derive(Debug, Deserialize)]
struct JobErrorProto {
    reason: Option<String>,
    message: Option<String>,
}

pub struct BqExtractAdapter {
    cli: Arc<BqCli>,
}

impl BqExtractAdapter {
    pub fn new(cli: Arc<BqCli>) -> Self {
        Self { cli }
    }
}

/// Command line for one extract job: global flags, then the `extract` call.
pub fn extract_args(spec: &ExtractJobSpec) -> (Vec<String>, Vec<String>) {
    let global = vec![
        "--nosync".to_string(),
        format!("--job_id={}", spec.job_id),
        format!("--location={}", spec.location),
    ];
    let mut args = vec![
        "extract".to_string(),
        format!("--destination_format={}", spec.format),
    ];
    if spec.gzip {
        args.push("--compression=GZIP".to_string());
    }
    args.push(spec.table.to_string());
    args.push(spec.destination_uri.clone());
    (global, args)
}

#[async_trait]
impl ExportJobPort for BqExtractAdapter {
    async fn submit(&self, spec: &ExtractJobSpec) -> Result<Box<dyn ExportJob>> {
        let (global, args) = extract_args(spec);
        self.cli.run_json(&global, &args).await?;
        debug!("Started extract job {} for {}", spec.job_id, spec.table);
        Ok(Box::new(BqExtractJob {
            cli: Arc::clone(&self.cli),
            job_id: spec.job_id.clone(),
            location: spec.location.clone(),
        }))
    }
}

pub struct BqExtractJob {
    cli: Arc<BqCli>,
    job_id: String,
    location: String,
}

#[async_trait]
impl ExportJob for BqExtractJob {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    async fn wait(&mut self) -> Result<JobStatus> {
        let out = self
            .cli
            .run_json(
                &[format!("--location={}", self.location)],
                &[
                    "wait".to_string(),
                    "--fail_on_error=false".to_string(),
                    self.job_id.clone(),
                ],
            )
            .await?;
        parse_job_status(&self.job_id, out)
    }
}

/// Turns the job document printed by `bq wait` into a terminal status.
fn parse_job_status(job_id: &str, out: Value) -> Result<JobStatus> {
    let doc: JobDocument = serde_json::from_value(out)?;
    if doc.status.state != "DONE" {
        return Ok(JobStatus::failed(
            job_id,
            format!("job ended in state {}", doc.status.state),
        ));
    }
    Ok(match doc.status.error_result {
        Some(err) => JobStatus::failed(
            job_id,
            format!(
                "{}: {}",
                err.reason.unwrap_or_else(|| "unknown".to_string()),
                err.message.unwrap_or_default()
            ),
        ),
        None => JobStatus::done(job_id),
    })
}
