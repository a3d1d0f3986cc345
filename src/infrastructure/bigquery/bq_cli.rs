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
//! Thin async wrapper around the `bq` command line tool.
//!
//! Every call runs `bq --format=json` with the project and location fixed,
//! and hands back the parsed JSON on stdout. Child processes are killed
//! when the calling future is dropped, so cancellation stops them.

use crate::domain::errors::{ExportError, Result};
use log::debug;
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct BqCli {
    binary: String,
    project_id: String,
    location: String,
}

impl BqCli {
    pub fn new(binary: Option<String>, project_id: &str, location: &str) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| "bq".to_string()),
            project_id: project_id.to_string(),
            location: location.to_string(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Global flags shared by every invocation, followed by `args`.
    pub fn command_args(&self, global: &[String], args: &[String]) -> Vec<String> {
        let mut all = vec![
            "--headless".to_string(),
            "--format=json".to_string(),
            format!("--project_id={}", self.project_id),
            format!("--location={}", self.location),
        ];
        all.extend(global.iter().cloned());
        all.extend(args.iter().cloned());
        all
    }

    /// Runs `bq` and parses stdout as JSON. Empty stdout parses as `null`.
    pub async fn run_json(&self, global: &[String], args: &[String]) -> Result<Value> {
        let argv = self.command_args(global, args);
        debug!("Running {} {}", self.binary, argv.join(" "));

        let output = Command::new(&self.binary)
            .args(&argv)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
            return Err(ExportError::IoError(std::io::Error::other(format!(
                "bq {} failed ({}): {}",
                args.first().map(String::as_str).unwrap_or_default(),
                output.status,
                detail
            ))));
        }

        parse_json_output(&stdout)
    }
}

/// `bq` sometimes prints a status line before the JSON document; skip to
/// the first `[` or `{`.
pub fn parse_json_output(stdout: &str) -> Result<Value> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    let start = trimmed.find(['[', '{']).unwrap_or(0);
    Ok(serde_json::from_str(&trimmed[start..])?)
}
