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

//! # Export Job Port
//!
//! The contract for the server-side "Data Mover": something that can extract
//! a table straight into object storage. The exporter never moves bytes
//! itself; it starts a job and waits for it.

use crate::domain::entities::{ExtractJobSpec, JobStatus};
use crate::domain::errors::Result;
use async_trait::async_trait;

/// `ExportJobPort` starts asynchronous extract jobs.
#[async_trait]
pub trait ExportJobPort: Send + Sync {
    /// Submits the job and returns as soon as the service accepted it.
    async fn submit(&self, spec: &ExtractJobSpec) -> Result<Box<dyn ExportJob>>;
}

/// Handle on a running extract job.
#[async_trait]
pub trait ExportJob: Send {
    fn job_id(&self) -> &str;

    /// Suspends until the job reaches a terminal state.
    ///
    /// `Err` means waiting itself failed; a job that ran and failed is
    /// `Ok(JobStatus { error: Some(..) })`. Dropping the future must stop
    /// waiting promptly.
    async fn wait(&mut self) -> Result<JobStatus>;
}
