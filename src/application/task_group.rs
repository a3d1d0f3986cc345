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
//! Structured fan-out for table exports.
//!
//! A wrapper around [`JoinSet`] with fail-fast semantics and a shared
//! cancellation scope:
//! - every task receives a clone of the scope token,
//! - the first task error cancels the scope,
//! - the group still waits for every task to settle before returning,
//! - the first error wins; later failures are logged and kept by label.
//!
//! Dropping the group aborts whatever is still running.

use crate::domain::errors::{ExportError, Result};
use futures::FutureExt;
use log::{debug, warn};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Runs `fut` unless `cancel` fires first.
pub async fn cancellable<T, F>(cancel: &CancellationToken, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExportError::Cancelled(what.to_string())),
        res = fut => res,
    }
}

/// A group stopped by its first failure, with everything its tasks left behind.
#[derive(Debug)]
pub struct GroupFailure<T> {
    /// The failure that cancelled the group.
    pub error: ExportError,
    /// Tasks that succeeded, before or after the failure.
    pub succeeded: Vec<T>,
    /// `(label, message)` of every failed task, the winning failure first.
    pub failed: Vec<(String, String)>,
}

pub struct TaskGroup<T> {
    tasks: JoinSet<(String, Result<T>)>,
    scope: CancellationToken,
    limiter: Option<Arc<Semaphore>>,
}

impl<T: Send + 'static> TaskGroup<T> {
    /// `parallel` caps how many tasks run at once; `None` is unbounded.
    pub fn new(scope: CancellationToken, parallel: Option<usize>) -> Self {
        Self {
            tasks: JoinSet::new(),
            scope,
            limiter: parallel.map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }

    pub fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Spawns the future built by `make`, handing it the shared scope.
    /// `label` names the task in failures.
    pub fn spawn<F, Fut>(&mut self, label: impl Into<String>, make: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let label = label.into();
        let token = self.scope.clone();
        let task = make(token.clone());
        let limiter = self.limiter.clone();
        self.tasks.spawn(async move {
            let run = async move {
                let _permit = match limiter {
                    Some(limiter) => Some(
                        cancellable(&token, "waiting for an export slot", async move {
                            limiter
                                .acquire_owned()
                                .await
                                .map_err(|e| ExportError::Cancelled(e.to_string()))
                        })
                        .await?,
                    ),
                    None => None,
                };
                task.await
            };
            let result = AssertUnwindSafe(run)
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(ExportError::TaskPanicked(panic_message(&*panic))));
            (label, result)
        });
    }

    /// Waits for every task. Returns all results in completion order, or
    /// the first error together with whatever the other tasks produced.
    pub async fn try_wait_all(mut self) -> std::result::Result<Vec<T>, GroupFailure<T>> {
        let mut succeeded = Vec::with_capacity(self.tasks.len());
        let mut failed = Vec::new();
        let mut first_error: Option<ExportError> = None;

        while let Some(joined) = self.tasks.join_next().await {
            let (label, result) =
                joined.unwrap_or_else(|e| ("unknown task".to_string(), Err(join_error(e))));
            let err = match result {
                Ok(value) => {
                    succeeded.push(value);
                    continue;
                }
                Err(err) => err,
            };

            failed.push((label, err.to_string()));
            match first_error {
                None => {
                    self.scope.cancel();
                    first_error = Some(err);
                }
                Some(_) if err.is_cancelled() => debug!("Task stopped: {}", err),
                Some(_) => warn!("Additional failure after cancellation: {}", err),
            }
        }

        match first_error {
            Some(error) => Err(GroupFailure {
                error,
                succeeded,
                failed,
            }),
            None => Ok(succeeded),
        }
    }
}

fn join_error(err: JoinError) -> ExportError {
    if err.is_cancelled() {
        ExportError::Cancelled(format!("task aborted: {}", err))
    } else {
        ExportError::TaskPanicked(err.to_string())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_succeed() {
        let mut group = TaskGroup::new(CancellationToken::new(), None);
        for i in 0..5u32 {
            group.spawn(format!("t{}", i), move |_| async move { Ok(i) });
        }
        assert_eq!(group.len(), 5);
        let mut values = group.try_wait_all().await.unwrap();
        values.sort();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_error_cancels_siblings_and_wins() {
        let mut group = TaskGroup::new(CancellationToken::new(), None);
        let scope = group.scope().clone();

        group.spawn("first", |_| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err::<u32, _>(ExportError::ConfigError("first".into()))
        });
        group.spawn("second", |_| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(ExportError::ConfigError("second".into()))
        });
        group.spawn("slow", |token| async move {
            cancellable(&token, "slow", async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(7)
            })
            .await
        });

        let failure = group.try_wait_all().await.unwrap_err();
        assert!(failure.error.to_string().contains("first"));
        assert_eq!(failure.failed[0].0, "first");
        assert_eq!(failure.failed.len(), 3);
        assert!(failure.succeeded.is_empty());
        assert!(scope.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_settled_results() {
        let mut group = TaskGroup::new(CancellationToken::new(), None);
        group.spawn("fast", |_| async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(1u32)
        });
        group.spawn("broken", |_| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(ExportError::ConfigError("boom".into()))
        });

        let failure = group.try_wait_all().await.unwrap_err();
        assert_eq!(failure.succeeded, vec![1]);
        assert_eq!(failure.failed.len(), 1);
        assert_eq!(failure.failed[0].0, "broken");
        assert!(failure.failed[0].1.contains("boom"));
    }

    #[tokio::test]
    async fn test_panic_is_reported() {
        let mut group = TaskGroup::<u32>::new(CancellationToken::new(), None);
        group.spawn("panics", |_| async { Ok(None::<u32>.expect("boom")) });
        let failure = group.try_wait_all().await.unwrap_err();
        assert!(matches!(failure.error, ExportError::TaskPanicked(_)));
        assert!(failure.error.to_string().contains("boom"));
        assert_eq!(failure.failed[0].0, "panics");
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_cap_is_respected() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut group = TaskGroup::new(CancellationToken::new(), Some(2));

        for i in 0..6 {
            let running = running.clone();
            let peak = peak.clone();
            group.spawn(format!("t{}", i), move |_| async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            });
        }

        assert_eq!(group.try_wait_all().await.unwrap().len(), 6);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_parent_cancellation_reaches_tasks() {
        let parent = CancellationToken::new();
        let mut group = TaskGroup::new(parent.child_token(), None);
        group.spawn("forever", |token| async move {
            cancellable(&token, "forever", std::future::pending::<Result<()>>()).await
        });
        parent.cancel();
        let failure = group.try_wait_all().await.unwrap_err();
        assert!(failure.error.is_cancelled());
    }
}
