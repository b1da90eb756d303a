//! Bounded, cancellable fan-out of per-file conversion tasks.
//!
//! A single dispatch loop owns every task record. Workers only return a
//! result; the loop applies it, so status changes and progress events are
//! serialized and progress never goes backwards.

mod cancel;
mod report;
mod task;

pub use cancel::CancellationToken;
pub use report::{
    BatchReport, ChannelReporter, Failure, Level, Progress, ProgressEvent, Reporter,
    TracingReporter,
};
pub use task::{ConversionTask, OutputLayout, TaskStatus};

use crate::analysis::Manifest;
use crate::config::ConvertConfig;
use crate::error::TaskError;
use crate::rewrite::RewriteEngine;
use crate::verify::StructuralVerifier;
use chrono::Utc;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use task::{Converted, Converter};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

pub struct TaskScheduler {
    converter: Converter,
    layout: Arc<OutputLayout>,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
}

impl TaskScheduler {
    pub fn new(
        engine: Arc<RewriteEngine>,
        verifier: Arc<StructuralVerifier>,
        layout: Arc<OutputLayout>,
        reporter: Arc<dyn Reporter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            converter: Converter {
                engine,
                verifier,
                max_file_size: ConvertConfig::default().max_file_size,
            },
            layout,
            reporter,
            cancel,
        }
    }

    pub fn with_max_file_size(mut self, limit: u64) -> Self {
        self.converter.max_file_size = limit;
        self
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// One task per convertible file, in manifest order. A task whose output
    /// path was already claimed by an earlier task starts out failed.
    pub fn plan(&self, manifest: &Manifest) -> Vec<ConversionTask> {
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut tasks = Vec::new();

        for file in manifest.convertible() {
            let Some(output) = self.layout.output_path(file) else {
                continue;
            };
            let mut task = ConversionTask::new(file.clone(), output.clone());
            match claimed.get(&output) {
                Some(other) => {
                    warn!(
                        path = %file.relative.display(),
                        other = %other.display(),
                        output = %output.display(),
                        "output path collision"
                    );
                    task.fail(TaskError::OutputConflict {
                        other: other.clone(),
                    });
                }
                None => {
                    claimed.insert(output, file.relative.clone());
                }
            }
            tasks.push(task);
        }
        tasks
    }

    /// Convert every convertible file with at most `concurrency` workers.
    ///
    /// Per-file failures are recorded on their task and never stop the
    /// batch. Once the cancellation token is set no further task starts;
    /// running tasks finish and the rest are marked cancelled.
    pub async fn run(&self, manifest: &Manifest, concurrency: usize) -> BatchReport {
        let started_at = Utc::now();
        let mut tasks = self.plan(manifest);
        let total = tasks.len();
        let concurrency = concurrency.max(1);
        let mut progress = Progress::new(total);
        let mut failures = Vec::new();

        self.reporter.report(ProgressEvent::BatchStarted { total });
        info!(total, concurrency, "dispatching conversion tasks");

        for task in tasks.iter().filter(|t| t.status == TaskStatus::Failed) {
            failures.push(failure_of(task));
            self.finished(task, progress.advance());
        }

        let mut workers: JoinSet<(usize, Result<Converted, TaskError>)> = JoinSet::new();
        let mut next = 0;
        let mut cancelled = false;

        loop {
            while !cancelled && workers.len() < concurrency && next < total {
                if tasks[next].status != TaskStatus::Pending {
                    next += 1;
                    continue;
                }
                if self.cancel.is_cancelled() {
                    info!(remaining = total - next, "cancellation requested, stopping dispatch");
                    cancelled = true;
                    break;
                }

                let index = next;
                next += 1;
                let task = &mut tasks[index];
                task.status = TaskStatus::Running;
                self.reporter.report(ProgressEvent::TaskStarted {
                    path: task.source.relative.clone(),
                });

                let converter = self.converter.clone();
                let source = task.source.path.clone();
                let output = task.output.clone();
                workers.spawn_blocking(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        converter.convert(&source, &output)
                    }))
                    .unwrap_or_else(|payload| Err(TaskError::WorkerCrashed(panic_message(payload))));
                    (index, result)
                });
            }

            let Some(joined) = workers.join_next().await else {
                break;
            };
            match joined {
                Ok((index, result)) => {
                    let task = &mut tasks[index];
                    match result {
                        Ok(converted) => {
                            task.status = TaskStatus::Succeeded;
                            task.applied = converted.applied;
                            task.converted = Some(converted.text);
                        }
                        Err(e) => {
                            error!(path = %task.relative().display(), error = %e, "conversion failed");
                            task.fail(e);
                            failures.push(failure_of(task));
                        }
                    }
                    self.finished(task, progress.advance());
                }
                Err(e) => error!(error = %e, "conversion worker did not complete"),
            }
        }

        for task in tasks.iter_mut() {
            match task.status {
                TaskStatus::Pending => {
                    task.status = TaskStatus::Cancelled;
                    self.finished(task, progress.advance());
                }
                TaskStatus::Running => {
                    task.fail(TaskError::WorkerCrashed("worker was lost".to_string()));
                    failures.push(failure_of(task));
                    self.finished(task, progress.advance());
                }
                _ => {}
            }
        }

        let report = BatchReport {
            tasks,
            failures,
            skipped: manifest.skipped.clone(),
            cancelled,
            assets_copied: 0,
            asset_error: None,
            started_at,
            finished_at: Utc::now(),
        };
        self.reporter.report(ProgressEvent::BatchFinished {
            succeeded: report.succeeded(),
            failed: report.failed(),
            cancelled: report.cancelled_tasks(),
        });
        report
    }

    fn finished(&self, task: &ConversionTask, progress: Progress) {
        self.reporter.report(ProgressEvent::TaskFinished {
            path: task.source.relative.clone(),
            status: task.status,
            progress,
        });
    }
}

fn failure_of(task: &ConversionTask) -> Failure {
    Failure {
        path: task.source.relative.clone(),
        reason: task
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown error".to_string()),
        diff: task.error.as_ref().and_then(|e| e.diff()).map(str::to_string),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with non-string payload".to_string())
}
