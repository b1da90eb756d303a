use super::task::{ConversionTask, TaskStatus};
use crate::analysis::Skipped;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// Completed (succeeded, failed or cancelled) over scheduled tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            completed: 0,
            total,
        }
    }

    /// In `[0, 1]`; an empty batch counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    pub(crate) fn advance(&mut self) -> Self {
        self.completed = (self.completed + 1).min(self.total);
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    BatchStarted {
        total: usize,
    },
    TaskStarted {
        path: PathBuf,
    },
    TaskFinished {
        path: PathBuf,
        status: TaskStatus,
        progress: Progress,
    },
    Message {
        level: Level,
        message: String,
    },
    BatchFinished {
        succeeded: usize,
        failed: usize,
        cancelled: usize,
    },
}

/// Append-only sink for run events.
pub trait Reporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BatchStarted { total } => {
                tracing::info!(total, "conversion started");
            }
            ProgressEvent::TaskStarted { path } => {
                tracing::debug!(path = %path.display(), "task started");
            }
            ProgressEvent::TaskFinished {
                path,
                status,
                progress,
            } => match status {
                TaskStatus::Failed => tracing::error!(
                    path = %path.display(),
                    completed = progress.completed,
                    total = progress.total,
                    "task failed"
                ),
                _ => tracing::info!(
                    path = %path.display(),
                    status = status.as_str(),
                    completed = progress.completed,
                    total = progress.total,
                    "task finished"
                ),
            },
            ProgressEvent::Message { level, message } => match level {
                Level::Info => tracing::info!("{message}"),
                Level::Warn => tracing::warn!("{message}"),
                Level::Error => tracing::error!("{message}"),
            },
            ProgressEvent::BatchFinished {
                succeeded,
                failed,
                cancelled,
            } => {
                tracing::info!(succeeded, failed, cancelled, "conversion finished");
            }
        }
    }
}

/// Sends events over a channel, for a driver that renders them itself.
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelReporter {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl Reporter for ChannelReporter {
    fn report(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// One entry of the failure log.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub path: PathBuf,
    pub reason: String,
    pub diff: Option<String>,
}

/// Outcome of one run.
#[derive(Debug)]
pub struct BatchReport {
    /// Every scheduled task, in submission order.
    pub tasks: Vec<ConversionTask>,
    /// Failed tasks in completion order.
    pub failures: Vec<Failure>,
    pub skipped: Vec<Skipped>,
    /// Whether cancellation stopped dispatch before every task ran.
    pub cancelled: bool,
    pub assets_copied: usize,
    pub asset_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(TaskStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(TaskStatus::Failed)
    }

    pub fn cancelled_tasks(&self) -> usize {
        self.count(TaskStatus::Cancelled)
    }

    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failures.is_empty() && self.asset_error.is_none()
    }

    /// Source paths whose output was written.
    pub fn completed_paths(&self) -> impl Iterator<Item = &Path> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Succeeded)
            .map(|t| t.relative())
    }

    pub fn task(&self, relative: &Path) -> Option<&ConversionTask> {
        self.tasks.iter().find(|t| t.relative() == relative)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
