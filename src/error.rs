//! Error types.
//!
//! Per-file failures are [`TaskError`]s and never leave their task. Only
//! [`MigrateError`] stops a whole run.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::verify::DiffLine;

/// Why a single conversion task failed.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The rewrite changed the markup skeleton. The output is not written.
    #[error("markup structure changed during rewrite ({} differing lines)", diff.len())]
    VerificationMismatch { diff: Vec<DiffLine>, rendered: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("file is {size} bytes, above the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("output path already claimed by {}", other.display())]
    OutputConflict { other: PathBuf },

    #[error("worker terminated unexpectedly: {0}")]
    WorkerCrashed(String),
}

impl TaskError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Rendered diff for mismatches, `None` for every other kind.
    pub fn diff(&self) -> Option<&str> {
        match self {
            Self::VerificationMismatch { rendered, .. } => Some(rendered),
            _ => None,
        }
    }
}

/// Failures that abort a run before or around the per-file batch.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("invalid project at {}: {reason}", path.display())]
    InvalidProject { path: PathBuf, reason: String },

    #[error("failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{step} step failed: {message}")]
    Collaborator { step: &'static str, message: String },
}

impl MigrateError {
    pub fn collaborator(step: &'static str, error: anyhow::Error) -> Self {
        Self::Collaborator {
            step,
            message: format!("{error:#}"),
        }
    }
}
