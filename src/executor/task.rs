use crate::analysis::{Category, SourceFile};
use crate::error::TaskError;
use crate::rewrite::RewriteEngine;
use crate::verify::StructuralVerifier;
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One file's trip through the pipeline.
#[derive(Debug)]
pub struct ConversionTask {
    pub source: SourceFile,
    pub output: PathBuf,
    pub status: TaskStatus,
    pub error: Option<TaskError>,
    /// The rewritten text, once verified and written.
    pub converted: Option<String>,
    /// Stages that changed the text.
    pub applied: Vec<&'static str>,
}

impl ConversionTask {
    pub fn new(source: SourceFile, output: PathBuf) -> Self {
        Self {
            source,
            output,
            status: TaskStatus::Pending,
            error: None,
            converted: None,
            applied: Vec::new(),
        }
    }

    pub fn relative(&self) -> &Path {
        &self.source.relative
    }

    pub(crate) fn fail(&mut self, error: TaskError) {
        self.status = TaskStatus::Failed;
        self.error = Some(error);
    }
}

/// Where converted files land in the target project.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    target: PathBuf,
    source_dir: String,
}

impl OutputLayout {
    pub fn new(target: impl Into<PathBuf>, source_dir: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source_dir: source_dir.into(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn source_root(&self) -> PathBuf {
        self.target.join(&self.source_dir)
    }

    /// `<target>/<source dir>/<category subdir>/<rest>`, where `rest` is the
    /// path below the last directory that marks the category, or the whole
    /// relative path when no such directory exists. `None` for categories
    /// that are not converted.
    pub fn output_path(&self, file: &SourceFile) -> Option<PathBuf> {
        let subdir = file.category.target_subdir()?;
        Some(
            self.source_root()
                .join(subdir)
                .join(strip_category_prefix(&file.relative, file.category)),
        )
    }
}

fn strip_category_prefix(relative: &Path, category: Category) -> PathBuf {
    let components: Vec<Component> = relative.components().collect();
    let dirs = components.len().saturating_sub(1);
    let marker = components[..dirs].iter().rposition(|c| match c {
        Component::Normal(name) => {
            let name = name.to_string_lossy().to_lowercase();
            category.source_segments().contains(&name.as_str())
        }
        _ => false,
    });

    match marker {
        Some(index) => components[index + 1..].iter().collect(),
        None => relative.to_path_buf(),
    }
}

/// Result of a successful conversion.
#[derive(Debug)]
pub(crate) struct Converted {
    pub text: String,
    pub applied: Vec<&'static str>,
}

/// The per-file work: read, rewrite, verify, write. Runs on a blocking
/// worker thread.
#[derive(Clone)]
pub(crate) struct Converter {
    pub engine: Arc<RewriteEngine>,
    pub verifier: Arc<StructuralVerifier>,
    pub max_file_size: u64,
}

impl Converter {
    pub fn convert(&self, source: &Path, output: &Path) -> Result<Converted, TaskError> {
        let size = fs::metadata(source)
            .map_err(|e| TaskError::io(source, e))?
            .len();
        if size > self.max_file_size {
            return Err(TaskError::TooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        let original = fs::read_to_string(source).map_err(|e| TaskError::io(source, e))?;
        let outcome = self.engine.rewrite_traced(&original);
        tracing::debug!(
            path = %source.display(),
            stages = ?outcome.applied,
            "rewrite finished"
        );

        let verification = self.verifier.verify(&original, &outcome.text);
        if !verification.equal {
            let (diff, rendered) = verification.into_parts();
            return Err(TaskError::VerificationMismatch { diff, rendered });
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
        }
        fs::write(output, &outcome.text).map_err(|e| TaskError::io(output, e))?;

        Ok(Converted {
            text: outcome.text,
            applied: outcome.applied,
        })
    }
}
