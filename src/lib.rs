pub mod analysis;
pub mod config;
pub mod error;
pub mod executor;
pub mod migrate;
pub mod project;
pub mod rewrite;
pub mod summary;
pub mod theme;
pub mod verify;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use analysis::{Category, FileClassifier, Manifest, ProjectAnalyzer, SourceFile};
pub use config::Config;
pub use error::{MigrateError, TaskError};
pub use executor::{
    BatchReport, CancellationToken, ProgressEvent, Reporter, TaskScheduler, TaskStatus,
};
pub use migrate::Migrator;
pub use rewrite::RewriteEngine;
pub use verify::{StructuralVerifier, VerificationResult};
