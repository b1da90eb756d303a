//! The steps around the per-file batch: preparing the target project,
//! installing packages into it and copying static assets.
//!
//! The migrator only checks whether each step succeeded.

pub mod command;
mod assets;
mod install;
mod scaffold;

pub use assets::FsAssetCopier;
pub use install::{NpmInstaller, SkipInstaller};
pub use scaffold::{CreateReactAppScaffolder, SkipScaffolder, TemplateScaffolder};

use crate::config::{ProjectConfig, ScaffoldMode};
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait Scaffolder: Send + Sync {
    /// Make `target` a React project that converted files can be written into.
    async fn scaffold(&self, target: &Path) -> Result<()>;
}

#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    async fn install(&self, target: &Path, packages: &[String]) -> Result<()>;
}

#[async_trait]
pub trait AssetCopier: Send + Sync {
    /// Copy `assets` (relative to `source`) into the target's public
    /// directory. Returns the number of files copied.
    async fn copy(&self, source: &Path, target: &Path, assets: &[PathBuf]) -> Result<usize>;
}

pub fn scaffolder_for(config: &ProjectConfig, source_dir: &str) -> Box<dyn Scaffolder> {
    match config.scaffold {
        ScaffoldMode::Template => Box::new(TemplateScaffolder::new(source_dir)),
        ScaffoldMode::CreateReactApp => Box::new(CreateReactAppScaffolder::new(source_dir)),
        ScaffoldMode::Skip => Box::new(SkipScaffolder),
    }
}

pub fn installer_for(config: &ProjectConfig) -> Box<dyn DependencyInstaller> {
    if config.install_dependencies {
        Box::new(NpmInstaller)
    } else {
        Box::new(SkipInstaller)
    }
}
