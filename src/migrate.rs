//! One migration run from a Next.js source root to a React target.

use crate::analysis::{Category, ProjectAnalyzer};
use crate::config::Config;
use crate::error::MigrateError;
use crate::executor::{
    BatchReport, CancellationToken, Level, OutputLayout, ProgressEvent, Reporter, TaskScheduler,
    TracingReporter,
};
use crate::project::{self, AssetCopier, DependencyInstaller, FsAssetCopier, Scaffolder};
use crate::rewrite::RewriteEngine;
use crate::verify::StructuralVerifier;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Migrator {
    config: Config,
    engine: Arc<RewriteEngine>,
    verifier: Arc<StructuralVerifier>,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
    scaffolder: Box<dyn Scaffolder>,
    installer: Box<dyn DependencyInstaller>,
    assets: Box<dyn AssetCopier>,
}

impl Migrator {
    pub fn new(config: Config) -> Self {
        let scaffolder = project::scaffolder_for(&config.project, &config.convert.source_dir);
        let installer = project::installer_for(&config.project);
        Self {
            config,
            engine: Arc::new(RewriteEngine::standard()),
            verifier: Arc::new(StructuralVerifier::new()),
            reporter: Arc::new(TracingReporter),
            cancel: CancellationToken::new(),
            scaffolder,
            installer,
            assets: Box::new(FsAssetCopier),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_engine(mut self, engine: RewriteEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    pub fn with_scaffolder(mut self, scaffolder: impl Scaffolder + 'static) -> Self {
        self.scaffolder = Box::new(scaffolder);
        self
    }

    pub fn with_installer(mut self, installer: impl DependencyInstaller + 'static) -> Self {
        self.installer = Box::new(installer);
        self
    }

    pub fn with_asset_copier(mut self, assets: impl AssetCopier + 'static) -> Self {
        self.assets = Box::new(assets);
        self
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Analyze, prepare the target, convert every file, copy assets.
    ///
    /// Errors only come from project validation and the preparation steps;
    /// per-file problems end up in the returned report.
    pub async fn run(&self, source: &Path, target: &Path) -> Result<BatchReport, MigrateError> {
        info!(source = %source.display(), target = %target.display(), "starting migration");

        let analyzer = ProjectAnalyzer::new(source, &self.config);
        let manifest = analyzer.analyze().await?;
        self.message(
            Level::Info,
            format!(
                "found {} files ({} convertible, {} assets, {} skipped)",
                manifest.total_files(),
                manifest.convertible().count(),
                manifest.count(Category::Asset),
                manifest.skipped.len()
            ),
        );

        self.message(Level::Info, "preparing target project".to_string());
        self.scaffolder
            .scaffold(target)
            .await
            .map_err(|e| MigrateError::collaborator("scaffold", e))?;

        self.installer
            .install(target, &self.config.project.required_packages)
            .await
            .map_err(|e| MigrateError::collaborator("install", e))?;

        let layout = Arc::new(OutputLayout::new(target, &self.config.convert.source_dir));
        let scheduler = TaskScheduler::new(
            Arc::clone(&self.engine),
            Arc::clone(&self.verifier),
            layout,
            Arc::clone(&self.reporter),
            self.cancel.clone(),
        )
        .with_max_file_size(self.config.convert.max_file_size);

        let mut report = scheduler
            .run(&manifest, self.config.convert.concurrency)
            .await;

        if report.cancelled {
            warn!("migration cancelled, skipping asset copy");
            return Ok(report);
        }

        let assets: Vec<PathBuf> = manifest
            .category(Category::Asset)
            .iter()
            .map(|f| f.relative.clone())
            .collect();
        if !assets.is_empty() {
            match self.assets.copy(&manifest.root, target, &assets).await {
                Ok(count) => report.assets_copied = count,
                Err(e) => {
                    self.message(Level::Error, format!("asset copy failed: {e:#}"));
                    report.asset_error = Some(format!("{e:#}"));
                }
            }
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            assets = report.assets_copied,
            "migration finished"
        );
        Ok(report)
    }

    fn message(&self, level: Level, message: String) {
        self.reporter.report(ProgressEvent::Message { level, message });
    }
}
