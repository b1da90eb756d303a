use super::{RecordingReporter, TestUtils};
use crate::error::{MigrateError, TaskError};
use crate::executor::{CancellationToken, TaskStatus};
use crate::migrate::Migrator;
use crate::project::Scaffolder;
use crate::rewrite::{RewriteEngine, RewriteStage};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Drops every paragraph, which changes the markup skeleton.
struct DropParagraphs;

impl RewriteStage for DropParagraphs {
    fn name(&self) -> &'static str {
        "drop-paragraphs"
    }

    fn matches(&self, text: &str) -> bool {
        text.contains("<p>")
    }

    fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("<p>") {
            out.push_str(&rest[..start]);
            match rest[start..].find("</p>") {
                Some(end) => rest = &rest[start + end + "</p>".len()..],
                None => {
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

struct FailingScaffolder;

#[async_trait]
impl Scaffolder for FailingScaffolder {
    async fn scaffold(&self, _target: &Path) -> Result<()> {
        bail!("template directory is read-only")
    }
}

#[tokio::test]
async fn test_missing_source_directory() {
    let temp = TempDir::new().unwrap();
    let result = Migrator::new(TestUtils::offline_config())
        .run(&temp.path().join("missing"), &temp.path().join("out"))
        .await;

    assert!(matches!(result, Err(MigrateError::InvalidProject { .. })));
}

#[tokio::test]
async fn test_project_without_package_json() {
    let project = TempDir::new().unwrap();
    TestUtils::write(project.path(), "pages/index.js", "export default function Home() {}\n");
    let target = TempDir::new().unwrap();

    let err = Migrator::new(TestUtils::offline_config())
        .run(project.path(), target.path())
        .await
        .unwrap_err();

    match err {
        MigrateError::InvalidProject { reason, .. } => assert!(reason.contains("package.json")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!target.path().join("src").exists());
}

#[tokio::test]
async fn test_malformed_package_json() {
    let project = TempDir::new().unwrap();
    TestUtils::write(project.path(), "package.json", "{ not json");
    let target = TempDir::new().unwrap();

    let result = Migrator::new(TestUtils::offline_config())
        .run(project.path(), target.path())
        .await;
    assert!(matches!(result, Err(MigrateError::InvalidProject { .. })));
}

#[tokio::test]
async fn test_scaffold_failure_aborts_before_conversion() {
    let project = TestUtils::create_next_project();
    let target = TempDir::new().unwrap();

    let err = Migrator::new(TestUtils::offline_config())
        .with_scaffolder(FailingScaffolder)
        .run(project.path(), target.path())
        .await
        .unwrap_err();

    match err {
        MigrateError::Collaborator { step, message } => {
            assert_eq!(step, "scaffold");
            assert!(message.contains("read-only"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!target.path().join("src/pages/profile.js").exists());
}

#[tokio::test]
async fn test_verification_mismatch_is_not_written() {
    let project = TestUtils::create_pages_project(2);
    let target = TempDir::new().unwrap();
    let reporter = Arc::new(RecordingReporter::default());

    let report = TestUtils::scheduler(
        target.path(),
        RewriteEngine::standard().with_stage(DropParagraphs),
        reporter.clone(),
        CancellationToken::new(),
    )
    .run(&TestUtils::manifest(project.path()), 2)
    .await;

    assert_eq!(report.failed(), 2);
    assert!(!target.path().join("src/pages/page00.js").exists());
    for task in &report.tasks {
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.converted.is_none());
        match &task.error {
            Some(TaskError::VerificationMismatch { diff, .. }) => assert!(!diff.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
    let failure = &report.failures[0];
    assert!(failure.diff.as_deref().is_some_and(|d| d.contains("-  return <p>")));
    assert!(reporter
        .finished()
        .iter()
        .all(|(status, _)| *status == TaskStatus::Failed));
}

#[tokio::test]
async fn test_non_utf8_source_is_skipped() {
    let project = TestUtils::create_pages_project(2);
    fs::write(project.path().join("pages/page01.js"), [0xff, 0xfe, 0x00, 0x81]).unwrap();
    let target = TempDir::new().unwrap();

    let manifest = TestUtils::manifest(project.path());
    // Non-UTF-8 content cannot be classified and is skipped up front.
    assert_eq!(manifest.skipped.len(), 1);

    let report = TestUtils::scheduler(
        target.path(),
        RewriteEngine::standard(),
        Arc::new(RecordingReporter::default()),
        CancellationToken::new(),
    )
    .run(&manifest, 1)
    .await;
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.skipped.len(), 1);
}
