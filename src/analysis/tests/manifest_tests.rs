use crate::analysis::{Category, ProjectAnalyzer};
use crate::config::Config;
use crate::error::MigrateError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "package.json", br#"{"dependencies": {"next": "13.4.0", "react": "18.2.0"}}"#);
    write(root, "pages/index.js", b"export default function Home() { return <main/> }");
    write(root, "pages/about.js", b"export default function About() { return <main/> }");
    write(root, "components/Nav.jsx", b"export default function Nav() { return <nav/> }");
    write(root, "public/logo.png", &[0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe]);
    write(root, "notes.txt", b"todo");
    write(root, "node_modules/next/index.js", b"export default function X() {}");
    write(root, ".next/server/pages/index.js", b"export default 1");
    temp
}

#[tokio::test]
async fn test_analyze_classifies_and_excludes() {
    let temp = project();
    let manifest = ProjectAnalyzer::new(temp.path(), &Config::default())
        .analyze()
        .await
        .unwrap();

    let pages: Vec<_> = manifest
        .category(Category::Page)
        .iter()
        .map(|f| f.relative.to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(pages, vec!["pages/about.js", "pages/index.js"]);
    assert_eq!(manifest.count(Category::Component), 1);
    assert_eq!(manifest.count(Category::Asset), 1);
    assert_eq!(manifest.count(Category::Config), 1);
    assert!(manifest
        .skipped
        .iter()
        .any(|s| s.path == Path::new("notes.txt")));
    assert!(manifest
        .files
        .values()
        .flatten()
        .all(|f| !f.relative.starts_with("node_modules") && !f.relative.starts_with(".next")));
    assert!(manifest.dependencies.iter().any(|d| d.name == "next"));
}

#[tokio::test]
async fn test_convertible_order_follows_categories() {
    let temp = project();
    let manifest = ProjectAnalyzer::new(temp.path(), &Config::default())
        .analyze()
        .await
        .unwrap();
    let order: Vec<Category> = manifest.convertible().map(|f| f.category).collect();
    assert_eq!(order, vec![Category::Component, Category::Page, Category::Page]);
}

#[tokio::test]
async fn test_missing_package_json_is_invalid() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "pages/index.js", b"export default 1");
    let err = ProjectAnalyzer::new(temp.path(), &Config::default())
        .analyze()
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::InvalidProject { .. }));
}

#[tokio::test]
async fn test_project_without_next_is_accepted() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "package.json", br#"{"dependencies": {"react": "18.2.0"}}"#);
    let manifest = ProjectAnalyzer::new(temp.path(), &Config::default())
        .analyze()
        .await
        .unwrap();
    assert_eq!(manifest.total_files(), 1);
}

#[test]
fn test_custom_exclusions() {
    let temp = project();
    let mut config = Config::default();
    config.scan.exclude.push("components".to_string());
    let manifest = ProjectAnalyzer::new(temp.path(), &config).scan().unwrap();
    assert_eq!(manifest.count(Category::Component), 0);
}

#[cfg(unix)]
#[test]
fn test_unreadable_entries_are_skipped() {
    use std::os::unix::fs::symlink;

    let temp = project();
    let root = temp.path();
    symlink(root.join("pages/missing.js"), root.join("pages/dangling.js")).unwrap();
    symlink(root, root.join("components/again")).unwrap();

    let manifest = ProjectAnalyzer::new(root, &Config::default()).scan().unwrap();

    assert_eq!(manifest.count(Category::Page), 2);
    assert_eq!(manifest.count(Category::Component), 1);
    for name in ["pages/dangling.js", "components/again"] {
        let skipped = manifest
            .skipped
            .iter()
            .find(|s| s.path == Path::new(name))
            .unwrap_or_else(|| panic!("{name} not skipped: {:?}", manifest.skipped));
        assert!(skipped.reason.starts_with("unreadable"));
    }
}

#[test]
fn test_missing_root_fails_scan() {
    let temp = TempDir::new().unwrap();
    let result = ProjectAnalyzer::new(&temp.path().join("gone"), &Config::default()).scan();
    assert!(matches!(result, Err(MigrateError::Walk(_))));
}
