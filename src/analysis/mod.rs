use crate::config::{Config, ScanConfig};
use crate::error::MigrateError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

mod classifier;
mod dependencies;

#[cfg(test)]
mod tests;

pub use classifier::{Category, ClassificationRule, FileClassifier, FileProbe};
pub use dependencies::{parse_package_json, Dependency, DependencyAnalyzer, MANIFEST_FILE};

/// A classified file under the source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the source root.
    pub relative: PathBuf,
    pub category: Category,
    pub size: u64,
}

/// A file left out of conversion, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub path: PathBuf,
    pub reason: String,
}

/// Classified view of a source tree. Files keep directory-walk order within
/// each category.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub root: PathBuf,
    pub files: BTreeMap<Category, Vec<SourceFile>>,
    pub skipped: Vec<Skipped>,
    pub dependencies: Vec<Dependency>,
}

impl Manifest {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
            skipped: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn push(&mut self, file: SourceFile) {
        self.files.entry(file.category).or_default().push(file);
    }

    pub fn category(&self, category: Category) -> &[SourceFile] {
        self.files.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, category: Category) -> usize {
        self.category(category).len()
    }

    /// Files that go through the rewrite pipeline, in manifest order.
    pub fn convertible(&self) -> impl Iterator<Item = &SourceFile> {
        self.files
            .iter()
            .filter(|(category, _)| category.is_convertible())
            .flat_map(|(_, files)| files.iter())
    }

    pub fn total_files(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}

pub struct ProjectAnalyzer {
    root_path: PathBuf,
    scan: ScanConfig,
    classifier: FileClassifier,
    dependency_analyzer: DependencyAnalyzer,
    max_file_size: u64,
    exclude: Vec<glob::Pattern>,
}

impl ProjectAnalyzer {
    pub fn new<P: AsRef<Path>>(path: P, config: &Config) -> Self {
        let exclude = config
            .scan
            .exclude
            .iter()
            .filter_map(|pattern| match glob::Pattern::new(pattern) {
                Ok(glob) => Some(glob),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();

        Self {
            root_path: path.as_ref().to_path_buf(),
            scan: config.scan.clone(),
            classifier: FileClassifier::new(&config.scan),
            dependency_analyzer: DependencyAnalyzer::new(),
            max_file_size: config.convert.max_file_size,
            exclude,
        }
    }

    pub fn classifier(&self) -> &FileClassifier {
        &self.classifier
    }

    pub fn scan_config(&self) -> &ScanConfig {
        &self.scan
    }

    /// Check that the root is a Next.js project and return its dependencies.
    pub async fn validate(&self) -> Result<Vec<Dependency>, MigrateError> {
        if !self.root_path.is_dir() {
            return Err(self.invalid("source directory does not exist"));
        }
        if !self.root_path.join(MANIFEST_FILE).is_file() {
            return Err(self.invalid("no package.json found"));
        }

        let dependencies = self
            .dependency_analyzer
            .analyze(&self.root_path)
            .await
            .map_err(|e| self.invalid(format!("{e:#}")))?;

        let next: Vec<&Dependency> = dependencies.iter().filter(|d| d.is_next_related()).collect();
        if next.iter().any(|d| d.name == "next") {
            for dep in &next {
                info!(name = %dep.name, version = %dep.version, dev = dep.is_dev, "framework dependency");
            }
        } else {
            warn!(root = %self.root_path.display(), "package.json does not depend on next");
        }

        Ok(dependencies)
    }

    /// Validate, then walk and classify the whole tree.
    pub async fn analyze(&self) -> Result<Manifest, MigrateError> {
        let dependencies = self.validate().await?;
        let mut manifest = self.scan()?;
        manifest.dependencies = dependencies;
        Ok(manifest)
    }

    /// Walk the tree in file-name order and classify every file.
    pub fn scan(&self) -> Result<Manifest, MigrateError> {
        let mut manifest = Manifest::new(&self.root_path);

        let walker = WalkDir::new(&self.root_path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_excluded(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // An unreadable root is fatal; anything below it is skipped.
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| self.relative(p))
                        .unwrap_or_default();
                    let reason = format!("unreadable: {e}");
                    info!(path = %path.display(), %reason, "skipping entry");
                    manifest.skipped.push(Skipped { path, reason });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path().to_path_buf();
            let relative = self.relative(&path);
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);

            let content = match self.read_for_classification(&path, size) {
                Ok(content) => content,
                Err(e) => {
                    debug!(path = %relative.display(), error = %e, "unreadable file");
                    None
                }
            };
            let category = self.classifier.classify(&relative, content.as_deref());

            if category == Category::Unclassified {
                let reason = if content.is_none() {
                    "not readable as text".to_string()
                } else {
                    "no classification rule matched".to_string()
                };
                info!(path = %relative.display(), %reason, "skipping file");
                manifest.skipped.push(Skipped {
                    path: relative,
                    reason,
                });
                continue;
            }

            debug!(path = %relative.display(), %category, "classified");
            manifest.push(SourceFile {
                path,
                relative,
                category,
                size,
            });
        }

        info!(
            files = manifest.total_files(),
            skipped = manifest.skipped.len(),
            "analysis complete"
        );
        Ok(manifest)
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root_path)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.exclude.iter().any(|pattern| pattern.matches(&name))
    }

    /// Text used by content rules. Oversized files contribute only their
    /// leading `max_file_size` bytes; the task rejects them later.
    fn read_for_classification(&self, path: &Path, size: u64) -> std::io::Result<Option<String>> {
        if size <= self.max_file_size {
            let bytes = fs::read(path)?;
            return Ok(String::from_utf8(bytes).ok());
        }

        let mut prefix = Vec::new();
        fs::File::open(path)?
            .take(self.max_file_size)
            .read_to_end(&mut prefix)?;
        Ok(Some(String::from_utf8_lossy(&prefix).into_owned()))
    }

    fn invalid(&self, reason: impl Into<String>) -> MigrateError {
        MigrateError::InvalidProject {
            path: self.root_path.clone(),
            reason: reason.into(),
        }
    }
}
