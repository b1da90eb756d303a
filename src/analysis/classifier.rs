//! Path and content based file classification.
//!
//! Classification is an ordered list of rules evaluated top to bottom. The
//! first rule whose predicate holds decides the category, so tie-breaks are
//! the declaration order of [`FileClassifier::rules`].

use crate::config::ScanConfig;
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path};

/// Semantic bucket a source file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Component,
    Page,
    Layout,
    ApiRoute,
    Style,
    Config,
    Asset,
    Unclassified,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Page => "page",
            Self::Layout => "layout",
            Self::ApiRoute => "api_route",
            Self::Style => "style",
            Self::Config => "config",
            Self::Asset => "asset",
            Self::Unclassified => "unclassified",
        }
    }

    /// Whether files of this category go through the rewrite pipeline.
    ///
    /// Config files belong to the scaffolding step, assets to the asset
    /// copier, and unclassified files are only reported.
    pub fn is_convertible(&self) -> bool {
        !matches!(self, Self::Config | Self::Asset | Self::Unclassified)
    }

    /// Subdirectory of the target source tree that receives this category.
    pub fn target_subdir(&self) -> Option<&'static str> {
        match self {
            Self::Component => Some("components"),
            Self::Page => Some("pages"),
            Self::Layout => Some("layouts"),
            Self::ApiRoute => Some("api"),
            Self::Style => Some("styles"),
            Self::Config | Self::Asset | Self::Unclassified => None,
        }
    }

    /// Directory names in the source tree that mark this category. Output
    /// paths are taken relative to the last such segment.
    pub fn source_segments(&self) -> &'static [&'static str] {
        match self {
            Self::Component => &["components"],
            Self::Page => &["pages", "app"],
            Self::Layout => &["layouts", "layout"],
            Self::ApiRoute => &["api"],
            Self::Style => &["styles"],
            Self::Asset => &["public", "assets"],
            Self::Config | Self::Unclassified => &[],
        }
    }

    pub fn all() -> &'static [Category] {
        &[
            Self::Component,
            Self::Page,
            Self::Layout,
            Self::ApiRoute,
            Self::Style,
            Self::Config,
            Self::Asset,
            Self::Unclassified,
        ]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a rule may look at: the path split into lowercase pieces and
/// the lowercased text when the file could be read.
pub struct FileProbe<'a> {
    pub path: &'a Path,
    pub file_name: String,
    pub file_stem: String,
    pub extension: String,
    pub dirs: Vec<String>,
    pub content: Option<String>,
}

impl<'a> FileProbe<'a> {
    pub fn new(path: &'a Path, content: Option<&str>) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let dirs = path
            .parent()
            .map(|parent| {
                parent
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(os) => Some(os.to_string_lossy().to_lowercase()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            path,
            file_name,
            file_stem,
            extension,
            dirs,
            content: content.map(str::to_lowercase),
        }
    }

    pub fn has_dir(&self, names: &[&str]) -> bool {
        self.dirs.iter().any(|d| names.contains(&d.as_str()))
    }

    /// Content test that evaluates false when the text is unavailable.
    pub fn content_has_any(&self, needles: &[&str]) -> bool {
        self.content
            .as_deref()
            .map(|c| needles.iter().any(|n| c.contains(n)))
            .unwrap_or(false)
    }
}

/// One entry of the ordered rule list.
pub struct ClassificationRule {
    pub category: Category,
    pub name: &'static str,
    test: Box<dyn Fn(&FileProbe) -> bool + Send + Sync>,
}

impl ClassificationRule {
    pub fn new(
        category: Category,
        name: &'static str,
        test: impl Fn(&FileProbe) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            name,
            test: Box::new(test),
        }
    }

    pub fn matches(&self, probe: &FileProbe) -> bool {
        (self.test)(probe)
    }
}

const API_SIGNATURES: &[&str] = &["req,", "res,", "request", "response"];
const COMPONENT_SIGNATURES: &[&str] = &["react", "export default", "<"];
const DATA_HOOKS: &[&str] = &["getstaticprops", "getserversideprops", "getstaticpaths"];

pub struct FileClassifier {
    rules: Vec<ClassificationRule>,
}

impl FileClassifier {
    pub fn new(scan: &ScanConfig) -> Self {
        let mut classifier = Self { rules: Vec::new() };
        classifier.initialize_rules(scan);
        classifier
    }

    fn initialize_rules(&mut self, scan: &ScanConfig) {
        let config_patterns: Vec<glob::Pattern> = scan
            .config_files
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "ignoring invalid config file pattern");
                    None
                }
            })
            .collect();
        let style_exts = lowercase_all(&scan.style_extensions);
        let script_exts = lowercase_all(&scan.script_extensions);
        let is_script = move |probe: &FileProbe| script_exts.contains(&probe.extension);

        self.rules.push(ClassificationRule::new(
            Category::Config,
            "config file name",
            move |probe| config_patterns.iter().any(|p| p.matches(&probe.file_name)),
        ));

        self.rules.push(ClassificationRule::new(
            Category::Style,
            "style sheet extension",
            move |probe| style_exts.contains(&probe.extension),
        ));

        let script = is_script.clone();
        self.rules.push(ClassificationRule::new(
            Category::ApiRoute,
            "api segment with request handler",
            move |probe| {
                script(probe) && probe.has_dir(&["api"]) && probe.content_has_any(API_SIGNATURES)
            },
        ));

        let script = is_script.clone();
        self.rules.push(ClassificationRule::new(
            Category::Component,
            "components segment with markup",
            move |probe| {
                script(probe)
                    && probe.has_dir(&["components"])
                    && probe.content_has_any(COMPONENT_SIGNATURES)
            },
        ));

        let script = is_script.clone();
        self.rules.push(ClassificationRule::new(
            Category::Page,
            "pages segment or data-fetching hook",
            move |probe| {
                script(probe)
                    && (probe.has_dir(&["pages"])
                        || (probe.has_dir(&["app"]) && probe.file_stem == "page")
                        || probe.content_has_any(DATA_HOOKS))
            },
        ));

        let script = is_script;
        self.rules.push(ClassificationRule::new(
            Category::Layout,
            "layout segment or children composition",
            move |probe| {
                script(probe)
                    && (probe.has_dir(&["layout", "layouts"])
                        || probe.file_stem == "layout"
                        || probe.content_has_any(&["children"]))
            },
        ));

        self.rules.push(ClassificationRule::new(
            Category::Asset,
            "public or assets segment",
            |probe| probe.has_dir(&["public", "assets"]),
        ));
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Assign exactly one category to `path`.
    ///
    /// `content` is `None` when the file is not readable text. Such a file is
    /// never given a convertible category.
    pub fn classify(&self, path: &Path, content: Option<&str>) -> Category {
        let probe = FileProbe::new(path, content);
        let category = self
            .rules
            .iter()
            .find(|rule| rule.matches(&probe))
            .map(|rule| rule.category)
            .unwrap_or(Category::Unclassified);

        if content.is_none() && category.is_convertible() {
            return Category::Unclassified;
        }
        category
    }
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim_start_matches('.').to_lowercase())
        .collect()
}
