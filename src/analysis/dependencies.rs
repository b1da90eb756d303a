use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::Path;

pub const MANIFEST_FILE: &str = "package.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    pub is_dev: bool,
}

impl Dependency {
    /// The framework itself or one of its first-party plugins.
    pub fn is_next_related(&self) -> bool {
        self.name == "next" || self.name.starts_with("next-") || self.name.starts_with("@next/")
    }
}

/// Reads the npm dependency tables of a project root.
pub struct DependencyAnalyzer;

impl DependencyAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub async fn analyze(&self, path: &Path) -> Result<Vec<Dependency>> {
        let package_path = path.join(MANIFEST_FILE);
        let content = tokio::fs::read_to_string(&package_path)
            .await
            .with_context(|| format!("reading {}", package_path.display()))?;
        parse_package_json(&content)
            .with_context(|| format!("parsing {}", package_path.display()))
    }
}

impl Default for DependencyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn parse_package_json(content: &str) -> Result<Vec<Dependency>> {
    let package_json: JsonValue = serde_json::from_str(content)?;
    let mut deps = Vec::new();

    for (table, is_dev) in [("dependencies", false), ("devDependencies", true)] {
        if let Some(entries) = package_json.get(table).and_then(|d| d.as_object()) {
            for (name, version) in entries {
                deps.push(Dependency {
                    name: name.clone(),
                    version: version.as_str().unwrap_or("*").to_string(),
                    is_dev,
                });
            }
        }
    }

    Ok(deps)
}
