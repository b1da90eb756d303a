use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub convert: ConvertConfig,
    pub project: ProjectConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory or file names that are never visited.
    pub exclude: Vec<String>,
    /// Glob patterns matched against file names.
    pub config_files: Vec<String>,
    pub style_extensions: Vec<String>,
    pub script_extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude: to_strings(&[
                "node_modules",
                ".next",
                ".git",
                "dist",
                "build",
                "out",
                "__pycache__",
                ".env",
            ]),
            config_files: to_strings(&[
                "next.config.*",
                "package.json",
                "package-lock.json",
                "tsconfig.json",
                "jsconfig.json",
                "next-env.d.ts",
                "next-sitemap.config.js",
                ".eslintrc*",
                "postcss.config.*",
                "tailwind.config.*",
            ]),
            style_extensions: to_strings(&["css", "scss", "sass", "less"]),
            script_extensions: to_strings(&["js", "jsx", "ts", "tsx", "mjs"]),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ConvertConfig {
    pub concurrency: usize,
    /// Files above this size fail instead of being rewritten.
    pub max_file_size: u64,
    /// Name of the source directory inside the target project.
    pub source_dir: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_file_size: 1_048_576,
            source_dir: "src".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScaffoldMode {
    /// Write a minimal React skeleton directly.
    Template,
    /// Run create-react-app, then fill in the skeleton.
    CreateReactApp,
    /// Assume the target already is a React project.
    Skip,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProjectConfig {
    pub scaffold: ScaffoldMode,
    pub install_dependencies: bool,
    pub required_packages: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            scaffold: ScaffoldMode::Template,
            install_dependencies: true,
            required_packages: to_strings(&["react-router-dom", "react-helmet"]),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    pub color_output: bool,
    pub show_diffs: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color_output: true,
            show_diffs: true,
        }
    }
}

impl Config {
    pub fn create_default(path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Load `explicit` if given, otherwise the per-user config file when it
    /// exists, otherwise built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match get_config_path() {
            Ok(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "nextshift", "nextshift")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_round_trips_through_toml() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested/config.toml");
        Config::create_default(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.convert.concurrency, 4);
        assert_eq!(loaded.project.scaffold, ScaffoldMode::Template);
        assert!(loaded.scan.exclude.contains(&"node_modules".to_string()));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[convert]\nconcurrency = 9\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.convert.concurrency, 9);
        assert_eq!(loaded.convert.source_dir, "src");
        assert!(loaded.display.color_output);
    }
}
