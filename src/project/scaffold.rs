use super::command::run_checked;
use super::Scaffolder;
use crate::analysis::Category;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

const EXTRA_DIRS: &[&str] = &["assets", "hooks", "utils"];

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>React App</title>
  </head>
  <body>
    <noscript>You need to enable JavaScript to run this app.</noscript>
    <div id="root"></div>
  </body>
</html>
"#;

const INDEX_JS: &str = r#"import React from 'react';
import ReactDOM from 'react-dom/client';
import './index.css';
import App from './App';

const root = ReactDOM.createRoot(document.getElementById('root'));
root.render(
  <React.StrictMode>
    <App />
  </React.StrictMode>
);
"#;

const APP_JS: &str = r#"import React from 'react';
import { BrowserRouter as Router } from 'react-router-dom';

function App() {
  return (
    <Router>
      <div className="App" />
    </Router>
  );
}

export default App;
"#;

/// Writes a minimal client-rendered React skeleton. Existing files are kept.
pub struct TemplateScaffolder {
    source_dir: String,
}

impl TemplateScaffolder {
    pub fn new(source_dir: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
        }
    }

    fn package_json(target: &Path) -> Result<String> {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase().replace(' ', "-"))
            .unwrap_or_else(|| "converted-app".to_string());
        let package = serde_json::json!({
            "name": name,
            "version": "0.1.0",
            "private": true,
            "dependencies": {
                "react": "^18.2.0",
                "react-dom": "^18.2.0",
                "react-scripts": "5.0.1"
            },
            "scripts": {
                "start": "react-scripts start",
                "build": "react-scripts build",
                "test": "react-scripts test"
            },
            "browserslist": {
                "production": [">0.2%", "not dead", "not op_mini all"],
                "development": ["last 1 chrome version", "last 1 firefox version", "last 1 safari version"]
            }
        });
        Ok(serde_json::to_string_pretty(&package)? + "\n")
    }
}

async fn write_if_absent(path: &Path, content: &str) -> Result<()> {
    if fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "keeping existing file");
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, content)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "created");
    Ok(())
}

#[async_trait]
impl Scaffolder for TemplateScaffolder {
    async fn scaffold(&self, target: &Path) -> Result<()> {
        let src = target.join(&self.source_dir);
        let subdirs = Category::all()
            .iter()
            .filter_map(|c| c.target_subdir())
            .chain(EXTRA_DIRS.iter().copied());
        for dir in subdirs {
            fs::create_dir_all(src.join(dir))
                .await
                .with_context(|| format!("creating {}", src.join(dir).display()))?;
        }

        write_if_absent(&target.join("package.json"), &Self::package_json(target)?).await?;
        write_if_absent(&target.join("public").join("index.html"), INDEX_HTML).await?;
        write_if_absent(&src.join("index.js"), INDEX_JS).await?;
        write_if_absent(&src.join("index.css"), "").await?;
        write_if_absent(&src.join("App.js"), APP_JS).await?;
        Ok(())
    }
}

/// Runs create-react-app, then fills in anything the template step adds.
pub struct CreateReactAppScaffolder {
    template: TemplateScaffolder,
}

impl CreateReactAppScaffolder {
    pub fn new(source_dir: impl Into<String>) -> Self {
        Self {
            template: TemplateScaffolder::new(source_dir),
        }
    }
}

#[async_trait]
impl Scaffolder for CreateReactAppScaffolder {
    async fn scaffold(&self, target: &Path) -> Result<()> {
        which::which("npx")
            .map_err(|_| anyhow!("npx is not available; install Node.js and npm first"))?;

        let parent = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        fs::create_dir_all(&parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
        let target_arg = target.to_string_lossy().into_owned();

        info!(target = %target.display(), "running create-react-app");
        run_checked("npx", &["--yes", "create-react-app", target_arg.as_str()], &parent).await?;

        self.template.scaffold(target).await
    }
}

/// Leaves the target as it is, apart from making sure it exists.
pub struct SkipScaffolder;

#[async_trait]
impl Scaffolder for SkipScaffolder {
    async fn scaffold(&self, target: &Path) -> Result<()> {
        fs::create_dir_all(target)
            .await
            .with_context(|| format!("creating {}", target.display()))?;
        Ok(())
    }
}
