use super::command::run_checked;
use super::DependencyInstaller;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

/// `npm install --save <packages>` in the target directory.
pub struct NpmInstaller;

#[async_trait]
impl DependencyInstaller for NpmInstaller {
    async fn install(&self, target: &Path, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        which::which("npm")
            .map_err(|_| anyhow!("npm is not available; install Node.js and npm first"))?;

        info!(packages = %packages.join(" "), "installing dependencies");
        let mut args = vec!["install", "--save"];
        args.extend(packages.iter().map(String::as_str));
        run_checked("npm", &args, target).await?;
        Ok(())
    }
}

pub struct SkipInstaller;

#[async_trait]
impl DependencyInstaller for SkipInstaller {
    async fn install(&self, _target: &Path, packages: &[String]) -> Result<()> {
        if !packages.is_empty() {
            info!(packages = %packages.join(" "), "dependency installation disabled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_skip_installer_succeeds() {
        let temp = tempfile::tempdir().unwrap();
        SkipInstaller
            .install(temp.path(), &["react-router-dom".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_nothing_to_install() {
        let temp = tempfile::tempdir().unwrap();
        NpmInstaller.install(temp.path(), &[]).await.unwrap();
    }
}
