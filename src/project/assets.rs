use super::AssetCopier;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Copies assets into `<target>/public`, dropping a leading `public/`.
pub struct FsAssetCopier;

impl FsAssetCopier {
    pub fn destination(target: &Path, asset: &Path) -> PathBuf {
        let relative = asset.strip_prefix("public").unwrap_or(asset);
        target.join("public").join(relative)
    }
}

#[async_trait]
impl AssetCopier for FsAssetCopier {
    async fn copy(&self, source: &Path, target: &Path, assets: &[PathBuf]) -> Result<usize> {
        for (i, asset) in assets.iter().enumerate() {
            let from = source.join(asset);
            let to = Self::destination(target, asset);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::copy(&from, &to)
                .await
                .with_context(|| format!("copying {} to {}", from.display(), to.display()))?;
            debug!(asset = %asset.display(), n = i + 1, total = assets.len(), "copied asset");
        }
        Ok(assets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_copy_strips_public_prefix() {
        let source = tempdir().unwrap();
        let target = tempdir().unwrap();
        std::fs::create_dir_all(source.path().join("public/img")).unwrap();
        std::fs::create_dir_all(source.path().join("assets")).unwrap();
        std::fs::write(source.path().join("public/img/logo.png"), [1u8, 2, 3]).unwrap();
        std::fs::write(source.path().join("assets/font.woff"), [4u8]).unwrap();

        let assets = vec![
            PathBuf::from("public/img/logo.png"),
            PathBuf::from("assets/font.woff"),
        ];
        let copied = FsAssetCopier
            .copy(source.path(), target.path(), &assets)
            .await
            .unwrap();

        assert_eq!(copied, 2);
        assert_eq!(
            std::fs::read(target.path().join("public/img/logo.png")).unwrap(),
            vec![1, 2, 3]
        );
        assert!(target.path().join("public/assets/font.woff").exists());
    }

    #[tokio::test]
    async fn test_missing_asset_is_an_error() {
        let source = tempdir().unwrap();
        let target = tempdir().unwrap();
        let result = FsAssetCopier
            .copy(source.path(), target.path(), &[PathBuf::from("public/gone.png")])
            .await;
        assert!(result.is_err());
    }
}
