use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Local file storage
///
/// Every file the pipeline creates goes through this trait, addressed by
/// path. Parent directories are created on demand.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// Copy `from` to `to`, returning the number of bytes written
    async fn copy(&self, from: &Path, to: &Path) -> Result<u64>;

    /// Move `from` to `to`, returning the size of the moved file
    ///
    /// On success `from` no longer exists.
    async fn move_file(&self, from: &Path, to: &Path) -> Result<u64>;

    /// Delete a file
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Check whether a file exists
    async fn exists(&self, path: &Path) -> bool;

    /// Read a whole file
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Create or replace a file with `bytes`
    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;
}

/// `Storage` backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for LocalStorage {
    async fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        Self::ensure_parent(to).await?;
        let bytes = fs::copy(from, to)
            .await
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;

        debug!("Copied {} -> {} ({} bytes)", from.display(), to.display(), bytes);
        Ok(bytes)
    }

    async fn move_file(&self, from: &Path, to: &Path) -> Result<u64> {
        Self::ensure_parent(to).await?;

        if let Err(rename_err) = fs::rename(from, to).await {
            // rename cannot cross filesystems; fall back to copy + delete
            debug!(
                "Rename {} -> {} failed ({}), copying instead",
                from.display(),
                to.display(),
                rename_err
            );
            fs::copy(from, to)
                .await
                .with_context(|| format!("Failed to move {} to {}", from.display(), to.display()))?;
            if let Err(e) = fs::remove_file(from).await {
                // Don't leave two copies behind
                let _ = fs::remove_file(to).await;
                return Err(e)
                    .with_context(|| format!("Failed to remove {} after copy", from.display()));
            }
        }

        let size = fs::metadata(to)
            .await
            .with_context(|| format!("Failed to stat {}", to.display()))?
            .len();

        debug!("Moved {} -> {} ({} bytes)", from.display(), to.display(), size);
        Ok(size)
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .await
            .with_context(|| format!("Failed to delete {}", path.display()))
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_parent(path).await?;
        fs::write(path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
