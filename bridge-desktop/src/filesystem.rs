//! `tokio::fs` adapter for [`FileSystemAccess`].

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::FileSystemAccess,
};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Local disk access. Paths are used exactly as the engine resolves them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }
}

/// Missing paths become `NotFound`; anything else keeps its kind and gains the path.
fn io_error(path: &Path, err: std::io::Error) -> BridgeError {
    match err.kind() {
        ErrorKind::NotFound => BridgeError::NotFound(path.display().to_string()),
        kind => BridgeError::Io(std::io::Error::new(
            kind,
            format!("{}: {}", path.display(), err),
        )),
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(|e| io_error(path, e))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let contents = fs::read(path).await.map_err(|e| io_error(path, e))?;
        Ok(Bytes::from(contents))
    }

    /// Writes `data`, creating missing parent directories first.
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => self.create_dir_all(parent).await?,
            _ => {}
        }
        fs::write(path, &data).await.map_err(|e| io_error(path, e))?;
        debug!(path = %path.display(), bytes = data.len(), "Wrote artifact");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(|e| io_error(path, e))?;
        debug!(path = %path.display(), "Removed artifact");
        Ok(())
    }

    /// Entries sorted by path, so callers see the same order on every platform.
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut dir = fs::read_dir(path).await.map_err(|e| io_error(path, e))?;
        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| io_error(path, e))? {
            entries.push(entry.path());
        }
        entries.sort();
        Ok(entries)
    }
}
