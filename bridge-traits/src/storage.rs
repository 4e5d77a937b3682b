//! File System Abstractions
//!
//! Provides a platform-agnostic trait for the local file I/O the sync engine
//! performs against its output directories.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File system access trait
///
/// Abstracts the handful of file operations the engine needs so passes can
/// run against a real directory tree or an in-memory double.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn write_post(fs: &dyn FileSystemAccess, root: &Path, text: String) -> Result<()> {
///     fs.create_dir_all(root).await?;
///     fs.write_file(&root.join("hello.md"), text.into()).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating it if it doesn't exist and truncating it otherwise
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory (non-recursive)
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Read a file as UTF-8 text
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        let data = self.read_file(path).await?;
        String::from_utf8(data.to_vec()).map_err(|e| {
            crate::error::BridgeError::OperationFailed(format!(
                "{} is not valid UTF-8: {}",
                path.display(),
                e
            ))
        })
    }
}
