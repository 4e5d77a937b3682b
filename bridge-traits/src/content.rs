//! Content Pipeline Abstractions
//!
//! Seams the sync engine uses while turning one record into one artifact:
//! converting the record's body to text, and re-hosting embedded assets.

use async_trait::async_trait;

use crate::error::Result;

/// Converts a record's structured body into markdown text.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::content::ContentConverter;
///
/// async fn body(converter: &dyn ContentConverter, id: &str) -> Result<String> {
///     converter.convert(id).await
/// }
/// ```
#[async_trait]
pub trait ContentConverter: Send + Sync {
    /// Fetch the record's block tree and render it.
    async fn convert(&self, record_id: &str) -> Result<String>;
}

/// Re-hosts a remote asset.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    /// Upload the asset found at `source_url`.
    ///
    /// Returns `Ok(None)` when the service accepted the request but produced
    /// no new location; callers keep the original reference in that case.
    async fn upload(&self, source_url: &str) -> Result<Option<String>>;
}
