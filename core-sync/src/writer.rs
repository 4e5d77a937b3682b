//! Artifact Writer
//!
//! Serializes header and body into the on-disk format
//!
//! ```text
//! ---
//! <yaml>
//! ---
//!
//! <body>
//! ```
//!
//! and normalizes the result so repeated passes produce identical bytes.

use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::projector::ProjectedProperties;

pub struct ArtifactWriter {
    fs: Arc<dyn FileSystemAccess>,
}

impl ArtifactWriter {
    pub fn new(fs: Arc<dyn FileSystemAccess>) -> Self {
        Self { fs }
    }

    /// Render header and body into the final artifact text.
    pub fn render(header: &ProjectedProperties, body: &str) -> Result<String> {
        let yaml = serde_yaml::to_string(header).map_err(|e| SyncError::Header(e.to_string()))?;
        Ok(normalize_markdown(&format!("---\n{}---\n\n{}", yaml, body)))
    }

    /// Render and write, replacing whatever is at `path`.
    pub async fn write(&self, path: &Path, header: &ProjectedProperties, body: &str) -> Result<()> {
        let text = Self::render(header, body)?;
        let size = text.len();

        self.fs
            .write_file(path, Bytes::from(text))
            .await
            .map_err(|e| SyncError::io(path, e))?;

        debug!(path = %path.display(), bytes = size, "Artifact written");
        Ok(())
    }
}

/// Deterministic markdown cleanup.
///
/// Line endings become `\n`, trailing whitespace is dropped, runs of blank
/// lines collapse to one and the text ends with exactly one newline. Fenced
/// code blocks are copied verbatim apart from line endings.
pub fn normalize_markdown(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let mut out = String::with_capacity(text.len());
    let mut in_fence = false;
    let mut blank_run = 0;

    for line in text.lines() {
        let is_fence = line.trim_start().starts_with("```");

        if in_fence {
            out.push_str(line);
            out.push('\n');
            if is_fence {
                in_fence = false;
            }
            continue;
        }

        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }

        out.push_str(line);
        out.push('\n');
        in_fence = is_fence;
    }

    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out.push('\n');
    out
}
