//! # Local State Reader
//!
//! Reads the metadata header of artifacts already on disk.
//!
//! An artifact starts with a YAML block between two `---` lines:
//!
//! ```markdown
//! ---
//! id: 0c6d...
//! title: Hello
//! ---
//!
//! Body text
//! ```
//!
//! A missing file, a missing delimiter and unparseable YAML all read as
//! "absent"; the file itself is never touched here.

use bridge_traits::error::BridgeError;
use bridge_traits::storage::FileSystemAccess;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::path::ARTIFACT_EXTENSION;
use crate::projector::{ProjectedProperties, FILENAME_KEY, ID_KEY};

const DELIMITER: &str = "---";

/// Split raw artifact text into its header YAML and body.
///
/// The header must open on the first line; returns `None` for the header
/// when either delimiter is missing.
pub fn split_front_matter(raw: &str) -> (Option<&str>, &str) {
    let Some(rest) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return (None, raw);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    (None, raw)
}

/// Parse header YAML into a property mapping. Non-mapping documents are rejected.
pub fn parse_header(yaml: &str) -> Option<ProjectedProperties> {
    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "Header is not valid YAML");
            None
        }
    }
}

/// One artifact found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalArtifact {
    pub path: PathBuf,
    /// File name without extension
    pub stem: String,
    /// Parsed header; `filename` is always the stem
    pub header: ProjectedProperties,
}

impl LocalArtifact {
    /// Record id stored in the header.
    pub fn id(&self) -> Option<&str> {
        self.header.get(ID_KEY).and_then(Value::as_str)
    }

    /// Header value as text, `None` when empty or falsy.
    pub fn text_value(&self, key: &str) -> Option<String> {
        match self.header.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
            Value::Bool(true) => Some("true".to_string()),
            _ => None,
        }
    }
}

pub struct LocalStateReader {
    fs: Arc<dyn FileSystemAccess>,
}

impl LocalStateReader {
    pub fn new(fs: Arc<dyn FileSystemAccess>) -> Self {
        Self { fs }
    }

    /// Load the artifact at `path`, or `None` when it is absent or its header
    /// cannot be read.
    pub async fn load(&self, path: &Path) -> Option<LocalArtifact> {
        let raw = match self.fs.read_to_string(path).await {
            Ok(raw) => raw,
            Err(BridgeError::NotFound(_)) => {
                debug!(path = %path.display(), "Artifact does not exist");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read artifact");
                return None;
            }
        };

        let (yaml, _) = split_front_matter(&raw);
        let Some(mut header) = yaml.and_then(parse_header) else {
            debug!(path = %path.display(), "Artifact has no readable header");
            return None;
        };

        let stem = artifact_stem(path);
        header.insert(FILENAME_KEY.to_string(), Value::String(stem.clone()));

        Some(LocalArtifact {
            path: path.to_path_buf(),
            stem,
            header,
        })
    }

    /// Top-level `.md` files of `dir`; subdirectories are not descended.
    pub async fn list_artifacts(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = self
            .fs
            .list_directory(dir)
            .await
            .map_err(|e| SyncError::io(dir, e))?;

        Ok(entries
            .into_iter()
            .filter(|path| {
                path.extension().and_then(|ext| ext.to_str()) == Some(ARTIFACT_EXTENSION)
            })
            .collect())
    }
}

fn artifact_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
