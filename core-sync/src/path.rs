//! Path Resolver
//!
//! Maps a projected record onto its artifact location:
//!
//! - page: `<page-root>/<filename|id>/index.md`
//! - post: `<post-root>/<filename|title>.md`, where a `/` inside the name
//!   places the file in a subdirectory

use core_runtime::config::OutputDirs;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{error, warn};

use crate::projector::{ProjectedProperties, RecordKind, FILENAME_KEY, ID_KEY, TITLE_KEY};

pub const ARTIFACT_EXTENSION: &str = "md";
pub const PAGE_LEAF: &str = "index.md";

pub const FILE_PATH_KEY: &str = "filePath";
pub const OUTPUT_DIR_KEY: &str = "output_dir";

/// Where one record's artifact lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub kind: RecordKind,
    /// On-disk leaf name
    pub filename: String,
    pub file_path: PathBuf,
    pub output_dir: PathBuf,
}

impl ResolvedPath {
    /// Write `filename`, `filePath` and `output_dir` into the projection.
    pub fn annotate(&self, properties: &mut ProjectedProperties) {
        properties.insert(FILENAME_KEY.to_string(), Value::String(self.filename.clone()));
        properties.insert(
            FILE_PATH_KEY.to_string(),
            Value::String(self.file_path.to_string_lossy().into_owned()),
        );
        properties.insert(
            OUTPUT_DIR_KEY.to_string(),
            Value::String(self.output_dir.to_string_lossy().into_owned()),
        );
    }
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    page_root: PathBuf,
    post_root: PathBuf,
}

impl PathResolver {
    pub fn new(output: &OutputDirs) -> Self {
        Self {
            page_root: output.page.clone(),
            post_root: output.post.clone(),
        }
    }

    pub fn resolve(&self, properties: &ProjectedProperties) -> ResolvedPath {
        let kind = RecordKind::of(properties);
        let id = string_field(properties, ID_KEY).unwrap_or_default();

        let (filename, file_path) = match kind {
            RecordKind::Page => {
                let name = match string_field(properties, FILENAME_KEY) {
                    Some(name) => name,
                    None => {
                        error!(
                            record_id = %id,
                            title = %string_field(properties, TITLE_KEY).unwrap_or_default(),
                            "Page has no filename, using its id"
                        );
                        id
                    }
                };
                (PAGE_LEAF.to_string(), self.page_root.join(name).join(PAGE_LEAF))
            }
            RecordKind::Post => {
                if string_field(properties, FILENAME_KEY).is_none()
                    && string_field(properties, TITLE_KEY).is_none()
                {
                    warn!(record_id = %id, "Post has neither filename nor title, using its id");
                }
                let stem = post_stem(properties).unwrap_or(id);
                let relative = format!("{}.{}", stem, ARTIFACT_EXTENSION);
                let leaf = relative.rsplit('/').next().unwrap_or(&relative).to_string();
                (leaf, self.post_root.join(&relative))
            }
        };

        let output_dir = file_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();

        ResolvedPath {
            kind,
            filename,
            file_path,
            output_dir,
        }
    }
}

/// Name a post is stored under, before the extension: `filename`, else
/// `title`, else the record id.
pub(crate) fn post_stem(properties: &ProjectedProperties) -> Option<String> {
    string_field(properties, FILENAME_KEY)
        .or_else(|| string_field(properties, TITLE_KEY))
        .or_else(|| string_field(properties, ID_KEY))
}

/// Non-empty string value of a projected property.
pub(crate) fn string_field(properties: &ProjectedProperties, key: &str) -> Option<String> {
    properties
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
