//! # Asset Rewriter
//!
//! Re-hosts images referenced by a converted body, and the cover, through an
//! [`AssetUploader`].
//!
//! Detection lives behind [`ImageMatcher`] so the rule can be swapped without
//! touching the upload path. The default [`ExtensionImageMatcher`] accepts
//! `![alt](url)` where `url` is an http(s) link whose path ends in a known
//! image extension (query string allowed) and which is not already under one
//! of the configured re-host prefixes. Already migrated links are therefore
//! never uploaded twice.

use bridge_traits::content::AssetUploader;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::projector::{ProjectedProperties, COVER_KEY};

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp"];

static MARKDOWN_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[([^\[\]]*)\]\(([^)\s]+)\)").expect("markdown image pattern is valid")
});

/// One image construct found in a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Exact matched text, `![alt](url)`
    pub original: String,
    pub alt: String,
    pub url: String,
}

impl ImageReference {
    /// The same construct pointing at `url`.
    pub fn with_url(&self, url: &str) -> String {
        format!("![{}]({})", self.alt, url)
    }
}

/// Decides which references are re-hosted.
pub trait ImageMatcher: Send + Sync {
    /// Image references in `body` that should be uploaded, in order of appearance.
    fn find_images(&self, body: &str) -> Vec<ImageReference>;

    /// Whether a bare URL (the cover) should be uploaded.
    fn is_external(&self, url: &str) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct ExtensionImageMatcher {
    skip_prefixes: Vec<String>,
}

impl ExtensionImageMatcher {
    pub fn new(skip_prefixes: Vec<String>) -> Self {
        Self { skip_prefixes }
    }

    fn is_image_url(url: &str) -> bool {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let Some((_, extension)) = path.rsplit_once('.') else {
            return false;
        };
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| extension.eq_ignore_ascii_case(known))
    }

    fn is_migrated(&self, url: &str) -> bool {
        self.skip_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && url.starts_with(prefix.as_str()))
    }
}

impl ImageMatcher for ExtensionImageMatcher {
    fn find_images(&self, body: &str) -> Vec<ImageReference> {
        MARKDOWN_IMAGE
            .captures_iter(body)
            .filter_map(|caps| {
                let url = caps.get(2)?.as_str();
                let is_remote = url.starts_with("http://") || url.starts_with("https://");
                if !is_remote || !Self::is_image_url(url) || self.is_migrated(url) {
                    return None;
                }
                Some(ImageReference {
                    original: caps.get(0)?.as_str().to_string(),
                    alt: caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
                    url: url.to_string(),
                })
            })
            .collect()
    }

    fn is_external(&self, url: &str) -> bool {
        url.starts_with("https://") && !self.is_migrated(url)
    }
}

pub struct AssetRewriter {
    uploader: Arc<dyn AssetUploader>,
    matcher: Arc<dyn ImageMatcher>,
}

impl AssetRewriter {
    pub fn new(uploader: Arc<dyn AssetUploader>, matcher: Arc<dyn ImageMatcher>) -> Self {
        Self { uploader, matcher }
    }

    /// Upload every matched image once and swap in the new locations.
    ///
    /// References whose upload fails or yields nothing are left as they are.
    pub async fn rewrite_body(&self, body: &str) -> String {
        let mut references = self.matcher.find_images(body);
        if references.is_empty() {
            debug!("No images to migrate");
            return body.to_string();
        }

        let mut seen = HashSet::new();
        references.retain(|reference| seen.insert(reference.original.clone()));

        let mut unique = HashSet::new();
        let urls: Vec<&str> = references
            .iter()
            .map(|r| r.url.as_str())
            .filter(|url| unique.insert(*url))
            .collect();

        let uploaded = join_all(urls.iter().map(|url| self.upload(url))).await;
        let locations: HashMap<&str, String> = urls
            .iter()
            .zip(uploaded)
            .filter_map(|(url, new_url)| Some((*url, new_url?)))
            .collect();

        let mut rewritten = body.to_string();
        for reference in &references {
            if let Some(new_url) = locations.get(reference.url.as_str()) {
                rewritten = rewritten.replace(&reference.original, &reference.with_url(new_url));
            }
        }
        rewritten
    }

    /// Re-host the `cover` property when it points at an external URL.
    pub async fn rewrite_cover(&self, properties: &mut ProjectedProperties) {
        let Some(cover) = properties
            .get(COVER_KEY)
            .and_then(Value::as_str)
            .filter(|url| self.matcher.is_external(url))
            .map(str::to_string)
        else {
            return;
        };

        if let Some(new_url) = self.upload(&cover).await {
            properties.insert(COVER_KEY.to_string(), Value::String(new_url));
        }
    }

    async fn upload(&self, url: &str) -> Option<String> {
        match self.uploader.upload(url).await {
            Ok(Some(new_url)) if !new_url.is_empty() => {
                debug!(from = %url, to = %new_url, "Image migrated");
                Some(new_url)
            }
            Ok(_) => {
                warn!(url = %url, "Upload returned no location, keeping original");
                None
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Image upload failed, keeping original");
                None
            }
        }
    }
}
