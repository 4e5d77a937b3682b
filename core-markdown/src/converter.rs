//! # Page to Markdown Converter
//!
//! Fetches a page's complete block tree through a [`BlockSource`] and renders
//! it with a [`TransformerRegistry`].
//!
//! Fetching and rendering are separate steps: the whole tree is loaded first
//! (sibling subtrees concurrently), then rendered synchronously, so
//! transformers never perform I/O.

use async_trait::async_trait;
use bridge_traits::{
    blocks::{Block, BlockSource},
    content::ContentConverter,
    error::Result as BridgeResult,
};
use futures::future::{try_join_all, BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{MarkdownError, Result};
use crate::transform::TransformerRegistry;

/// Block kinds whose children belong to another document.
const DETACHED_KINDS: &[&str] = &["child_page", "child_database"];

pub struct MarkdownConverter {
    source: Arc<dyn BlockSource>,
    registry: TransformerRegistry,
}

impl MarkdownConverter {
    /// Converter using the publishing transformers.
    pub fn new(source: Arc<dyn BlockSource>) -> Self {
        Self::with_registry(source, TransformerRegistry::with_publishing_transformers())
    }

    pub fn with_registry(source: Arc<dyn BlockSource>, registry: TransformerRegistry) -> Self {
        Self { source, registry }
    }

    pub fn registry(&self) -> &TransformerRegistry {
        &self.registry
    }

    /// Load the children of `block_id`, recursively populating nested blocks.
    pub fn fetch_tree<'a>(&'a self, block_id: &'a str) -> BoxFuture<'a, Result<Vec<Block>>> {
        async move {
            let blocks = self
                .source
                .list_children(block_id)
                .await
                .map_err(|source| MarkdownError::Fetch {
                    block_id: block_id.to_string(),
                    source,
                })?;

            try_join_all(blocks.into_iter().map(|block| self.populate(block))).await
        }
        .boxed()
    }

    async fn populate(&self, mut block: Block) -> Result<Block> {
        if block.has_children && !DETACHED_KINDS.contains(&block.kind.as_str()) {
            let children = self.fetch_tree(&block.id).await?;
            block.children = children;
        }
        Ok(block)
    }

    /// Render an already fetched tree.
    pub fn render(&self, blocks: &[Block]) -> String {
        self.registry.render(blocks)
    }

    /// Fetch and render one page.
    #[instrument(skip(self))]
    pub async fn page_to_markdown(&self, page_id: &str) -> Result<String> {
        let tree = self.fetch_tree(page_id).await?;
        debug!(top_level_blocks = tree.len(), "Fetched block tree");
        Ok(self.render(&tree))
    }
}

#[async_trait]
impl ContentConverter for MarkdownConverter {
    async fn convert(&self, record_id: &str) -> BridgeResult<String> {
        Ok(self.page_to_markdown(record_id).await?)
    }
}
