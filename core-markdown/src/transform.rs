//! # Block Transformer Registry
//!
//! Maps a block kind tag to the strategy that renders it. Kinds without a
//! registered transformer, or whose transformer declines a block by returning
//! `None`, fall back to the built-in renderers in [`crate::render`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_markdown::transform::TransformerRegistry;
//!
//! let mut registry = TransformerRegistry::with_publishing_transformers();
//! registry.register("divider", |_block: &Block, _ctx: &RenderContext<'_>| {
//!     Some("***".to_string())
//! });
//! ```

use bridge_traits::blocks::Block;
use std::collections::HashMap;
use std::sync::Arc;

use crate::custom;
use crate::render;

/// Renders one block kind.
pub trait BlockTransformer: Send + Sync {
    /// Render `block`, or return `None` to use the default renderer.
    fn transform(&self, block: &Block, ctx: &RenderContext<'_>) -> Option<String>;
}

impl<F> BlockTransformer for F
where
    F: Fn(&Block, &RenderContext<'_>) -> Option<String> + Send + Sync,
{
    fn transform(&self, block: &Block, ctx: &RenderContext<'_>) -> Option<String> {
        self(block, ctx)
    }
}

/// Block kind tag -> transformer.
#[derive(Clone, Default)]
pub struct TransformerRegistry {
    transformers: HashMap<String, Arc<dyn BlockTransformer>>,
}

impl std::fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&String> = self.transformers.keys().collect();
        kinds.sort();
        f.debug_struct("TransformerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

impl TransformerRegistry {
    /// Registry with no overrides; every kind uses its default renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the overrides used for blog publishing:
    /// callout, bookmark, link_preview, embed, video, pdf, audio and image.
    pub fn with_publishing_transformers() -> Self {
        let mut registry = Self::new();
        registry.register("callout", custom::callout);
        registry.register("bookmark", custom::bookmark);
        registry.register("link_preview", custom::link_preview);
        registry.register("embed", custom::embed);
        registry.register("video", custom::video);
        registry.register("pdf", custom::pdf);
        registry.register("audio", custom::audio);
        registry.register("image", custom::image);
        registry
    }

    /// Register (or replace) the transformer for a block kind.
    pub fn register<T>(&mut self, kind: impl Into<String>, transformer: T) -> &mut Self
    where
        T: BlockTransformer + 'static,
    {
        self.transformers
            .insert(kind.into(), Arc::new(transformer));
        self
    }

    pub fn get(&self, kind: &str) -> Option<&Arc<dyn BlockTransformer>> {
        self.transformers.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.transformers.contains_key(kind)
    }

    /// Render a list of sibling blocks.
    pub fn render(&self, blocks: &[Block]) -> String {
        RenderContext::new(self).render_blocks(blocks)
    }
}

/// Rendering state handed to transformers so they can render nested blocks.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    registry: &'a TransformerRegistry,
}

impl<'a> RenderContext<'a> {
    pub fn new(registry: &'a TransformerRegistry) -> Self {
        Self { registry }
    }

    /// Render one block through its transformer, falling back to the default.
    pub fn render_block(&self, block: &Block) -> Option<String> {
        self.registry
            .get(&block.kind)
            .and_then(|transformer| transformer.transform(block, self))
            .or_else(|| render::render_default(block, self))
    }

    /// Render each block on its own, dropping blocks that produce nothing.
    pub fn render_each(&self, blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .filter_map(|block| self.render_block(block))
            .collect()
    }

    /// Render sibling blocks into one markdown fragment.
    ///
    /// Blocks are separated by a blank line; consecutive list items of the
    /// same kind are kept tight, and numbered items are numbered in sequence.
    pub fn render_blocks(&self, blocks: &[Block]) -> String {
        let mut out = String::new();
        let mut previous_kind: Option<&str> = None;
        let mut ordinal = 0usize;

        for block in blocks {
            if block.kind == "numbered_list_item" {
                ordinal = if previous_kind == Some("numbered_list_item") {
                    ordinal + 1
                } else {
                    1
                };
            }

            let rendered = if block.kind == "numbered_list_item" {
                self.registry
                    .get(&block.kind)
                    .and_then(|transformer| transformer.transform(block, self))
                    .or_else(|| render::numbered_list_item(block, self, ordinal))
            } else {
                self.render_block(block)
            };

            let Some(rendered) = rendered else {
                continue;
            };

            if !out.is_empty() {
                let tight = previous_kind == Some(block.kind.as_str())
                    && render::is_list_item(&block.kind);
                out.push_str(if tight { "\n" } else { "\n\n" });
            }
            out.push_str(&rendered);
            previous_kind = Some(block.kind.as_str());
        }

        out
    }

    /// Render a block's children, indented one list level.
    pub fn render_children_indented(&self, block: &Block) -> String {
        indent(&self.render_blocks(&block.children), "    ")
    }
}

/// Prefix every non-empty line with `prefix`.
pub fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
