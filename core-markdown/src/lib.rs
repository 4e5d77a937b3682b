//! # Markdown Conversion
//!
//! Converts a page's block tree into markdown.
//!
//! ## Overview
//!
//! - [`converter`] - fetches the tree through a `BlockSource` and implements
//!   `ContentConverter`
//! - [`transform`] - block kind to transformer registry and render context
//! - [`custom`] - publishing overrides (callout, bookmark, embeds, media)
//! - [`rich_text`] - inline annotation rendering
//! - [`emoji`] - Twemoji normalization for emoji icons
//!
//! ## Usage
//!
//! ```ignore
//! use core_markdown::MarkdownConverter;
//! use std::sync::Arc;
//!
//! let converter = MarkdownConverter::new(Arc::new(notion_connector));
//! let markdown = converter.page_to_markdown(page_id).await?;
//! ```

pub mod converter;
pub mod custom;
pub mod emoji;
pub mod error;
mod render;
pub mod rich_text;
pub mod transform;

pub use converter::MarkdownConverter;
pub use error::{MarkdownError, Result};
pub use transform::{BlockTransformer, RenderContext, TransformerRegistry};
