//! Block Tree Abstractions
//!
//! A page body is a tree of typed blocks. Providers list the direct children
//! of a block; the converter walks the tree and renders it to text.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// One node of a page's block tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: String,

    /// Block kind tag (`paragraph`, `callout`, `image`, ...)
    pub kind: String,

    pub has_children: bool,

    /// Kind-specific payload (the object stored under the kind's key)
    pub data: Value,

    /// Child blocks, populated by the converter when `has_children` is set
    pub children: Vec<Block>,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            has_children: false,
            data,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.has_children = !children.is_empty();
        self.children = children;
        self
    }
}

/// Source of block children
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// List every direct child of a page or block, following pagination.
    async fn list_children(&self, block_id: &str) -> Result<Vec<Block>>;
}
