//! # Notion Provider
//!
//! Implements `RemoteStore` and `BlockSource` for the Notion REST API.
//!
//! ## Overview
//!
//! This module provides:
//! - Database queries with filters and sorts, following `next_cursor` to the end
//! - Page property updates (`PATCH /pages/{id}`)
//! - Block children listing for the markdown converter
//! - Client-side rate limiting and exponential backoff on 429 / 5xx

pub mod connector;
pub mod error;
pub mod types;

pub use connector::NotionConnector;
pub use error::{NotionError, Result};
