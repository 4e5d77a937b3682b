//! # Host Bridge Traits
//!
//! Collaborator contracts consumed by the sync engine.
//!
//! This crate defines the boundary between the reconciliation core and the
//! outside world. Each trait represents a capability the core requires but
//! does not own: talking to the remote content store, turning a page's block
//! tree into text, re-hosting images, and touching the local file system.
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - JSON over HTTP; non-2xx statuses come back as responses
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Local file I/O
//!
//! ### Remote content store
//! - [`RemoteStore`](remote::RemoteStore) - Query records, update a subset of properties
//! - [`BlockSource`](blocks::BlockSource) - List the block children of a page or block
//!
//! ### Content pipeline
//! - [`ContentConverter`](content::ContentConverter) - Record id to body text
//! - [`AssetUploader`](content::AssetUploader) - Re-host a remote asset, returning its new URL
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Concrete
//! adapters convert their own error enums into `BridgeError` so the engine sees
//! a single failure type at every seam.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds: the engine fans work out
//! into concurrent tasks that share the same collaborator handles.

pub mod blocks;
pub mod content;
pub mod error;
pub mod http;
pub mod logging;
pub mod remote;
pub mod storage;

pub use blocks::{Block, BlockSource};
pub use content::{AssetUploader, ContentConverter};
pub use error::BridgeError;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use remote::{
    FileObject, PropertyPatch, PropertyValue, RecordFilter, RecordQuery, RecordSort,
    RemoteRecord, RemoteStore, RichText, SelectOption, SortDirection,
};
pub use storage::FileSystemAccess;
