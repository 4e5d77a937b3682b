//! Collaborators for hosts that run on a normal OS: a `reqwest` transport
//! and `tokio::fs` file access.
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, TokioFileSystem};
//! use core_service::{CoreDependencies, CoreService};
//!
//! let deps = CoreDependencies::new(
//!     Arc::new(ReqwestHttpClient::new()),
//!     Arc::new(TokioFileSystem::new()),
//! );
//! let service = CoreService::new(&config, deps)?;
//! ```

mod filesystem;
mod http;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
