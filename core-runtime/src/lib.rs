//! Settings and logging shared by every crate in the workspace.
//!
//! [`AppConfig`] is the user-facing YAML file (plus `NOTION_SECRET` and
//! `NOTION_DATABASE_ID` overrides); [`SyncSettings`] is the validated, immutable view
//! of it that a reconciliation pass runs with. [`logging`] installs the
//! `tracing` subscriber and the optional host log sink.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AppConfig, SyncSettings};
pub use error::{Error, Result};
