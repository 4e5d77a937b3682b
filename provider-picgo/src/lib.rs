//! # PicGo Provider
//!
//! Implements `AssetUploader` against a PicGo-compatible upload server
//! (the PicGo desktop app or `picgo-server`), which re-hosts a remote image on
//! whatever image bed the server is configured for.

pub mod error;
pub mod uploader;

pub use error::{PicGoError, Result};
pub use uploader::PicGoUploader;
