//! Umbrella package for the notion-sync workspace.
//!
//! With `desktop-shims` enabled it re-exports [`core_service`], so a host
//! can depend on this one package and call `desktop_dependencies`.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
