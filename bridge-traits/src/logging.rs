//! Host Log Forwarding
//!
//! The engine logs through `tracing`. Hosts that keep their own log stream
//! (a site generator's console, a CI annotation stream) implement
//! [`LoggerSink`] and receive a copy of every event as a [`LogEntry`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// One forwarded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Module path of the emitting code (`core_sync::coordinator`, ...)
    pub target: String,
    pub message: String,
    /// Structured fields (`record_id`, `path`, ...), already redacted
    pub fields: BTreeMap<String, String>,
    /// Name of the innermost active span, e.g. `sync` or `convert_record`
    pub span: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: BTreeMap::new(),
            span: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Receives log events mirrored from the engine.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::logging::{LogEntry, LoggerSink};
///
/// struct Annotations;
///
/// #[async_trait]
/// impl LoggerSink for Annotations {
///     async fn log(&self, entry: LogEntry) -> Result<()> {
///         println!("::{}::{}", entry.level.as_str(), entry.message);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait LoggerSink: Send + Sync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Events below this level are never forwarded.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert_eq!(LogLevel::Warn.as_str(), "warn");
    }

    #[test]
    fn test_entry_fields_are_sorted() {
        let entry = LogEntry::new(LogLevel::Warn, "core_sync", "Upload failed")
            .with_field("url", "https://host/a.png")
            .with_field("record_id", "p1");

        let keys: Vec<&str> = entry.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["record_id", "url"]);
        assert!(entry.span.is_none());
    }
}
