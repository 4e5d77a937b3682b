//! CI annotation output.
//!
//! Mirrors warnings and errors as workflow-command lines
//! (`::warning title=...::message`) so a CI run surfaces skipped records and
//! failed uploads next to the job summary.

use std::io::{Stdout, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::logging::{LogEntry, LogLevel, LoggerSink};

pub struct CiAnnotationSink<W> {
    out: Mutex<W>,
}

impl CiAnnotationSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> CiAnnotationSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One annotation line for `entry`; `None` below warn.
pub fn annotation_line(entry: &LogEntry) -> Option<String> {
    let command = match entry.level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warning",
        _ => return None,
    };

    let mut message = entry.message.clone();
    for (key, value) in &entry.fields {
        message.push_str(&format!(" {}={}", key, value));
    }

    Some(format!(
        "::{} title={}::{}",
        command,
        escape(&entry.target),
        escape(&message)
    ))
}

// Workflow commands are line based; `%`, CR and LF must be percent-encoded.
fn escape(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[async_trait]
impl<W: Write + Send> LoggerSink for CiAnnotationSink<W> {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        let Some(line) = annotation_line(&entry) else {
            return Ok(());
        };
        let mut out = self
            .out
            .lock()
            .map_err(|_| BridgeError::OperationFailed("annotation output poisoned".into()))?;
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Warn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_is_not_annotated() {
        let entry = LogEntry::new(LogLevel::Info, "core_sync::coordinator", "Pass finished");
        assert_eq!(annotation_line(&entry), None);
    }

    #[test]
    fn test_fields_are_appended_and_newlines_escaped() {
        let entry = LogEntry::new(LogLevel::Error, "core_sync::coordinator", "Conversion failed\nretry later")
            .with_field("record_id", "rec-1");

        assert_eq!(
            annotation_line(&entry).unwrap(),
            "::error title=core_sync::coordinator::Conversion failed%0Aretry later record_id=rec-1"
        );
    }

    #[tokio::test]
    async fn test_sink_writes_one_line_per_warning() {
        let sink = CiAnnotationSink::new(Vec::new());

        sink.log(LogEntry::new(LogLevel::Warn, "core_sync::assets", "Upload failed 100%"))
            .await
            .unwrap();
        sink.log(LogEntry::new(LogLevel::Debug, "core_sync::assets", "Skipped"))
            .await
            .unwrap();

        assert_eq!(sink.min_level(), LogLevel::Warn);
        let written = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(written, "::warning title=core_sync::assets::Upload failed 100%25\n");
    }
}
