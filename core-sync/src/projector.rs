//! # Record Projector
//!
//! Flattens a [`RemoteRecord`] into the sparse metadata mapping that ends up
//! in an artifact header.
//!
//! - multi-select → list of option names
//! - select / status → option name
//! - date, created-time, last-edited-time → `YYYY-MM-DD HH:MM:SS` in the
//!   configured timezone (raw text when unparseable)
//! - title / rich-text → concatenated plain text
//! - files → URL of the first file
//!
//! Empty values are omitted. `cover` is added when the record has one, and
//! `id`, `created_time` and `last_edited_time` always come from the record
//! itself, unformatted.

use bridge_traits::remote::{PropertyValue, RemoteRecord, RichText};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde_json::{Map, Value};

/// Flat, sparse property mapping of one record.
pub type ProjectedProperties = Map<String, Value>;

/// Header timestamp format
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const ID_KEY: &str = "id";
pub const TITLE_KEY: &str = "title";
pub const FILENAME_KEY: &str = "filename";
pub const TYPE_KEY: &str = "type";
pub const COVER_KEY: &str = "cover";
pub const CREATED_TIME_KEY: &str = "created_time";
pub const LAST_EDITED_TIME_KEY: &str = "last_edited_time";

/// Artifact kind, read from the `type` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Standalone page, written to `<page-root>/<name>/index.md`
    Page,
    /// Blog post, written to `<post-root>/<name>.md`
    Post,
}

impl RecordKind {
    /// Kind of a projected record; anything but `page` is a post.
    pub fn of(properties: &ProjectedProperties) -> Self {
        match properties.get(TYPE_KEY).and_then(Value::as_str) {
            Some("page") => RecordKind::Page,
            _ => RecordKind::Post,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecordProjector {
    timezone: Tz,
}

impl RecordProjector {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Project one record. Pure: same record and timezone, same output.
    pub fn project(&self, record: &RemoteRecord) -> ProjectedProperties {
        let mut properties = ProjectedProperties::new();

        for (name, value) in &record.properties {
            if let Some(value) = self.property_value(value) {
                properties.insert(name.clone(), value);
            }
        }

        if let Some(cover) = &record.cover {
            if !cover.url().is_empty() {
                properties.insert(COVER_KEY.to_string(), Value::String(cover.url().to_string()));
            }
        }

        properties.insert(ID_KEY.to_string(), Value::String(record.id.clone()));
        properties.insert(
            CREATED_TIME_KEY.to_string(),
            Value::String(record.created_time.clone()),
        );
        properties.insert(
            LAST_EDITED_TIME_KEY.to_string(),
            Value::String(record.last_edited_time.clone()),
        );

        properties
    }

    /// Scalar or list value of one property, `None` when empty or unsupported.
    pub fn property_value(&self, value: &PropertyValue) -> Option<Value> {
        let projected = match value {
            PropertyValue::MultiSelect { multi_select } => Value::Array(
                multi_select
                    .iter()
                    .map(|option| Value::String(option.name.clone()))
                    .collect(),
            ),
            PropertyValue::Select { .. } | PropertyValue::Status { .. } => {
                Value::String(value.option_name()?.to_string())
            }
            PropertyValue::Date { date } => Value::String(self.format_timestamp(&date.as_ref()?.start)),
            PropertyValue::Title { title: runs } | PropertyValue::RichText { rich_text: runs } => {
                Value::String(RichText::concat(runs))
            }
            PropertyValue::Files { files } => Value::String(files.first()?.url().to_string()),
            PropertyValue::CreatedTime { created_time: raw }
            | PropertyValue::LastEditedTime {
                last_edited_time: raw,
            } => Value::String(self.format_timestamp(raw)),
            PropertyValue::Unsupported => return None,
        };

        (!is_empty_value(&projected)).then_some(projected)
    }

    /// Reformat a timestamp in the configured timezone; unparseable input is
    /// returned unchanged.
    pub fn format_timestamp(&self, raw: &str) -> String {
        match parse_timestamp(raw, self.timezone) {
            Some(instant) => instant
                .with_timezone(&self.timezone)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
            None => raw.to_string(),
        }
    }
}

/// Parse an RFC 3339 timestamp, a naive date-time or a bare date.
///
/// Values without an offset are read in `timezone`; bare dates are midnight.
pub fn parse_timestamp(raw: &str, timezone: Tz) -> Option<DateTime<Tz>> {
    let raw = raw.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&timezone));
    }

    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    timezone.from_local_datetime(&naive).earliest()
}

/// Empty strings, empty lists and nulls are dropped from projections.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
