//! Remote Content Store Abstractions
//!
//! Data model for records living in the remote structured content store and
//! the trait the engine uses to query and selectively update them.
//!
//! The shapes mirror the Notion API wire format (`page` objects with typed
//! `properties`), so provider crates can deserialize responses straight into
//! these types and the engine never sees raw JSON.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

/// One run of formatted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichText {
    /// Run kind (`text`, `mention`, `equation`)
    #[serde(rename = "type", default = "RichText::default_kind")]
    pub kind: String,

    /// Text payload, present for `text` runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,

    /// Equation payload, present for `equation` runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equation: Option<EquationContent>,

    #[serde(default)]
    pub annotations: Annotations,

    #[serde(default)]
    pub plain_text: String,

    #[serde(default)]
    pub href: Option<String>,
}

impl RichText {
    fn default_kind() -> String {
        "text".to_string()
    }

    /// Build a plain, unannotated text run.
    pub fn plain(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            kind: Self::default_kind(),
            text: Some(TextContent {
                content: content.clone(),
                link: None,
            }),
            equation: None,
            annotations: Annotations::default(),
            plain_text: content,
            href: None,
        }
    }

    /// Concatenate the plain text of a run list, preserving order.
    pub fn concat(runs: &[RichText]) -> String {
        runs.iter().map(|r| r.plain_text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
    #[serde(default)]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationContent {
    pub expression: String,
}

/// Inline formatting flags of a rich text run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub code: bool,
    #[serde(default = "Annotations::default_color")]
    pub color: String,
}

impl Annotations {
    fn default_color() -> String {
        "default".to_string()
    }
}

/// A select / multi-select / status option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SelectOption {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateValue {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<String>,
}

/// An attached file: either hosted by the store or an external link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileObject {
    File {
        file: FileUrl,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    External {
        external: FileUrl,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl FileObject {
    pub fn url(&self) -> &str {
        match self {
            FileObject::File { file, .. } => &file.url,
            FileObject::External { external, .. } => &external.url,
        }
    }

    pub fn external(url: impl Into<String>) -> Self {
        FileObject::External {
            external: FileUrl {
                url: url.into(),
                expiry_time: None,
            },
            name: None,
        }
    }
}

/// Typed value of one record property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        title: Vec<RichText>,
    },
    RichText {
        rich_text: Vec<RichText>,
    },
    Select {
        select: Option<SelectOption>,
    },
    Status {
        status: Option<SelectOption>,
    },
    MultiSelect {
        multi_select: Vec<SelectOption>,
    },
    Date {
        date: Option<DateValue>,
    },
    Files {
        files: Vec<FileObject>,
    },
    CreatedTime {
        created_time: String,
    },
    LastEditedTime {
        last_edited_time: String,
    },
    /// Any property type the engine does not project (number, checkbox, formula, ...)
    #[serde(other)]
    Unsupported,
}

impl PropertyValue {
    pub fn rich_text(content: impl Into<String>) -> Self {
        PropertyValue::RichText {
            rich_text: vec![RichText::plain(content)],
        }
    }

    pub fn select(name: impl Into<String>) -> Self {
        PropertyValue::Select {
            select: Some(SelectOption::named(name)),
        }
    }

    /// Option name of a `select` or `status` property.
    pub fn option_name(&self) -> Option<&str> {
        match self {
            PropertyValue::Select { select: Some(o) } | PropertyValue::Status { status: Some(o) } => {
                Some(o.name.as_str())
            }
            _ => None,
        }
    }
}

/// One record of the remote structured content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Stable, globally unique identifier
    pub id: String,

    /// RFC 3339 creation timestamp
    pub created_time: String,

    /// RFC 3339 last-edit timestamp
    pub last_edited_time: String,

    /// Optional cover asset
    #[serde(default)]
    pub cover: Option<FileObject>,

    /// Declared properties, keyed by property name
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,

    /// Whether the record has been moved to the store's trash
    #[serde(default)]
    pub archived: bool,
}

impl RemoteRecord {
    pub fn new(
        id: impl Into<String>,
        created_time: impl Into<String>,
        last_edited_time: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            created_time: created_time.into(),
            last_edited_time: last_edited_time.into(),
            cover: None,
            properties: BTreeMap::new(),
            archived: false,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_cover(mut self, cover: FileObject) -> Self {
        self.cover = Some(cover);
        self
    }

    pub fn declares(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }
}

/// Filter applied to a record query.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordFilter {
    /// `select` property equals the given option name
    SelectEquals { property: String, value: String },
    /// Any of the nested filters matches
    Or(Vec<RecordFilter>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Sort criterion: a record timestamp and a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSort {
    LastEditedTime(SortDirection),
    CreatedTime(SortDirection),
}

/// Query against one database of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub database_id: String,
    pub filter: Option<RecordFilter>,
    pub sorts: Vec<RecordSort>,
}

impl RecordQuery {
    pub fn new(database_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            filter: None,
            sorts: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: RecordFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, sort: RecordSort) -> Self {
        self.sorts.push(sort);
        self
    }
}

/// Subset of properties sent in one update call.
pub type PropertyPatch = BTreeMap<String, PropertyValue>;

/// Remote content store trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::remote::{RecordQuery, RemoteStore};
///
/// async fn count(store: &dyn RemoteStore, db: &str) -> Result<usize> {
///     Ok(store.query(&RecordQuery::new(db)).await?.len())
/// }
/// ```
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Return every record matching the query, in the requested order.
    ///
    /// Implementations must follow pagination to the end.
    async fn query(&self, query: &RecordQuery) -> Result<Vec<RemoteRecord>>;

    /// Overwrite the given properties of one record; other properties are untouched.
    async fn update(&self, record_id: &str, properties: &PropertyPatch) -> Result<()>;
}
