//! Notion API wire types
//!
//! Request and response shapes for the endpoints the connector calls.
//! Records deserialize straight into [`RemoteRecord`]; blocks keep their
//! kind-specific payload as raw JSON.

use bridge_traits::blocks::Block;
use bridge_traits::remote::{PropertyPatch, RecordFilter, RecordSort, SortDirection};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One page of a paginated list endpoint.
///
/// See: https://developers.notion.com/reference/intro#pagination
#[derive(Debug, Deserialize)]
pub struct PaginatedList<T> {
    pub results: Vec<T>,

    #[serde(default)]
    pub has_more: bool,

    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Body of `POST /databases/{id}/query`.
#[derive(Debug, Serialize)]
pub struct DatabaseQueryBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sorts: Vec<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,

    pub page_size: u32,
}

/// Body of `PATCH /pages/{id}`.
#[derive(Debug, Serialize)]
pub struct PageUpdateBody<'a> {
    pub properties: &'a PropertyPatch,
}

/// Block object as returned by `GET /blocks/{id}/children`.
#[derive(Debug, Deserialize)]
pub struct RawBlock {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub has_children: bool,

    /// Remaining fields, including the payload keyed by `kind`
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl From<RawBlock> for Block {
    fn from(mut raw: RawBlock) -> Self {
        let data = raw.fields.remove(&raw.kind).unwrap_or(Value::Null);
        let mut block = Block::new(raw.id, raw.kind, data);
        block.has_children = raw.has_children;
        block
    }
}

/// Error object returned with non-2xx responses.
///
/// See: https://developers.notion.com/reference/status-codes
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub message: String,
}

/// Filter object for a database query.
pub fn filter_json(filter: &RecordFilter) -> Value {
    match filter {
        RecordFilter::SelectEquals { property, value } => json!({
            "property": property,
            "select": { "equals": value }
        }),
        RecordFilter::Or(filters) => json!({
            "or": filters.iter().map(filter_json).collect::<Vec<_>>()
        }),
    }
}

/// Sort object for a database query.
pub fn sort_json(sort: &RecordSort) -> Value {
    let (timestamp, direction) = match sort {
        RecordSort::LastEditedTime(direction) => ("last_edited_time", direction),
        RecordSort::CreatedTime(direction) => ("created_time", direction),
    };
    let direction = match direction {
        SortDirection::Ascending => "ascending",
        SortDirection::Descending => "descending",
    };
    json!({ "timestamp": timestamp, "direction": direction })
}
