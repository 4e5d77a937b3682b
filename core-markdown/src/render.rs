//! Default block renderers
//!
//! Used for every kind without a registered transformer. Unknown kinds
//! render nothing.

use bridge_traits::blocks::Block;
use serde_json::Value;

use crate::rich_text::{plain_text, render_rich_text, rich_text_field};
use crate::transform::RenderContext;

pub(crate) fn is_list_item(kind: &str) -> bool {
    matches!(kind, "bulleted_list_item" | "numbered_list_item" | "to_do")
}

pub(crate) fn render_default(block: &Block, ctx: &RenderContext<'_>) -> Option<String> {
    let data = &block.data;

    match block.kind.as_str() {
        "paragraph" => {
            let text = inline(data);
            if block.children.is_empty() {
                return (!text.is_empty()).then_some(text);
            }
            Some(join_nonempty(&[text, ctx.render_children_indented(block)], "\n\n"))
        }
        "heading_1" => heading(block, ctx, "#"),
        "heading_2" => heading(block, ctx, "##"),
        "heading_3" => heading(block, ctx, "###"),
        "bulleted_list_item" => Some(list_item(block, ctx, "-".to_string())),
        // Reached only when rendered outside a sibling run
        "numbered_list_item" => numbered_list_item(block, ctx, 1),
        "to_do" => {
            let checked = data.get("checked").and_then(Value::as_bool).unwrap_or(false);
            let marker = if checked { "- [x]" } else { "- [ ]" };
            Some(list_item(block, ctx, marker.to_string()))
        }
        "toggle" => {
            let summary = inline(data);
            let body = ctx.render_blocks(&block.children);
            Some(format!(
                "<details>\n<summary>{}</summary>\n\n{}\n\n</details>",
                summary, body
            ))
        }
        "quote" => {
            let body = join_nonempty(&[inline(data), ctx.render_blocks(&block.children)], "\n\n");
            Some(
                body.lines()
                    .map(|line| {
                        if line.is_empty() {
                            ">".to_string()
                        } else {
                            format!("> {}", line)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        }
        "code" => {
            let language = match data.get("language").and_then(Value::as_str) {
                Some("plain text") | None => "text",
                Some(language) => language,
            };
            let code = plain_text(&rich_text_field(data, "rich_text"));
            Some(format!("```{}\n{}\n```", language, code))
        }
        "divider" => Some("---".to_string()),
        "equation" => data
            .get("expression")
            .and_then(Value::as_str)
            .map(|expression| format!("$$\n{}\n$$", expression)),
        "table" => table(block),
        "column_list" => {
            let columns: Vec<String> = block
                .children
                .iter()
                .map(|column| ctx.render_blocks(&column.children))
                .collect();
            Some(join_nonempty(&columns, "\n\n")).filter(|s| !s.is_empty())
        }
        "column" | "synced_block" if !block.children.is_empty() => {
            Some(ctx.render_blocks(&block.children))
        }
        _ => None,
    }
}

pub(crate) fn numbered_list_item(
    block: &Block,
    ctx: &RenderContext<'_>,
    ordinal: usize,
) -> Option<String> {
    Some(list_item(block, ctx, format!("{}.", ordinal)))
}

fn inline(data: &Value) -> String {
    render_rich_text(&rich_text_field(data, "rich_text"))
}

fn heading(block: &Block, ctx: &RenderContext<'_>, marker: &str) -> Option<String> {
    let title = format!("{} {}", marker, inline(&block.data));
    if block.children.is_empty() {
        return Some(title);
    }
    Some(join_nonempty(&[title, ctx.render_blocks(&block.children)], "\n\n"))
}

fn list_item(block: &Block, ctx: &RenderContext<'_>, marker: String) -> String {
    let line = format!("{} {}", marker, inline(&block.data));
    if block.children.is_empty() {
        return line;
    }
    join_nonempty(&[line, ctx.render_children_indented(block)], "\n")
}

fn table(block: &Block) -> Option<String> {
    let rows: Vec<Vec<String>> = block
        .children
        .iter()
        .filter(|row| row.kind == "table_row")
        .map(|row| {
            row.data
                .get("cells")
                .and_then(Value::as_array)
                .map(|cells| {
                    cells
                        .iter()
                        .map(|cell| {
                            let runs: Vec<bridge_traits::RichText> =
                                serde_json::from_value(cell.clone()).unwrap_or_default();
                            render_rich_text(&runs).replace('|', "\\|")
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect();

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return None;
    }

    let format_row = |cells: &[String]| {
        let mut padded: Vec<&str> = cells.iter().map(String::as_str).collect();
        padded.resize(width, "");
        format!("| {} |", padded.join(" | "))
    };

    let mut lines = vec![format_row(rows[0].as_slice())];
    lines.push(format!("|{}", " --- |".repeat(width)));
    lines.extend(rows[1..].iter().map(|row| format_row(row.as_slice())));
    Some(lines.join("\n"))
}

fn join_nonempty(parts: &[String], separator: &str) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(separator)
}
