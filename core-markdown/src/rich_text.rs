//! Inline text rendering
//!
//! Turns a list of rich text runs into inline markdown, applying the run's
//! annotations and links.

use bridge_traits::remote::RichText;
use serde_json::Value;

/// Decode the rich text array stored under `key` in a block payload.
///
/// Missing or malformed arrays decode as empty.
pub fn rich_text_field(data: &Value, key: &str) -> Vec<RichText> {
    data.get(key)
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

/// Render runs as annotated inline markdown.
pub fn render_rich_text(runs: &[RichText]) -> String {
    runs.iter().map(render_run).collect()
}

/// Concatenate the unformatted text of the runs.
pub fn plain_text(runs: &[RichText]) -> String {
    RichText::concat(runs)
}

fn render_run(run: &RichText) -> String {
    if run.kind == "equation" {
        if let Some(equation) = &run.equation {
            return format!("${}$", equation.expression);
        }
    }

    let text = run.plain_text.as_str();
    if text.trim().is_empty() {
        return text.to_string();
    }

    // Markers must hug the text, so surrounding whitespace stays outside them
    let leading = &text[..text.len() - text.trim_start().len()];
    let trailing = &text[text.trim_end().len()..];
    let mut inner = text.trim().to_string();

    let annotations = &run.annotations;
    if annotations.code {
        inner = format!("`{}`", inner);
    }
    if annotations.bold {
        inner = format!("**{}**", inner);
    }
    if annotations.italic {
        inner = format!("_{}_", inner);
    }
    if annotations.strikethrough {
        inner = format!("~~{}~~", inner);
    }
    if annotations.underline {
        inner = format!("<u>{}</u>", inner);
    }

    if let Some(href) = run.href.as_deref().filter(|h| !h.is_empty()) {
        inner = format!("[{}]({})", inner, href);
    }

    format!("{}{}{}", leading, inner, trailing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(value: Value) -> RichText {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plain_runs_concatenate_in_order() {
        let runs = vec![RichText::plain("Hello, "), RichText::plain("world")];
        assert_eq!(render_rich_text(&runs), "Hello, world");
        assert_eq!(plain_text(&runs), "Hello, world");
    }

    #[test]
    fn test_annotations_wrap_trimmed_text() {
        let bold = run(json!({
            "type": "text",
            "text": { "content": " strong " },
            "annotations": { "bold": true },
            "plain_text": " strong "
        }));
        assert_eq!(render_rich_text(&[bold]), " **strong** ");

        let code_link = run(json!({
            "type": "text",
            "text": { "content": "cargo", "link": { "url": "https://doc.rust-lang.org/cargo" } },
            "annotations": { "code": true },
            "plain_text": "cargo",
            "href": "https://doc.rust-lang.org/cargo"
        }));
        assert_eq!(
            render_rich_text(&[code_link]),
            "[`cargo`](https://doc.rust-lang.org/cargo)"
        );
    }

    #[test]
    fn test_equation_run() {
        let eq = run(json!({
            "type": "equation",
            "equation": { "expression": "e^{i\\pi}" },
            "plain_text": "e^{i\\pi}"
        }));
        assert_eq!(render_rich_text(&[eq]), "$e^{i\\pi}$");
    }

    #[test]
    fn test_rich_text_field_tolerates_garbage() {
        assert!(rich_text_field(&json!({ "rich_text": 3 }), "rich_text").is_empty());
        assert!(rich_text_field(&json!({}), "rich_text").is_empty());
    }
}
