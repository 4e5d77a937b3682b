//! Publishing transformers
//!
//! Overrides for block kinds whose default markdown rendering loses
//! information on a static blog: callouts, link cards and embedded media.
//! Each returns `None` when the payload lacks what it needs, which hands the
//! block back to the default renderer.

use bridge_traits::blocks::Block;
use serde_json::Value;

use crate::emoji::twemoji_img;
use crate::rich_text::{plain_text, rich_text_field};
use crate::transform::RenderContext;

/// `<aside>` with the icon in front of the text, children joined by blank lines.
pub fn callout(block: &Block, ctx: &RenderContext<'_>) -> Option<String> {
    let data = &block.data;

    // Older API versions carry the text under `text`
    let runs = match rich_text_field(data, "rich_text") {
        runs if runs.is_empty() => rich_text_field(data, "text"),
        runs => runs,
    };
    let mut body = plain_text(&runs);

    if !block.children.is_empty() {
        body.push('\n');
        body.push_str(&ctx.render_each(&block.children).join("\n\n"));
        body = body.trim().to_string();
    }

    let icon = data.get("icon").map(icon_markup).unwrap_or_default();
    Some(format!("<aside>\n{}{}\n</aside>", icon, body).trim().to_string())
}

fn icon_markup(icon: &Value) -> String {
    match icon.get("type").and_then(Value::as_str) {
        Some("emoji") => icon
            .get("emoji")
            .and_then(Value::as_str)
            .map(twemoji_img)
            .unwrap_or_default(),
        Some("external") => icon
            .get("external")
            .and_then(|e| e.get("url"))
            .and_then(Value::as_str)
            .map(|url| format!("<img src=\"{}\" width=\"25px\" />\n", url))
            .unwrap_or_default(),
        _ => String::new(),
    }
}

pub fn bookmark(block: &Block, _ctx: &RenderContext<'_>) -> Option<String> {
    let url = block.data.get("url").and_then(Value::as_str)?;
    let caption = caption(&block.data);
    let text = if caption.is_empty() { url } else { caption.as_str() };
    Some(format!("[{}]({})", text, url))
}

pub fn link_preview(block: &Block, _ctx: &RenderContext<'_>) -> Option<String> {
    let url = block.data.get("url").and_then(Value::as_str)?;
    Some(format!("[{}]({})", url, url))
}

pub fn embed(block: &Block, _ctx: &RenderContext<'_>) -> Option<String> {
    let url = block.data.get("url").and_then(Value::as_str)?;
    Some(format!(
        "<iframe src=\"{}\" width=\"100%\" height=\"500\" frameborder=\"0\" allowfullscreen></iframe>",
        url
    ))
}

pub fn video(block: &Block, _ctx: &RenderContext<'_>) -> Option<String> {
    let url = media_url(&block.data)?;

    if let Some(id) = youtube_id(url) {
        return Some(format!(
            "<iframe src=\"https://www.youtube.com/embed/{}\" width=\"100%\" height=\"500\" \
             frameborder=\"0\" allowfullscreen></iframe>",
            id
        ));
    }

    Some(format!(
        "<video controls width=\"100%\" src=\"{}\"></video>",
        url
    ))
}

pub fn pdf(block: &Block, _ctx: &RenderContext<'_>) -> Option<String> {
    let url = media_url(&block.data)?;
    Some(format!(
        "<embed src=\"{}\" type=\"application/pdf\" width=\"100%\" height=\"600px\" />",
        url
    ))
}

pub fn audio(block: &Block, _ctx: &RenderContext<'_>) -> Option<String> {
    let url = media_url(&block.data)?;
    Some(format!("<audio controls src=\"{}\"></audio>", url))
}

/// `![caption](url)`; the asset rewriter later matches this exact shape.
pub fn image(block: &Block, _ctx: &RenderContext<'_>) -> Option<String> {
    let url = media_url(&block.data)?;
    Some(format!("![{}]({})", caption(&block.data), url))
}

/// URL of a file-or-external media payload.
fn media_url(data: &Value) -> Option<&str> {
    let kind = data.get("type").and_then(Value::as_str)?;
    data.get(kind)
        .and_then(|media| media.get("url"))
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
}

fn caption(data: &Value) -> String {
    plain_text(&rich_text_field(data, "caption"))
}

fn youtube_id(url: &str) -> Option<&str> {
    let rest = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.")
        .trim_start_matches("m.");

    let id = if let Some(rest) = rest.strip_prefix("youtu.be/") {
        rest
    } else if let Some(rest) = rest.strip_prefix("youtube.com/embed/") {
        rest
    } else if let Some(query) = rest.strip_prefix("youtube.com/watch?") {
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("v="))?
    } else {
        return None;
    };

    let id = id.split(['?', '&', '#', '/']).next().unwrap_or(id);
    (!id.is_empty()).then_some(id)
}
