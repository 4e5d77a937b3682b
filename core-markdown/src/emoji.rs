//! Emoji normalization
//!
//! Emoji icons are replaced by Twemoji images so they render identically
//! across themes and platforms.

/// Twemoji asset base (72x72 PNG set)
pub const TWEMOJI_BASE_URL: &str = "https://cdn.jsdelivr.net/gh/twitter/twemoji@14.0.2/assets/72x72/";

const ZERO_WIDTH_JOINER: char = '\u{200D}';
const VARIATION_SELECTOR_16: char = '\u{FE0F}';

/// Twemoji file stem for an emoji: lowercase hex code points joined by `-`.
///
/// The VS16 selector is dropped unless the sequence contains a zero-width
/// joiner, matching Twemoji's asset naming.
pub fn twemoji_codepoints(emoji: &str) -> String {
    let keep_selector = emoji.contains(ZERO_WIDTH_JOINER);

    emoji
        .chars()
        .filter(|c| keep_selector || *c != VARIATION_SELECTOR_16)
        .map(|c| format!("{:x}", c as u32))
        .collect::<Vec<_>>()
        .join("-")
}

/// Render an emoji as a Twemoji `<img>` tag.
pub fn twemoji_img(emoji: &str) -> String {
    let emoji = emoji.trim();
    if emoji.is_empty() {
        return String::new();
    }

    format!(
        r#"<img class="emoji" draggable="false" alt="{}" src="{}{}.png"/>"#,
        emoji,
        TWEMOJI_BASE_URL,
        twemoji_codepoints(emoji)
    )
}
