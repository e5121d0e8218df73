//! Width-aware text helpers for terminal previews.

use unicode_width::UnicodeWidthChar;

/// Display width of `text` in terminal columns.
pub fn display_width(text: &str) -> usize {
    text.chars().map(|c| c.width().unwrap_or(0)).sum()
}

/// Keep the longest prefix of `text` that fits in `max_width` columns and
/// append `...` when anything was cut.
///
/// Wide characters are never split, so the prefix may come out one column short.
///
/// ```
/// use review_agent::utils::cut_to_width;
///
/// assert_eq!(cut_to_width("Hello World", 5), "Hello...");
/// assert_eq!(cut_to_width("Hi", 5), "Hi");
/// ```
pub fn cut_to_width(text: &str, max_width: usize) -> String {
    if display_width(text) <= max_width {
        return text.to_string();
    }

    let mut width = 0;
    let mut end = 0;
    for (idx, c) in text.char_indices() {
        let w = c.width().unwrap_or(0);
        if width + w > max_width {
            break;
        }
        width += w;
        end = idx + c.len_utf8();
    }

    format!("{}...", text[..end].trim_end())
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
