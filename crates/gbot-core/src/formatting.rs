//! Formatting utilities for Telegram HTML parse mode.

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Wrap user-provided text in `<code>` after escaping it.
pub fn code(text: &str) -> String {
    format!("<code>{}</code>", escape_html(text))
}

/// Truncate to `max_chars` characters, appending `...` when cut.
pub fn truncate_text(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    format!("{}...", s.chars().take(max_chars).collect::<String>())
}

const CUT_MARKER: &str = "\n…";

/// Keep whole lines of `html` while it fits in `max_len` bytes, marking the cut.
///
/// Cutting between lines never splits a tag as long as tags do not span lines.
pub fn fit_lines(html: &str, max_len: usize) -> String {
    if html.len() <= max_len {
        return html.to_string();
    }

    let budget = max_len.saturating_sub(CUT_MARKER.len());
    let mut out = String::new();
    for line in html.split('\n') {
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.len() + extra + line.len() > budget {
            break;
        }
        if extra == 1 {
            out.push('\n');
        }
        out.push_str(line);
    }
    out.push_str(CUT_MARKER);
    out
}
