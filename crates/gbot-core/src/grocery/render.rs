use crate::{formatting::escape_html, grocery::store::GroceryItem};

pub const LIST_HEADER_HTML: &str = "📝 <b>Grocery List:</b>";
pub const EMPTY_LIST_HTML: &str = "📝 <b>Grocery List:</b>\n<i>The grocery list is empty.</i>";

/// Render a list snapshot as Telegram HTML.
///
/// Items are numbered by their 1-based position in the snapshot.
pub fn format_list(items: &[GroceryItem]) -> String {
    if items.is_empty() {
        return EMPTY_LIST_HTML.to_string();
    }

    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(LIST_HEADER_HTML.to_string());
    for (idx, item) in items.iter().enumerate() {
        lines.push(format!(
            "{}. {} {}",
            idx + 1,
            bought_glyph(item.bought),
            escape_html(&item.name)
        ));
    }
    lines.join("\n")
}

pub(crate) fn bought_glyph(bought: bool) -> &'static str {
    if bought {
        "✅"
    } else {
        "❌"
    }
}
