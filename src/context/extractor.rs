//! HTML plain-text extraction
//!
//! Strips markup from fetched pages into flat whitespace-joined text.

use scraper::{Html, Node};

/// Extract plain text from an HTML document
///
/// Collects every text node except those inside `script`, `style` and
/// `noscript` elements, then normalizes whitespace so the result is a single
/// space-joined line of text.
pub fn extract_plain_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        if let Node::Text(text) = node.value() {
            let skipped = node
                .parent()
                .and_then(|p| p.value().as_element())
                .map(|el| matches!(el.name(), "script" | "style" | "noscript"))
                .unwrap_or(false);
            if skipped {
                continue;
            }
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
    }

    clean_text(&parts.join(" "))
}

/// Normalize whitespace: collapse runs into single spaces
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate text to a character budget without splitting a UTF-8 character
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
