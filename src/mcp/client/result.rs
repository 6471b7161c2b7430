//! Text extraction from multi-part tool results
//!
//! A `CallToolResult` carries an ordered list of content items of mixed kinds,
//! or no list at all when the tool only returned structured content. Only text
//! items are interpreted here; every other kind is skipped without a placeholder.

use rmcp::model::CallToolResult;

/// Text payloads of `result`, in order
pub fn text_parts(result: &CallToolResult) -> impl Iterator<Item = &str> {
    result
        .content
        .iter()
        .flatten()
        .filter_map(|content| content.as_text())
        .map(|text| text.text.as_str())
}

/// Concatenated text of every text item, separated by `\n`.
///
/// An absent result, or one with no text items, yields an empty string.
pub fn extract_text(result: Option<&CallToolResult>) -> String {
    result
        .map(|r| text_parts(r).collect::<Vec<_>>().join("\n"))
        .unwrap_or_default()
}

/// Feed each text item to `sink`, in order. No-op if either is absent.
pub fn for_each_text(result: Option<&CallToolResult>, sink: Option<&mut dyn FnMut(&str)>) {
    let (Some(result), Some(sink)) = (result, sink) else {
        return;
    };
    for text in text_parts(result) {
        sink(text);
    }
}
