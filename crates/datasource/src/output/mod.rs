//! Output tree: nodes, entry rendering and grouped rendering.

mod builder;
mod node;

pub use builder::EntryRenderer;
pub use node::Node;

use crate::model::Section;

/// Escape text for inclusion in markup.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Section metadata node.
pub fn section_node(section: &Section) -> Node {
    Node::new("section")
        .with_value(section.name.as_str())
        .with_attribute("id", section.id)
        .with_attribute("handle", &section.handle)
}

/// Error node of the empty result.
pub fn no_records_node() -> Node {
    Node::new("error").with_value("No records found.")
}

/// Error node shown when a required parameter is missing.
pub fn required_param_node(required_param: Option<&str>) -> Node {
    Node::new("error")
        .with_value("Data source not executed, required parameter is missing.")
        .with_attribute("required-param", required_param.unwrap_or_default())
}

/// Error node shown when a forbidden parameter is present.
pub fn forbidden_param_node(negate_param: Option<&str>) -> Node {
    Node::new("error")
        .with_value("Data source not executed, forbidden parameter was found.")
        .with_attribute("forbidden-param", negate_param.unwrap_or_default())
}

/// Pagination summary node.
pub fn pagination_node(
    total_entries: i64,
    total_pages: i64,
    entries_per_page: i64,
    current_page: i64,
) -> Node {
    Node::new("pagination")
        .with_attribute("total-entries", total_entries)
        .with_attribute("total-pages", total_pages)
        .with_attribute("entries-per-page", entries_per_page)
        .with_attribute("current-page", current_page)
}
