//! Generic output tree node.

use std::fmt::Write;

use serde::Serialize;

use super::html_escape;

/// An element with ordered attributes, an optional text value and children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl ToString) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Set an attribute, replacing an existing one in place.
    pub fn set_attribute(&mut self, name: &str, value: impl ToString) {
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn append_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn prepend_child(&mut self, child: Node) {
        self.children.insert(0, child);
    }

    /// Direct children named `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First direct child named `name`.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Render as XML text.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.name);
        for (name, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", name, html_escape(value));
        }
        if self.value.is_none() && self.children.is_empty() {
            out.push_str(" />");
            return;
        }
        out.push('>');
        if let Some(value) = &self.value {
            out.push_str(&html_escape(value));
        }
        for child in &self.children {
            child.write_xml(out);
        }
        let _ = write!(out, "</{}>", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_xml() {
        let mut root = Node::new("articles");
        root.append_child(Node::new("entry").with_attribute("id", 3));
        root.prepend_child(
            Node::new("section")
                .with_attribute("id", 1)
                .with_value("News & Views"),
        );

        assert_eq!(
            root.to_xml(),
            r#"<articles><section id="1">News &amp; Views</section><entry id="3" /></articles>"#
        );
    }

    #[test]
    fn set_attribute_replaces() {
        let mut node = Node::new("entry");
        node.set_attribute("comments", 1);
        node.set_attribute("comments", 2);
        assert_eq!(node.attributes.len(), 1);
        assert_eq!(node.attribute("comments"), Some("2"));
    }
}
