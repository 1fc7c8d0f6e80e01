//! Owned DOM node structure for chat-message markup.
//!
//! This is the form callers build (or get from [`parse_html`](crate::parse_html))
//! before handing a tree to the [`Parser`](crate::Parser). Any HTML parser can
//! convert its output to this structure. The parser lowers it into a
//! [`Document`](crate::Document) arena before conversion.

use indexmap::IndexMap;

/// Node types understood by the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Element node
    Element,
    /// Text node
    Text,
}

/// A DOM node: an element with attributes and children, or a run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node type
    pub node_type: NodeType,

    /// Lowercase tag name for elements, `#text` for text nodes
    pub node_name: String,

    /// Text content for text nodes
    pub node_value: Option<String>,

    /// Attributes in source order, keys lowercased and unique
    pub attributes: IndexMap<String, String>,

    /// Child nodes
    pub children: Vec<Node>,
}

impl Node {
    /// Create a new element node
    pub fn element(tag_name: &str) -> Self {
        Self {
            node_type: NodeType::Element,
            node_name: tag_name.to_lowercase(),
            node_value: None,
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Create a new element node with attributes
    pub fn element_with_attrs(tag_name: &str, attrs: Vec<(&str, &str)>) -> Self {
        let mut node = Self::element(tag_name);
        for (name, value) in attrs {
            node.set_attr(name, value);
        }
        node
    }

    /// Create a new text node
    pub fn text(content: &str) -> Self {
        Self {
            node_type: NodeType::Text,
            node_name: "#text".to_string(),
            node_value: Some(content.to_string()),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Check if this is an element node
    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    /// Check if this is a text node
    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    /// Get the tag name (lowercase)
    pub fn tag_name(&self) -> &str {
        &self.node_name
    }

    /// Get an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Set an attribute, replacing any existing value
    pub fn set_attr(&mut self, name: &str, value: &str) {
        self.attributes
            .insert(name.to_lowercase(), value.to_string());
    }

    /// Add a child node
    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Builder form of [`Node::add_child`]
    pub fn with_child(mut self, child: Node) -> Self {
        self.add_child(child);
        self
    }

    /// Append a text child
    pub fn with_text(self, content: &str) -> Self {
        self.with_child(Node::text(content))
    }

    /// Get all text content from this node and descendants
    pub fn text_content(&self) -> String {
        match self.node_type {
            NodeType::Text => self.node_value.clone().unwrap_or_default(),
            NodeType::Element => self
                .children
                .iter()
                .map(Node::text_content)
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

// Deep trees from untrusted markup would overflow the stack with the
// default recursive drop.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}
