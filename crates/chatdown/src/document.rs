//! Arena form of the input tree.
//!
//! A [`Document`] is built from a [`Node`] in one preorder pass that assigns
//! every node a stable [`NodeId`]. Parent links are plain ids, so navigating up
//! the tree never creates an ownership edge. [`NodeRef`] is the borrowed view
//! rules and adapters work with.

use indexmap::IndexMap;

use crate::node::{Node, NodeType};
use crate::utilities::{escape_html, is_void};

/// Stable identifier of a node within one [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in document (preorder) order
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
enum NodeData {
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
    },
    Text(String),
}

#[derive(Debug)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    level: usize,
}

/// Immutable arena holding one tree
#[derive(Debug)]
pub struct Document {
    slots: Vec<Slot>,
}

impl Document {
    /// Lower a node tree into an arena. Iterative, so deep trees do not
    /// exhaust the call stack here.
    pub fn from_node(root: &Node) -> Self {
        let mut slots: Vec<Slot> = Vec::new();
        let mut stack: Vec<(&Node, Option<NodeId>, usize)> = vec![(root, None, 0)];

        while let Some((node, parent, level)) = stack.pop() {
            let id = NodeId(slots.len());
            let data = match node.node_type {
                NodeType::Text => NodeData::Text(node.node_value.clone().unwrap_or_default()),
                NodeType::Element => NodeData::Element {
                    tag: node.node_name.to_lowercase(),
                    attrs: node.attributes.clone(),
                },
            };
            slots.push(Slot {
                data,
                parent,
                children: Vec::with_capacity(node.children.len()),
                level,
            });
            if let Some(parent) = parent {
                slots[parent.0].children.push(id);
            }
            for child in node.children.iter().rev() {
                stack.push((child, Some(id), level + 1));
            }
        }

        Self { slots }
    }

    /// The root node
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            doc: self,
            id: NodeId(0),
        }
    }

    /// Look up a node by id
    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.0 < self.slots.len()).then_some(NodeRef { doc: self, id })
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { doc: self, id }
    }
}

/// A borrowed view of one node with navigation in every direction.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.slot().data {
            NodeData::Element { tag, .. } => write!(f, "<{}>#{}", tag, self.id.0),
            NodeData::Text(text) => write!(f, "{:?}#{}", text, self.id.0),
        }
    }
}

impl<'a> NodeRef<'a> {
    fn slot(&self) -> &'a Slot {
        &self.doc.slots[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Distance from the document root
    pub fn level(&self) -> usize {
        self.slot().level
    }

    pub fn is_element(&self) -> bool {
        matches!(self.slot().data, NodeData::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.slot().data, NodeData::Text(_))
    }

    /// Lowercase tag name; empty for text nodes
    pub fn tag_name(&self) -> &'a str {
        match &self.slot().data {
            NodeData::Element { tag, .. } => tag,
            NodeData::Text(_) => "",
        }
    }

    /// Check the tag name, ignoring case
    pub fn is_tag(&self, tag: &str) -> bool {
        self.is_element() && self.tag_name().eq_ignore_ascii_case(tag)
    }

    /// Value of a text node
    pub fn text(&self) -> Option<&'a str> {
        match &self.slot().data {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    /// Get an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        match &self.slot().data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Whitespace-separated tokens of the `class` attribute
    pub fn classes(&self) -> impl Iterator<Item = &'a str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.slot().parent.map(|id| self.doc.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let doc = self.doc;
        self.slot().children.iter().map(move |&id| doc.node(id))
    }

    /// Only element children
    pub fn element_children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.children().filter(|n| n.is_element())
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors {
            next: self.parent(),
        }
    }

    /// Strict descendants in document order
    pub fn descendants(&self) -> Descendants<'a> {
        let mut stack: Vec<NodeId> = self.slot().children.clone();
        stack.reverse();
        Descendants {
            doc: self.doc,
            stack,
        }
    }

    /// First descendant satisfying `pred`, in document order
    pub fn find_descendant<F>(&self, mut pred: F) -> Option<NodeRef<'a>>
    where
        F: FnMut(&NodeRef<'a>) -> bool,
    {
        self.descendants().find(|n| pred(n))
    }

    /// Position among the parent's children
    pub fn index_in_parent(&self) -> Option<usize> {
        let parent = self.parent()?;
        parent.slot().children.iter().position(|&id| id == self.id)
    }

    pub fn next_sibling(&self) -> Option<NodeRef<'a>> {
        let parent = self.parent()?;
        let index = self.index_in_parent()?;
        parent
            .slot()
            .children
            .get(index + 1)
            .map(|&id| self.doc.node(id))
    }

    pub fn previous_sibling(&self) -> Option<NodeRef<'a>> {
        let parent = self.parent()?;
        let index = self.index_in_parent()?;
        let id = parent.slot().children.get(index.checked_sub(1)?)?;
        Some(self.doc.node(*id))
    }

    /// Concatenated text of this node and all descendants
    pub fn text_content(&self) -> String {
        if let Some(text) = self.text() {
            return text.to_string();
        }
        self.descendants()
            .filter_map(|n| n.text())
            .collect::<String>()
    }

    /// Reconstruct outer HTML, escaping text and attribute values
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Reconstruct inner HTML
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.children() {
            child.write_html(&mut out);
        }
        out
    }

    fn write_html(&self, out: &mut String) {
        match &self.slot().data {
            NodeData::Text(text) => out.push_str(&escape_html(text)),
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_html(value));
                        out.push('"');
                    }
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                for child in self.children() {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

/// Iterator over ancestors, see [`NodeRef::ancestors`]
pub struct Ancestors<'a> {
    next: Option<NodeRef<'a>>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

/// Iterator over descendants, see [`NodeRef::descendants`]
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let slot = &self.doc.slots[id.0];
        self.stack.extend(slot.children.iter().rev());
        Some(self.doc.node(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::element("div")
            .with_child(Node::element("p").with_text("one"))
            .with_child(
                Node::element_with_attrs("p", vec![("class", "note big")])
                    .with_text("two ")
                    .with_child(Node::element("b").with_text("three")),
            )
    }

    #[test]
    fn test_ids_follow_document_order() {
        let doc = Document::from_node(&sample());
        assert_eq!(doc.len(), 6);
        let tags: Vec<&str> = doc
            .root()
            .descendants()
            .map(|n| if n.is_text() { "#text" } else { n.tag_name() })
            .collect();
        assert_eq!(tags, vec!["p", "#text", "p", "#text", "b", "#text"]);
        let ids: Vec<usize> = doc.root().descendants().map(|n| n.id().index()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_navigation() {
        let doc = Document::from_node(&sample());
        let root = doc.root();
        let b = root.find_descendant(|n| n.is_tag("b")).unwrap();

        assert_eq!(b.level(), 2);
        assert_eq!(b.parent().unwrap().attr("CLASS"), Some("note big"));
        assert!(b.parent().unwrap().has_class("note"));
        assert_eq!(b.ancestors().count(), 2);

        let first_p = root.element_children().next().unwrap();
        let second_p = first_p.next_sibling().unwrap();
        assert_eq!(second_p.index_in_parent(), Some(1));
        assert_eq!(second_p.previous_sibling().unwrap().id(), first_p.id());
        assert!(second_p.next_sibling().is_none());
    }

    #[test]
    fn test_text_content() {
        let doc = Document::from_node(&sample());
        assert_eq!(doc.root().text_content(), "onetwo three");
    }

    #[test]
    fn test_outer_html_escapes() {
        let node = Node::element_with_attrs("span", vec![("title", "a \"b\"")])
            .with_text("<script>x</script>")
            .with_child(Node::element("br"));
        let doc = Document::from_node(&node);
        assert_eq!(
            doc.root().outer_html(),
            "<span title=\"a &quot;b&quot;\">&lt;script&gt;x&lt;/script&gt;<br></span>"
        );
    }

    #[test]
    fn test_deep_tree_builds_iteratively() {
        let mut node = Node::text("leaf");
        for _ in 0..1_000 {
            node = Node::element("div").with_child(node);
        }
        let doc = Document::from_node(&node);
        assert_eq!(doc.len(), 1_001);
        assert_eq!(doc.root().text_content(), "leaf");
    }
}
