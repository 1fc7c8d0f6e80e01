//! HTML parsing support.
//!
//! Builds the [`Node`] tree from an HTML fragment, for callers that hold a
//! message as a string rather than as a live DOM.

use scraper::{ElementRef, Html, Node as ScraperNode};

use crate::node::Node;

/// Parse an HTML fragment into a Node tree.
///
/// The returned root is the fragment's synthetic `html` element, which no
/// rule matches, so it converts as a plain wrapper.
///
/// # Example
///
/// ```rust
/// use chatdown::{parse_html, KatexAdapter, Parser};
///
/// let node = parse_html("<h1>Hello <em>World</em></h1>");
///
/// let parser = Parser::with_defaults(KatexAdapter::new()).unwrap();
/// assert_eq!(parser.parse(&node), "# Hello *World*\n\n");
/// ```
pub fn parse_html(html: &str) -> Node {
    let document = Html::parse_fragment(html);
    scraper_to_node(document.root_element())
}

enum Child<'a> {
    Text(String),
    Element(ElementRef<'a>),
}

/// An element whose children are still being converted
struct Frame<'a> {
    node: Node,
    pending: std::vec::IntoIter<Child<'a>>,
}

impl<'a> Frame<'a> {
    fn new(element: ElementRef<'a>) -> Self {
        let attrs: Vec<(&str, &str)> = element.value().attrs().collect();
        let pending: Vec<Child<'a>> = element
            .children()
            .filter_map(|child| match child.value() {
                ScraperNode::Text(text) => Some(Child::Text(text.text.to_string())),
                ScraperNode::Element(_) => ElementRef::wrap(child).map(Child::Element),
                _ => None,
            })
            .collect();
        Self {
            node: Node::element_with_attrs(element.value().name(), attrs),
            pending: pending.into_iter(),
        }
    }
}

/// Convert a scraper ElementRef to our Node structure.
///
/// Uses an explicit stack; nesting depth is bounded only by the input.
fn scraper_to_node(root: ElementRef<'_>) -> Node {
    let mut stack = vec![Frame::new(root)];

    while let Some(frame) = stack.last_mut() {
        match frame.pending.next() {
            Some(Child::Text(text)) => frame.node.add_child(Node::text(&text)),
            Some(Child::Element(element)) => stack.push(Frame::new(element)),
            None => {
                let Some(done) = stack.pop() else { break };
                match stack.last_mut() {
                    Some(parent) => parent.node.add_child(done.node),
                    None => return done.node,
                }
            }
        }
    }

    Node::element(root.value().name())
}
