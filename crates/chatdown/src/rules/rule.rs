//! Rule and Filter types for markup conversion.

use crate::adapter::PlatformAdapter;
use crate::document::NodeRef;
use crate::error::{EngineError, ParserError};
use crate::parser::Converter;
use crate::selector::Selector;

/// Type alias for replacement functions.
///
/// Receives the node's already-converted children, the node itself and the
/// conversion context. Must not have side effects beyond the context.
pub type ReplacementFn = Box<
    dyn for<'d> Fn(&str, NodeRef<'d>, &mut Converter<'d>) -> Result<String, ParserError>
        + Send
        + Sync,
>;

/// Type alias for predicate filters
pub type PredicateFn = Box<dyn Fn(&NodeRef<'_>, &dyn PlatformAdapter) -> bool + Send + Sync>;

/// A filter determines which nodes a rule applies to
pub enum Filter {
    /// Match any of a set of tag names (case-insensitive)
    TagNames(Vec<String>),
    /// Match a selector; never matches text nodes
    Selector(Selector),
    /// Match using an arbitrary pure predicate
    Predicate(PredicateFn),
}

impl Filter {
    /// Create a filter for a single tag
    pub fn tag(name: &str) -> Self {
        Filter::TagNames(vec![name.to_lowercase()])
    }

    /// Create a filter for multiple tags
    pub fn tags(names: &[&str]) -> Self {
        Filter::TagNames(names.iter().map(|s| s.to_lowercase()).collect())
    }

    /// Create a filter from a selector string
    pub fn selector(source: &str) -> Result<Self, EngineError> {
        Selector::parse(source).map(Filter::Selector)
    }

    /// Create a filter with a predicate
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&NodeRef<'_>, &dyn PlatformAdapter) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Box::new(f))
    }

    /// Check if this filter matches a node
    pub fn matches(&self, node: &NodeRef<'_>, adapter: &dyn PlatformAdapter) -> bool {
        match self {
            Filter::TagNames(tags) => {
                node.is_element() && tags.iter().any(|t| node.tag_name().eq_ignore_ascii_case(t))
            }
            Filter::Selector(selector) => selector.matches(node),
            Filter::Predicate(f) => f(node, adapter),
        }
    }

    /// Whether both filters could match the same node.
    ///
    /// Only identical selectors and intersecting tag sets are detected.
    /// Predicates are opaque and assumed never to overlap anything.
    pub fn overlaps(&self, other: &Filter) -> bool {
        match (self, other) {
            (Filter::TagNames(a), Filter::TagNames(b)) => a.iter().any(|t| b.contains(t)),
            (Filter::Selector(a), Filter::Selector(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::TagNames(tags) => f.debug_tuple("TagNames").field(tags).finish(),
            Filter::Selector(selector) => f.debug_tuple("Selector").field(&selector.source()).finish(),
            Filter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A rule defines how to convert a matched node to Markdown
pub struct Rule {
    /// Unique name, used in diagnostics
    pub name: String,
    /// Lower priorities are tried first
    pub priority: i32,
    /// Filter to determine which nodes this rule applies to
    pub filter: Filter,
    /// Replacement function that generates Markdown
    pub replacement: ReplacementFn,
    /// The replacement converts the node's subtree itself and receives empty
    /// content instead of the converted children
    pub converts_children: bool,
}

impl Rule {
    /// Create a new rule
    pub fn new<F>(name: &str, priority: i32, filter: Filter, replacement: F) -> Self
    where
        F: for<'d> Fn(&str, NodeRef<'d>, &mut Converter<'d>) -> Result<String, ParserError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.to_string(),
            priority,
            filter,
            replacement: Box::new(replacement),
            converts_children: false,
        }
    }

    /// Skip the generic child pass for matched nodes. The replacement walks
    /// the subtree through [`Converter::convert_children`] and
    /// [`Converter::enter`] so every node is still visited once.
    pub fn converting_children(mut self) -> Self {
        self.converts_children = true;
        self
    }

    /// Create a rule that matches a single tag
    pub fn for_tag<F>(name: &str, priority: i32, tag: &str, replacement: F) -> Self
    where
        F: for<'d> Fn(&str, NodeRef<'d>, &mut Converter<'d>) -> Result<String, ParserError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(name, priority, Filter::tag(tag), replacement)
    }

    /// Create a rule that matches multiple tags
    pub fn for_tags<F>(name: &str, priority: i32, tags: &[&str], replacement: F) -> Self
    where
        F: for<'d> Fn(&str, NodeRef<'d>, &mut Converter<'d>) -> Result<String, ParserError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(name, priority, Filter::tags(tags), replacement)
    }

    /// Apply this rule's replacement
    pub fn replace<'d>(
        &self,
        content: &str,
        node: NodeRef<'d>,
        converter: &mut Converter<'d>,
    ) -> Result<String, ParserError> {
        (self.replacement)(content, node, converter)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("filter", &self.filter)
            .field("converts_children", &self.converts_children)
            .finish_non_exhaustive()
    }
}
