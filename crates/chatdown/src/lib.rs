//! # chatdown
//!
//! Convert chat-message DOM trees to Markdown, recovering LaTeX from
//! rendered math and languages from code blocks.
//!
//! ## Design
//!
//! Like turndown, the converter is a table of [`Rule`]s tried in priority
//! order against every node of a tree. Chat platforms render formulas and
//! code differently, so everything platform specific lives behind a
//! [`PlatformAdapter`]; the rules only ask it questions.
//!
//! - **Bounded**: node count, wall-clock time and recursion depth are
//!   checked on every visit. Exceeding one degrades the output instead of
//!   failing.
//! - **Never fails at the boundary**: a rule that errors falls back to its
//!   converted children and the problem is recorded as a warning.
//! - **Wiring errors are eager**: conflicting rules are rejected when they
//!   are registered, before any conversion runs.
//!
//! ## Example (Node-based)
//!
//! ```rust
//! use chatdown::{KatexAdapter, Node, Parser};
//!
//! let parser = Parser::with_defaults(KatexAdapter::new()).unwrap();
//!
//! let formula = Node::element_with_attrs("span", vec![("class", "katex"), ("data-math", "x^2")]);
//! let p = Node::element("p").with_text("Square: ").with_child(formula);
//!
//! assert_eq!(parser.parse(&p), "Square: $x^2$\n\n");
//! ```
//!
//! ## Example (HTML string)
//!
//! ```rust
//! use chatdown::{KatexAdapter, Parser};
//!
//! let parser = Parser::with_defaults(KatexAdapter::new()).unwrap();
//! let markdown = parser.parse_html("<pre><code class=\"language-rust\">fn main() {}</code></pre>");
//! assert_eq!(markdown, "```rust\nfn main() {}\n```\n\n");
//! ```

pub mod adapter;
pub mod document;
mod error;
#[cfg(feature = "html")]
pub mod html;
pub mod node;
mod options;
mod parser;
pub mod rules;
mod selector;
mod utilities;

pub use adapter::{KatexAdapter, LatexExtractor, LatexOptions, LatexResult, PlatformAdapter};
pub use document::{Document, NodeId, NodeRef};
pub use error::{EngineError, ParserError, RecoveryAction, Result};
#[cfg(feature = "html")]
pub use html::parse_html;
pub use node::{Node, NodeType};
pub use options::{
    ErrorCallback, ParserOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODE_COUNT,
    DEFAULT_MAX_PROCESSING_TIME,
};
pub use parser::{Conversion, Converter, Parser, ABORT_MARKER};
pub use rules::{default_rules, Filter, Rule, RuleCache, RuleEngine};
pub use selector::Selector;
pub use utilities::decode_entities;
