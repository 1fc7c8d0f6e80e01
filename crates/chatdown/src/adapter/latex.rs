//! LaTeX recovery from rendered math.
//!
//! The same rendering failures show up on every platform, so extraction is a
//! fixed chain of strategies tried in order; the first candidate that passes
//! [`validate_latex`] wins:
//!
//! 1. the TeX `annotation` embedded in the MathML
//! 2. a platform attribute carrying the source (`data-math`, ...)
//! 3. the text of a rendered parse-error placeholder, entity-decoded
//! 4. a MathML to LaTeX conversion
//! 5. the flattened text of the node

use once_cell::sync::Lazy;
use regex::Regex;

use super::mathml::mathml_to_latex;
use crate::document::NodeRef;
use crate::utilities::decode_entities;

/// Encoding marker of the annotation holding TeX source
pub const TEX_ENCODING: &str = "application/x-tex";

/// Default ceiling on candidate length, in characters
pub const DEFAULT_MAX_LATEX_LENGTH: usize = 20_000;

/// `ParseError: KaTeX parse error: ` and its variants
static ERROR_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:ParseError:\s*)?(?:(?:KaTeX|MathJax|TeX)\s+parse\s+error:\s*)?")
        .expect("ERROR_PREFIX: hardcoded regex is valid")
});

/// Markup that must never be echoed into the output
static INJECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*/?\s*script\b|javascript\s*:|<[^>]*\son[a-z]+\s*=")
        .expect("INJECTION: hardcoded regex is valid")
});

/// Extraction strategies, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Annotation,
    Attribute,
    ParseError,
    MathMl,
    TextContent,
}

impl Strategy {
    pub const ORDER: [Strategy; 5] = [
        Strategy::Annotation,
        Strategy::Attribute,
        Strategy::ParseError,
        Strategy::MathMl,
        Strategy::TextContent,
    ];
}

/// Why a candidate was declined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    TooLong { len: usize, max: usize },
    Suspicious,
}

/// Check a LaTeX candidate before it is embedded in the output
pub fn validate_latex(candidate: &str, max_length: usize) -> Result<(), Rejection> {
    if candidate.trim().is_empty() {
        return Err(Rejection::Empty);
    }
    let len = candidate.chars().count();
    if len > max_length {
        return Err(Rejection::TooLong {
            len,
            max: max_length,
        });
    }
    if INJECTION.is_match(candidate) {
        return Err(Rejection::Suspicious);
    }
    Ok(())
}

/// Remove a leading parse-error label
pub fn strip_error_prefix(text: &str) -> &str {
    match ERROR_PREFIX.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

/// Extraction settings; adapters tune these per platform
#[derive(Debug, Clone)]
pub struct LatexOptions {
    /// Attributes that may hold raw LaTeX, checked in order
    pub source_attributes: Vec<String>,

    /// Classes marking a rendered parse error
    pub error_classes: Vec<String>,

    /// Candidates longer than this are declined
    pub max_length: usize,
}

impl Default for LatexOptions {
    fn default() -> Self {
        Self {
            source_attributes: vec![
                "data-math".to_string(),
                "data-latex".to_string(),
                "data-tex".to_string(),
            ],
            error_classes: vec!["katex-error".to_string()],
            max_length: DEFAULT_MAX_LATEX_LENGTH,
        }
    }
}

/// Runs the strategy chain over a math node
#[derive(Debug, Clone, Default)]
pub struct LatexExtractor {
    options: LatexOptions,
}

impl LatexExtractor {
    pub fn new(options: LatexOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LatexOptions {
        &self.options
    }

    /// First validated candidate and the strategy that produced it
    pub fn extract(&self, node: &NodeRef<'_>) -> Option<(Strategy, String)> {
        for strategy in Strategy::ORDER {
            let Some(candidate) = self.candidate(strategy, node) else {
                continue;
            };
            match validate_latex(&candidate, self.options.max_length) {
                Ok(()) => return Some((strategy, candidate)),
                Err(reason) => {
                    tracing::debug!(?strategy, ?reason, node = ?node, "latex candidate declined");
                }
            }
        }
        None
    }

    /// Candidate from a single strategy, before validation
    pub fn candidate(&self, strategy: Strategy, node: &NodeRef<'_>) -> Option<String> {
        match strategy {
            Strategy::Annotation => self.from_annotation(node),
            Strategy::Attribute => self.from_attribute(node),
            Strategy::ParseError => self.from_parse_error(node),
            Strategy::MathMl => self.from_mathml(node),
            Strategy::TextContent => Some(node.text_content().trim().to_string()),
        }
    }

    fn from_annotation(&self, node: &NodeRef<'_>) -> Option<String> {
        let is_tex = |n: &NodeRef<'_>| {
            n.is_tag("annotation")
                && n.attr("encoding")
                    .is_some_and(|e| e.trim().eq_ignore_ascii_case(TEX_ENCODING))
        };
        let annotation = if is_tex(node) {
            *node
        } else {
            node.find_descendant(|n| is_tex(n))?
        };
        Some(annotation.text_content().trim().to_string())
    }

    fn from_attribute(&self, node: &NodeRef<'_>) -> Option<String> {
        let lookup = |n: &NodeRef<'_>| {
            self.options
                .source_attributes
                .iter()
                .find_map(|name| n.attr(name))
                .map(|value| value.trim().to_string())
        };
        lookup(node).or_else(|| node.descendants().find_map(|n| lookup(&n)))
    }

    fn from_parse_error(&self, node: &NodeRef<'_>) -> Option<String> {
        let is_error = |n: &NodeRef<'_>| self.options.error_classes.iter().any(|c| n.has_class(c));
        let error = if is_error(node) {
            *node
        } else {
            node.find_descendant(|n| is_error(n))?
        };

        let text = error.text_content();
        let raw = if text.trim().is_empty() {
            error.attr("title").unwrap_or_default().to_string()
        } else {
            text
        };

        let decoded = decode_entities(&raw);
        Some(strip_error_prefix(&decoded).trim().to_string())
    }

    fn from_mathml(&self, node: &NodeRef<'_>) -> Option<String> {
        let math = if node.is_tag("math") {
            *node
        } else {
            node.find_descendant(|n| n.is_tag("math"))?
        };
        Some(mathml_to_latex(&math).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::node::Node;

    fn annotation(tex: &str) -> Node {
        Node::element("math").with_child(
            Node::element("semantics")
                .with_child(Node::element("mi").with_text("z"))
                .with_child(
                    Node::element_with_attrs("annotation", vec![("encoding", TEX_ENCODING)])
                        .with_text(tex),
                ),
        )
    }

    #[test]
    fn test_annotation_beats_attribute() {
        let node = Node::element_with_attrs("span", vec![("class", "katex"), ("data-math", "x-y")])
            .with_child(annotation("a+b"));
        let doc = Document::from_node(&node);
        let (strategy, latex) = LatexExtractor::default().extract(&doc.root()).unwrap();
        assert_eq!(strategy, Strategy::Annotation);
        assert_eq!(latex, "a+b");
    }

    #[test]
    fn test_attribute_when_no_annotation() {
        let node = Node::element_with_attrs("span", vec![("class", "math-inline")])
            .with_child(Node::element_with_attrs("span", vec![("data-latex", " \\alpha ")]));
        let doc = Document::from_node(&node);
        let (strategy, latex) = LatexExtractor::default().extract(&doc.root()).unwrap();
        assert_eq!(strategy, Strategy::Attribute);
        assert_eq!(latex, "\\alpha");
    }

    #[test]
    fn test_parse_error_decoding() {
        let node = Node::element_with_attrs("span", vec![("class", "katex-error")])
            .with_text("ParseError: KaTeX parse error: Expected &lt;x&gt; &amp; &lt;y&gt;");
        let doc = Document::from_node(&node);
        let (strategy, latex) = LatexExtractor::default().extract(&doc.root()).unwrap();
        assert_eq!(strategy, Strategy::ParseError);
        assert_eq!(latex, "Expected <x> & <y>");
    }

    #[test]
    fn test_parse_error_keeps_unknown_entities() {
        let node = Node::element_with_attrs("span", vec![("class", "katex-error")])
            .with_text("\\text{&unknownEntity;} &lt; 1");
        let doc = Document::from_node(&node);
        let latex = LatexExtractor::default()
            .candidate(Strategy::ParseError, &doc.root())
            .unwrap();
        assert_eq!(latex, "\\text{&unknownEntity;} < 1");
    }

    #[test]
    fn test_parse_error_uses_title_when_empty() {
        let node = Node::element_with_attrs(
            "span",
            vec![("class", "katex-error"), ("title", "ParseError: \\frac{1}{")],
        );
        let doc = Document::from_node(&node);
        let latex = LatexExtractor::default()
            .candidate(Strategy::ParseError, &doc.root())
            .unwrap();
        assert_eq!(latex, "\\frac{1}{");
    }

    #[test]
    fn test_mathml_then_text_fallback() {
        let node = Node::element("span").with_child(
            Node::element("math").with_child(
                Node::element("msup")
                    .with_child(Node::element("mi").with_text("x"))
                    .with_child(Node::element("mn").with_text("2")),
            ),
        );
        let doc = Document::from_node(&node);
        let (strategy, latex) = LatexExtractor::default().extract(&doc.root()).unwrap();
        assert_eq!(strategy, Strategy::MathMl);
        assert_eq!(latex, "x^2");

        let plain = Node::element("span").with_text(" e=mc^2 ");
        let doc = Document::from_node(&plain);
        let (strategy, latex) = LatexExtractor::default().extract(&doc.root()).unwrap();
        assert_eq!(strategy, Strategy::TextContent);
        assert_eq!(latex, "e=mc^2");
    }

    #[test]
    fn test_script_candidate_falls_through() {
        let node = Node::element_with_attrs(
            "span",
            vec![("class", "katex"), ("data-math", "<script>alert(1)</script>")],
        )
        .with_text("x+1");
        let doc = Document::from_node(&node);
        let (strategy, latex) = LatexExtractor::default().extract(&doc.root()).unwrap();
        assert_eq!(strategy, Strategy::TextContent);
        assert_eq!(latex, "x+1");
    }

    #[test]
    fn test_nothing_valid() {
        let node = Node::element_with_attrs("span", vec![("data-math", "javascript:alert(1)")]);
        let doc = Document::from_node(&node);
        assert!(LatexExtractor::default().extract(&doc.root()).is_none());
    }

    #[test]
    fn test_validate_latex() {
        assert_eq!(validate_latex("  \n", 100), Err(Rejection::Empty));
        assert_eq!(
            validate_latex("xxxx", 3),
            Err(Rejection::TooLong { len: 4, max: 3 })
        );
        assert_eq!(validate_latex("<script>alert(1)</script>", 100), Err(Rejection::Suspicious));
        assert_eq!(validate_latex("< SCRIPT src=x>", 100), Err(Rejection::Suspicious));
        assert_eq!(validate_latex("JavaScript:void(0)", 100), Err(Rejection::Suspicious));
        assert_eq!(validate_latex("<img src=x onerror=alert(1)>", 100), Err(Rejection::Suspicious));
        assert!(validate_latex("a < b > c", 100).is_ok());
        assert!(validate_latex("\\text{one} = 1", 100).is_ok());
        assert!(validate_latex("\\frac{a}{b}", 100).is_ok());
    }

    #[test]
    fn test_strip_error_prefix() {
        assert_eq!(strip_error_prefix("ParseError: KaTeX parse error: x"), "x");
        assert_eq!(strip_error_prefix("KaTeX parse error: y"), "y");
        assert_eq!(strip_error_prefix("\\sqrt{2}"), "\\sqrt{2}");
    }
}
