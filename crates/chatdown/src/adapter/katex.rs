//! Adapter for pages that render math with KaTeX.
//!
//! This is also the generic adapter: KaTeX markup, bare MathML and
//! `data-math` style source attributes are what most chat front ends emit.

use super::code_language::detect_code_language;
use super::latex::{LatexExtractor, LatexOptions};
use super::{LatexResult, PlatformAdapter};
use crate::document::NodeRef;
use crate::error::EngineError;
use crate::selector::Selector;

const MATH_CLASSES: &[&str] = &[
    "katex",
    "katex-display",
    "katex-error",
    "math-inline",
    "math-block",
];

const DISPLAY_CLASSES: &[&str] = &["katex-display", "math-block"];

/// Elements that commonly hold a code block's language label
const DEFAULT_LABEL: &str =
    "[class*=lang], [class*=label], [class*=header], [class*=banner], [class*=decoration]";

/// Confidence reported for hosts the adapter was not told about
const GENERIC_CONFIDENCE: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct KatexAdapter {
    name: String,
    hosts: Vec<String>,
    extractor: LatexExtractor,
    label: Option<Selector>,
}

impl Default for KatexAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl KatexAdapter {
    /// Generic adapter with the default label selector
    pub fn new() -> Self {
        Self {
            name: "katex".to_string(),
            hosts: Vec::new(),
            extractor: LatexExtractor::default(),
            label: Selector::parse(DEFAULT_LABEL).ok(),
        }
    }

    /// Rename the adapter, for logs
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Also read LaTeX from this attribute; it is checked first
    pub fn with_math_attribute(mut self, attribute: &str) -> Self {
        let mut options = self.extractor.options().clone();
        options.source_attributes.insert(0, attribute.to_lowercase());
        self.extractor = LatexExtractor::new(options);
        self
    }

    pub fn with_max_latex_length(mut self, max_length: usize) -> Self {
        let options = LatexOptions {
            max_length,
            ..self.extractor.options().clone()
        };
        self.extractor = LatexExtractor::new(options);
        self
    }

    /// Replace the selector for code-block language labels
    pub fn with_label_selector(mut self, selector: &str) -> Result<Self, EngineError> {
        self.label = Some(Selector::parse(selector)?);
        Ok(self)
    }

    /// Claim pages served from hosts containing `pattern`
    pub fn with_host(mut self, pattern: &str) -> Self {
        self.hosts.push(pattern.to_lowercase());
        self
    }

    fn has_source_attribute(&self, node: &NodeRef<'_>) -> bool {
        self.extractor
            .options()
            .source_attributes
            .iter()
            .any(|name| node.has_attr(name))
    }
}

impl PlatformAdapter for KatexAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_math_node(&self, node: &NodeRef<'_>) -> bool {
        node.is_element()
            && (MATH_CLASSES.iter().any(|c| node.has_class(c))
                || node.is_tag("math")
                || self.has_source_attribute(node))
    }

    fn is_code_block(&self, node: &NodeRef<'_>) -> bool {
        node.is_tag("pre") && node.find_descendant(|n| n.is_tag("code")).is_some()
    }

    fn extract_latex(&self, node: &NodeRef<'_>) -> Option<LatexResult> {
        let (strategy, latex) = self.extractor.extract(node)?;
        tracing::trace!(?strategy, node = ?node, "latex extracted");
        Some(LatexResult {
            latex,
            is_block: self.is_block_math(node),
        })
    }

    fn is_block_math(&self, node: &NodeRef<'_>) -> bool {
        let display = |n: &NodeRef<'_>| DISPLAY_CLASSES.iter().any(|c| n.has_class(c));
        let block_math = |n: &NodeRef<'_>| {
            n.is_tag("math") && n.attr("display").is_some_and(|d| d.eq_ignore_ascii_case("block"))
        };
        display(node)
            || node.ancestors().any(|a| display(&a))
            || block_math(node)
            || node.find_descendant(|n| block_math(n)).is_some()
    }

    fn get_code_language(&self, code: &NodeRef<'_>) -> String {
        detect_code_language(code, self.label.as_ref())
    }

    fn confidence(&self, host: &str) -> f32 {
        let host = host.to_lowercase();
        if self.hosts.iter().any(|pattern| host.contains(pattern.as_str())) {
            1.0
        } else {
            GENERIC_CONFIDENCE
        }
    }
}
