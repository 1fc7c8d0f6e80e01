//! Platform adapters.
//!
//! Chat platforms render math and code inconsistently. An adapter knows how
//! one platform marks up those regions and how to recover the LaTeX source
//! and code language from them. The caller picks the adapter and hands it to
//! the [`Parser`](crate::Parser); choosing one for a given page happens
//! outside this crate, optionally guided by [`PlatformAdapter::confidence`].

mod code_language;
mod katex;
mod latex;
mod mathml;

use std::borrow::Cow;

pub use code_language::{detect_code_language, normalize_language};
pub use katex::KatexAdapter;
pub use latex::{
    strip_error_prefix, validate_latex, LatexExtractor, LatexOptions, Rejection, Strategy,
    DEFAULT_MAX_LATEX_LENGTH, TEX_ENCODING,
};
pub use mathml::mathml_to_latex;

use crate::document::NodeRef;

/// LaTeX recovered from a math node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatexResult {
    pub latex: String,
    /// Display (`$$`) rather than inline (`$`) math
    pub is_block: bool,
}

/// Per-platform capabilities used by the math and code rules
pub trait PlatformAdapter: Send + Sync {
    /// Short platform name, used in logs
    fn name(&self) -> &str;

    /// Whether `node` carries this platform's math marker
    fn is_math_node(&self, node: &NodeRef<'_>) -> bool;

    /// Whether `node` is a code block wrapper holding a code element
    fn is_code_block(&self, node: &NodeRef<'_>) -> bool;

    /// Recover the LaTeX source of a math node
    fn extract_latex(&self, node: &NodeRef<'_>) -> Option<LatexResult>;

    /// Whether a math node is display math. Structural only, independent of
    /// which extraction strategy succeeds.
    fn is_block_math(&self, node: &NodeRef<'_>) -> bool;

    /// Language of a code element, or an empty string
    fn get_code_language(&self, code: &NodeRef<'_>) -> String;

    /// Hook for platform-specific cleanup of text nodes
    fn clean_text<'t>(&self, text: &'t str) -> Cow<'t, str> {
        Cow::Borrowed(text)
    }

    /// How sure this adapter is that it fits pages served from `host`,
    /// between 0 and 1
    fn confidence(&self, _host: &str) -> f32 {
        0.0
    }
}
