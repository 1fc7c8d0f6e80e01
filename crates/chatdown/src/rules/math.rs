//! Block and inline math.

use super::{Filter, Rule};
use crate::adapter::PlatformAdapter;
use crate::document::NodeRef;

/// A math node that is not nested inside another math node.
///
/// Renderers wrap the same formula in several marked layers; only the
/// outermost one is converted.
pub fn is_math_root(node: &NodeRef<'_>, adapter: &dyn PlatformAdapter) -> bool {
    adapter.is_math_node(node) && !node.ancestors().any(|a| adapter.is_math_node(&a))
}

pub fn block_math_rule() -> Rule {
    Rule::new(
        "block-math",
        1,
        Filter::predicate(|node, adapter| is_math_root(node, adapter) && adapter.is_block_math(node)),
        |_, node, ctx| match ctx.adapter().extract_latex(&node) {
            Some(result) => Ok(format!("\n\n$$\n{}\n$$\n\n", result.latex)),
            None => {
                ctx.warn(format!("no usable LaTeX in block math {:?}, keeping markup", node));
                Ok(format!("\n\n{}\n\n", node.outer_html()))
            }
        },
    )
}

pub fn inline_math_rule() -> Rule {
    Rule::new(
        "inline-math",
        2,
        Filter::predicate(|node, adapter| is_math_root(node, adapter) && !adapter.is_block_math(node)),
        |_, node, ctx| match ctx.adapter().extract_latex(&node) {
            Some(result) => Ok(format!("${}$", result.latex)),
            None => {
                ctx.warn(format!("no usable LaTeX in inline math {:?}, keeping markup", node));
                Ok(node.outer_html())
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use crate::adapter::{KatexAdapter, TEX_ENCODING};
    use crate::node::Node;
    use crate::Parser;
    use pretty_assertions::assert_eq;

    fn parser() -> Parser {
        Parser::with_defaults(KatexAdapter::new()).unwrap()
    }

    /// KaTeX output: MathML with a TeX annotation plus the visual HTML
    fn katex(tex: &str, display: bool) -> Node {
        let math = Node::element_with_attrs("span", vec![("class", "katex")])
            .with_child(
                Node::element_with_attrs("span", vec![("class", "katex-mathml")]).with_child(
                    Node::element("math").with_child(
                        Node::element("semantics")
                            .with_child(Node::element("mi").with_text("?"))
                            .with_child(
                                Node::element_with_attrs("annotation", vec![("encoding", TEX_ENCODING)])
                                    .with_text(tex),
                            ),
                    ),
                ),
            )
            .with_child(
                Node::element_with_attrs("span", vec![("class", "katex-html")])
                    .with_child(Node::element_with_attrs("span", vec![("class", "mord")]).with_text("rendered")),
            );
        if display {
            Node::element_with_attrs("span", vec![("class", "katex-display")]).with_child(math)
        } else {
            math
        }
    }

    #[test]
    fn test_inline_math_in_paragraph() {
        let tree = Node::element("p")
            .with_text("Energy ")
            .with_child(katex("E=mc^2", false))
            .with_text(" holds.");
        assert_eq!(parser().parse(&tree), "Energy $E=mc^2$ holds.\n\n");
    }

    #[test]
    fn test_display_math_emitted_once() {
        let tree = Node::element("div")
            .with_child(Node::element("p").with_text("Sum:"))
            .with_child(katex("\\sum_i x_i", true));
        assert_eq!(parser().parse(&tree), "Sum:\n\n$$\n\\sum_i x_i\n$$\n\n");
    }

    #[test]
    fn test_error_placeholder() {
        let tree = Node::element_with_attrs("span", vec![("class", "katex-error"), ("title", "x")])
            .with_text("ParseError: KaTeX parse error: Expected &lt;x&gt; &amp; &lt;y&gt;");
        assert_eq!(parser().parse(&tree), "$Expected <x> & <y>$");
    }

    #[test]
    fn test_unusable_math_keeps_markup() {
        let tree = Node::element_with_attrs(
            "span",
            vec![("class", "math-block"), ("data-math", "<script>alert(1)</script>")],
        );
        let conversion = parser().parse_detailed(&tree);
        assert_eq!(
            conversion.markdown,
            "<span class=\"math-block\" data-math=\"&lt;script&gt;alert(1)&lt;/script&gt;\"></span>\n\n"
        );
        assert!(!conversion.markdown.contains("<script>"));
        assert_eq!(conversion.warnings.len(), 1);
    }
}
