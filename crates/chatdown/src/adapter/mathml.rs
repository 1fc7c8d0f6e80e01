//! Best-effort Presentation MathML to LaTeX.
//!
//! Covers the token elements and the handful of layout schemata that chat
//! renderers emit. Anything unknown contributes its children.

use crate::document::NodeRef;

/// Convert a `math` subtree to LaTeX
pub fn mathml_to_latex(node: &NodeRef<'_>) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &NodeRef<'_>, out: &mut String) {
    if let Some(text) = node.text() {
        let text = text.trim();
        if !text.is_empty() {
            out.push_str(text);
        }
        return;
    }

    let args: Vec<NodeRef<'_>> = node.element_children().collect();
    match node.tag_name() {
        "mi" | "mn" | "mo" => out.push_str(node.text_content().trim()),
        "mtext" => {
            let text = node.text_content();
            let text = text.trim();
            if !text.is_empty() {
                out.push_str("\\text{");
                out.push_str(text);
                out.push('}');
            }
        }
        "annotation" | "annotation-xml" | "mspace" => {}
        "semantics" => {
            if let Some(first) = args.first() {
                write_node(first, out);
            }
        }
        "msub" if args.len() == 2 => {
            write_node(&args[0], out);
            out.push('_');
            out.push_str(&group(&args[1]));
        }
        "msup" if args.len() == 2 => {
            write_node(&args[0], out);
            out.push('^');
            out.push_str(&group(&args[1]));
        }
        "msubsup" if args.len() == 3 => {
            write_node(&args[0], out);
            out.push('_');
            out.push_str(&group(&args[1]));
            out.push('^');
            out.push_str(&group(&args[2]));
        }
        "mfrac" if args.len() == 2 => {
            out.push_str("\\frac{");
            write_node(&args[0], out);
            out.push_str("}{");
            write_node(&args[1], out);
            out.push('}');
        }
        "msqrt" => {
            out.push_str("\\sqrt{");
            write_children(node, out);
            out.push('}');
        }
        "mroot" if args.len() == 2 => {
            out.push_str("\\sqrt[");
            write_node(&args[1], out);
            out.push_str("]{");
            write_node(&args[0], out);
            out.push('}');
        }
        _ => write_children(node, out),
    }
}

fn write_children(node: &NodeRef<'_>, out: &mut String) {
    for child in node.children() {
        write_node(&child, out);
    }
}

/// Single characters go bare, anything longer is braced
fn group(node: &NodeRef<'_>) -> String {
    let inner = mathml_to_latex(node);
    if inner.chars().count() == 1 {
        inner
    } else {
        format!("{{{}}}", inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::node::Node;

    fn convert(node: Node) -> String {
        let doc = Document::from_node(&node);
        mathml_to_latex(&doc.root())
    }

    fn token(tag: &str, text: &str) -> Node {
        Node::element(tag).with_text(text)
    }

    #[test]
    fn test_tokens_and_rows() {
        let math = Node::element("math").with_child(
            Node::element("mrow")
                .with_child(token("mi", "a"))
                .with_child(token("mo", "+"))
                .with_child(token("mn", " 1 ")),
        );
        assert_eq!(convert(math), "a+1");
    }

    #[test]
    fn test_scripts() {
        let sub = Node::element("msub")
            .with_child(token("mi", "x"))
            .with_child(token("mn", "10"));
        assert_eq!(convert(sub), "x_{10}");

        let both = Node::element("msubsup")
            .with_child(token("mi", "y"))
            .with_child(token("mi", "i"))
            .with_child(token("mn", "2"));
        assert_eq!(convert(both), "y_i^2");
    }

    #[test]
    fn test_fraction_and_roots() {
        let frac = Node::element("mfrac")
            .with_child(token("mn", "1"))
            .with_child(token("mi", "n"));
        assert_eq!(convert(frac), "\\frac{1}{n}");

        let sqrt = Node::element("msqrt").with_child(token("mi", "x"));
        assert_eq!(convert(sqrt), "\\sqrt{x}");

        let root = Node::element("mroot")
            .with_child(token("mi", "x"))
            .with_child(token("mn", "3"));
        assert_eq!(convert(root), "\\sqrt[3]{x}");
    }

    #[test]
    fn test_semantics_skips_annotations() {
        let math = Node::element("math").with_child(
            Node::element("semantics")
                .with_child(token("mi", "z"))
                .with_child(token("annotation", "ignored")),
        );
        assert_eq!(convert(math), "z");
        assert_eq!(convert(token("mtext", " if ")), "\\text{if}");
    }
}
