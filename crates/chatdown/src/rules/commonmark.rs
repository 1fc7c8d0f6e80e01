//! CommonMark rules: headings, paragraphs, lists, quotes and inline markup.

use super::{Filter, Rule};
use crate::document::NodeRef;
use crate::parser::{fence_marker, finalize};
use crate::utilities::{clean_attribute, collapse_whitespace, longest_run, repeat};

/// Create all CommonMark rules
pub fn commonmark_rules() -> Vec<Rule> {
    vec![
        heading_rule(),
        list_rule(),
        list_item_rule(),
        blockquote_rule(),
        strong_rule(),
        emphasis_rule(),
        code_rule(),
        paragraph_rule(),
        link_rule(),
        image_rule(),
        horizontal_rule(),
        line_break_rule(),
    ]
}

fn heading_rule() -> Rule {
    Rule::for_tags(
        "heading",
        5,
        &["h1", "h2", "h3", "h4", "h5", "h6"],
        |content, node, _| {
            let level: usize = node.tag_name()[1..].parse().unwrap_or(1);
            let content = collapse_whitespace(content.trim());
            if content.is_empty() {
                return Ok(String::new());
            }
            Ok(format!("\n\n{} {}\n\n", repeat("#", level), content))
        },
    )
}

fn list_rule() -> Rule {
    Rule::for_tags("list", 6, &["ul", "ol"], |content, node, _| {
        let items: String = block_lines(content)
            .into_iter()
            .map(|(line, _)| format!("{}\n", line))
            .collect();

        if node.ancestors().any(|a| a.is_tag("li")) {
            // The enclosing item indents nothing; every line is already placed
            return Ok(format!("\n{}", items.trim_end()));
        }
        if has_following_content(node) {
            Ok(format!("\n\n{}\n", items))
        } else {
            Ok(format!("\n\n{}", items))
        }
    })
}

fn list_item_rule() -> Rule {
    Rule::for_tag("list-item", 6, "li", |content, node, _| {
        let level = node.ancestors().filter(|a| a.is_tag("li")).count();
        let indent = repeat("  ", level);
        let child_indent = repeat("  ", level + 1);

        let marker = match node.parent() {
            Some(list) if list.is_tag("ol") => {
                let start: i64 = list
                    .attr("start")
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(1);
                let index = list
                    .element_children()
                    .take_while(|c| c.id() != node.id())
                    .filter(|c| c.is_tag("li"))
                    .count() as i64;
                format!("{}.", start + index)
            }
            _ => "-".to_string(),
        };

        let mut output = String::from("\n");
        for (i, (line, fence)) in block_lines(content.trim()).into_iter().enumerate() {
            if i == 0 {
                output.push_str(&indent);
                output.push_str(&marker);
                output.push(' ');
                output.push_str(line);
            } else if let Some(fence_indent) = fence {
                // Fences opened off the margin belong to a nested item
                if fence_indent == 0 && !line.is_empty() {
                    output.push_str(&child_indent);
                }
                output.push_str(line);
            } else if line.starts_with(&child_indent) {
                // Already placed by a nested list
                output.push_str(line);
            } else {
                output.push_str(&child_indent);
                output.push_str(line.trim_start());
            }
            output.push('\n');
        }
        if output.len() == 1 {
            output.push_str(&indent);
            output.push_str(&marker);
            output.push('\n');
        }
        Ok(output)
    })
}

fn blockquote_rule() -> Rule {
    Rule::for_tag("blockquote", 6, "blockquote", |content, _, _| {
        let content = finalize(content.trim());
        let content = content.trim_end();
        if content.is_empty() {
            return Ok(String::new());
        }
        let quoted: Vec<String> = content
            .lines()
            .map(|line| {
                if line.trim().is_empty() {
                    "> ".to_string()
                } else {
                    format!("> {}", line)
                }
            })
            .collect();
        Ok(format!("\n\n{}\n\n", quoted.join("\n")))
    })
}

fn strong_rule() -> Rule {
    Rule::for_tags("bold", 7, &["strong", "b"], |content, _, _| {
        Ok(wrap_inline(content, "**"))
    })
}

fn emphasis_rule() -> Rule {
    Rule::for_tags("italic", 8, &["em", "i"], |content, _, _| {
        Ok(wrap_inline(content, "*"))
    })
}

fn code_rule() -> Rule {
    Rule::new(
        "inline-code",
        9,
        // Code inside a block wrapper belongs to the code block rule
        Filter::predicate(|node, _| {
            node.is_tag("code") && !node.ancestors().any(|a| a.is_tag("pre"))
        }),
        |_, node, _| {
            let content = node.text_content();
            if content.is_empty() {
                return Ok(String::new());
            }

            let backticks = "`".repeat(longest_run(&content, '`') + 1);
            if content.starts_with('`') || content.ends_with('`') {
                Ok(format!("{} {} {}", backticks, content, backticks))
            } else {
                Ok(format!("{}{}{}", backticks, content, backticks))
            }
        },
    )
}

fn paragraph_rule() -> Rule {
    Rule::for_tag("paragraph", 10, "p", |content, _, _| {
        let content = content.trim();
        if content.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("\n\n{}\n\n", content))
    })
}

fn link_rule() -> Rule {
    Rule::for_tag("link", 10, "a", |content, node, _| {
        let href = clean_attribute(node.attr("href"));
        if href.is_empty() {
            return Ok(content.to_string());
        }

        let label = content.trim();
        let label = if label.is_empty() { href.as_str() } else { label };
        Ok(format!("[{}]({}{})", label, href, title_part(&node)))
    })
}

fn image_rule() -> Rule {
    Rule::for_tag("image", 11, "img", |_, node, _| {
        let src = clean_attribute(node.attr("src"));
        if src.is_empty() {
            return Ok(String::new());
        }
        let alt = clean_attribute(node.attr("alt"));
        Ok(format!("![{}]({}{})", alt, src, title_part(&node)))
    })
}

fn horizontal_rule() -> Rule {
    Rule::for_tag("horizontal-rule", 11, "hr", |_, _, _| {
        Ok("\n\n---\n\n".to_string())
    })
}

fn line_break_rule() -> Rule {
    Rule::for_tag("line-break", 12, "br", |_, _, _| Ok("  \n".to_string()))
}

fn title_part(node: &NodeRef<'_>) -> String {
    let title = clean_attribute(node.attr("title"));
    if title.is_empty() {
        String::new()
    } else {
        format!(" \"{}\"", title.replace('"', "\\\""))
    }
}

/// Wrap inline content in a delimiter, keeping outer whitespace outside it
fn wrap_inline(content: &str, delimiter: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return content.to_string();
    }
    let leading = &content[..content.len() - content.trim_start().len()];
    let trailing = &content[content.trim_end().len()..];
    format!("{}{}{}{}{}", leading, delimiter, trimmed, delimiter, trailing)
}

/// Lines of converted block content. Blank lines are dropped except inside
/// fenced code. Lines belonging to a fence carry the indentation of its
/// opening line.
fn block_lines(content: &str) -> Vec<(&str, Option<usize>)> {
    let mut lines = Vec::new();
    let mut fence: Option<(char, usize, usize)> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        let indent = line.len() - line.trim_start().len();
        match (fence, fence_marker(trimmed)) {
            (None, Some((ch, len))) => {
                fence = Some((ch, len, indent));
                lines.push((line, Some(indent)));
            }
            (Some((ch, len, open)), marker) => {
                if marker.is_some_and(|(c, l)| c == ch && l >= len && trimmed.len() == l) {
                    fence = None;
                }
                lines.push((line, Some(open)));
            }
            (None, None) if !trimmed.is_empty() => lines.push((line, None)),
            (None, None) => {}
        }
    }

    lines
}

/// Whether anything renderable follows `node` in document order
fn has_following_content(node: NodeRef<'_>) -> bool {
    std::iter::once(node).chain(node.ancestors()).any(|n| {
        let (Some(parent), Some(index)) = (n.parent(), n.index_in_parent()) else {
            return false;
        };
        parent
            .children()
            .skip(index + 1)
            .any(|s| s.is_element() || s.text().is_some_and(|t| !t.trim().is_empty()))
    })
}

#[cfg(test)]
mod tests {
    use crate::adapter::KatexAdapter;
    use crate::node::Node;
    use crate::Parser;
    use pretty_assertions::assert_eq;

    fn convert(node: &Node) -> String {
        Parser::with_defaults(KatexAdapter::new()).unwrap().parse(node)
    }

    fn list(tag: &str, items: &[&str]) -> Node {
        let mut list = Node::element(tag);
        for item in items {
            list.add_child(Node::element("li").with_text(item));
        }
        list
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(convert(&Node::element("h3").with_text("Title")), "### Title\n\n");
        assert_eq!(convert(&Node::element("h1").with_text(" A\n B ")), "# A B\n\n");
        assert_eq!(convert(&Node::element("h2")), "");
    }

    #[test]
    fn test_unordered_and_ordered_lists() {
        assert_eq!(convert(&list("ul", &["a", "b"])), "- a\n- b\n");
        assert_eq!(convert(&list("ol", &["a", "b"])), "1. a\n2. b\n");

        let mut ol = list("ol", &["x", "y"]);
        ol.set_attr("start", "4");
        assert_eq!(convert(&ol), "4. x\n5. y\n");
    }

    #[test]
    fn test_nested_list() {
        let tree = Node::element("ul").with_child(
            Node::element("li")
                .with_text("x")
                .with_child(list("ul", &["y"])),
        );
        assert_eq!(convert(&tree), "- x\n  - y\n");
    }

    #[test]
    fn test_three_level_list_with_formatting_whitespace() {
        let tree = Node::element("ol")
            .with_text("\n  ")
            .with_child(
                Node::element("li").with_text("one").with_child(
                    Node::element("ul").with_child(
                        Node::element("li")
                            .with_text("two")
                            .with_child(list("ul", &["three"])),
                    ),
                ),
            )
            .with_text("\n  ")
            .with_child(Node::element("li").with_text("four"))
            .with_text("\n");
        assert_eq!(convert(&tree), "1. one\n  - two\n    - three\n2. four\n");
    }

    #[test]
    fn test_list_followed_by_paragraph() {
        let tree = Node::element("div")
            .with_child(Node::element("p").with_text("Intro"))
            .with_child(list("ul", &["a"]))
            .with_child(Node::element("p").with_text("Outro"));
        assert_eq!(convert(&tree), "Intro\n\n- a\n\nOutro\n\n");
    }

    #[test]
    fn test_list_item_with_code_block() {
        let tree = Node::element("ul").with_child(
            Node::element("li")
                .with_child(Node::element("p").with_text("Run"))
                .with_child(
                    Node::element("pre").with_child(
                        Node::element_with_attrs("code", vec![("class", "language-sh")])
                            .with_text("ls\n\nls -a"),
                    ),
                ),
        );
        assert_eq!(convert(&tree), "- Run\n  ```bash\n  ls\n\n  ls -a\n  ```\n");
    }

    #[test]
    fn test_code_block_in_nested_list_item() {
        let tree = Node::element("ul").with_child(
            Node::element("li").with_text("a").with_child(
                Node::element("ul").with_child(
                    Node::element("li")
                        .with_child(Node::element("p").with_text("b"))
                        .with_child(Node::element("pre").with_child(Node::element("code").with_text("x"))),
                ),
            ),
        );
        assert_eq!(convert(&tree), "- a\n  - b\n    ```\n    x\n    ```\n");
    }

    #[test]
    fn test_indented_code_in_list_item_keeps_relative_indent() {
        let tree = Node::element("ul").with_child(
            Node::element("li")
                .with_child(Node::element("p").with_text("Loop"))
                .with_child(
                    Node::element("pre")
                        .with_child(Node::element("code").with_text("for x in y:\n    print(x)")),
                ),
        );
        assert_eq!(
            convert(&tree),
            "- Loop\n  ```\n  for x in y:\n      print(x)\n  ```\n"
        );
    }

    #[test]
    fn test_blockquote() {
        let tree = Node::element("blockquote")
            .with_child(Node::element("p").with_text("first"))
            .with_child(Node::element("p").with_text("second"));
        assert_eq!(convert(&tree), "> first\n> \n> second\n\n");
    }

    #[test]
    fn test_inline_markup() {
        let tree = Node::element("p")
            .with_child(Node::element("strong").with_text("bold "))
            .with_child(Node::element("em").with_text("it"))
            .with_text(" and ")
            .with_child(Node::element("code").with_text("a`b"));
        assert_eq!(convert(&tree), "**bold** *it* and ``a`b``\n\n");
    }

    #[test]
    fn test_inline_code_padding() {
        let tree = Node::element("code").with_text("`tick");
        assert_eq!(convert(&tree), "`` `tick ``");
    }

    #[test]
    fn test_links() {
        let link = Node::element_with_attrs("a", vec![("href", " https://x.dev "), ("title", "X")])
            .with_text("site");
        assert_eq!(convert(&link), "[site](https://x.dev \"X\")");

        let bare = Node::element_with_attrs("a", vec![("href", "https://y.dev")]);
        assert_eq!(convert(&bare), "[https://y.dev](https://y.dev)");

        let anchor = Node::element("a").with_text("just text");
        assert_eq!(convert(&anchor), "just text");
    }

    #[test]
    fn test_image_rule_and_breaks() {
        let img = Node::element_with_attrs("img", vec![("src", "a.png"), ("alt", "A")]);
        assert_eq!(convert(&img), "![A](a.png)");
        assert_eq!(convert(&Node::element("img")), "");

        let tree = Node::element("p")
            .with_text("one")
            .with_child(Node::element("br"))
            .with_text("two");
        assert_eq!(convert(&tree), "one  \ntwo\n\n");

        let tree = Node::element("div")
            .with_child(Node::element("p").with_text("a"))
            .with_child(Node::element("hr"))
            .with_child(Node::element("p").with_text("b"));
        assert_eq!(convert(&tree), "a\n\n---\n\nb\n\n");
    }
}
