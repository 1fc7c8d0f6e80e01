//! Minimal CSS-like selectors for rule filters and adapter predicates.
//!
//! Supported: `tag`, `*`, `.class`, `#id`, `[attr]`, `[attr=value]`,
//! `[attr^=value]`, `[attr*=value]`, compounds of those (`span.katex[title]`)
//! and comma-separated lists. Combinators are rejected.

use crate::document::NodeRef;
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Prefix(String),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, AttrOp)>,
}

impl Compound {
    fn matches(&self, node: &NodeRef) -> bool {
        if let Some(tag) = &self.tag {
            if !node.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| node.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|(name, op)| match (node.attr(name), op) {
            (None, _) => false,
            (Some(_), AttrOp::Exists) => true,
            (Some(v), AttrOp::Equals(want)) => v == want,
            (Some(v), AttrOp::Prefix(want)) => v.starts_with(want.as_str()),
            (Some(v), AttrOp::Contains(want)) => v.contains(want.as_str()),
        })
    }
}

/// A parsed selector. Equality and overlap checks use the normalized source.
#[derive(Debug, Clone)]
pub struct Selector {
    source: String,
    alternatives: Vec<Compound>,
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Selector {}

impl Selector {
    /// Parse a selector string
    pub fn parse(source: &str) -> Result<Self, EngineError> {
        let invalid = |reason: &str| EngineError::InvalidSelector {
            selector: source.to_string(),
            reason: reason.to_string(),
        };

        let mut alternatives = Vec::new();
        for part in source.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid("empty selector"));
            }
            alternatives.push(parse_compound(part).map_err(|reason| invalid(&reason))?);
        }

        let source = source
            .split(',')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Self {
            source,
            alternatives,
        })
    }

    /// Normalized source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Selectors only ever match elements
    pub fn matches(&self, node: &NodeRef) -> bool {
        node.is_element() && self.alternatives.iter().any(|c| c.matches(node))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn parse_compound(part: &str) -> Result<Compound, String> {
    let chars: Vec<char> = part.chars().collect();
    let mut pos = 0;
    let mut compound = Compound::default();

    if chars.first() == Some(&'*') {
        pos = 1;
    } else {
        let tag = take_ident(&chars, &mut pos);
        if !tag.is_empty() {
            compound.tag = Some(tag.to_lowercase());
        }
    }

    while pos < chars.len() {
        match chars[pos] {
            '.' => {
                pos += 1;
                let class = take_ident(&chars, &mut pos);
                if class.is_empty() {
                    return Err("expected class name after `.`".to_string());
                }
                compound.classes.push(class);
            }
            '#' => {
                pos += 1;
                let id = take_ident(&chars, &mut pos);
                if id.is_empty() {
                    return Err("expected id after `#`".to_string());
                }
                compound.id = Some(id);
            }
            '[' => {
                pos += 1;
                let end = chars[pos..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or_else(|| "unterminated attribute selector".to_string())?;
                let body: String = chars[pos..pos + end].iter().collect();
                compound.attrs.push(parse_attr(&body)?);
                pos += end + 1;
            }
            c if c.is_whitespace() || c == '>' || c == '+' || c == '~' => {
                return Err("combinators are not supported".to_string());
            }
            c => return Err(format!("unexpected character `{}`", c)),
        }
    }

    Ok(compound)
}

fn parse_attr(body: &str) -> Result<(String, AttrOp), String> {
    let unquote = |v: &str| v.trim().trim_matches(|c: char| c == '"' || c == '\'').to_string();

    let (name, op) = if let Some((name, value)) = body.split_once("^=") {
        (name, AttrOp::Prefix(unquote(value)))
    } else if let Some((name, value)) = body.split_once("*=") {
        (name, AttrOp::Contains(unquote(value)))
    } else if let Some((name, value)) = body.split_once('=') {
        (name, AttrOp::Equals(unquote(value)))
    } else {
        (body, AttrOp::Exists)
    };

    let name = name.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return Err(format!("invalid attribute name `{}`", name));
    }
    Ok((name.to_lowercase(), op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::node::Node;

    fn span_doc() -> Document {
        let node = Node::element_with_attrs(
            "span",
            vec![("class", "katex katex-display"), ("data-math", "x"), ("id", "m1")],
        )
        .with_text("x");
        Document::from_node(&node)
    }

    #[test]
    fn test_compound_matching() {
        let doc = span_doc();
        let root = doc.root();
        for source in [
            "span",
            "SPAN",
            "*",
            ".katex",
            "span.katex.katex-display",
            "#m1",
            "[data-math]",
            "[data-math=x]",
            "[data-math=\"x\"]",
            "[class^=katex]",
            "[class*=display]",
            "div, .katex",
        ] {
            assert!(Selector::parse(source).unwrap().matches(&root), "{}", source);
        }
        for source in ["div", ".mjx", "span.other", "[data-latex]", "[data-math=y]"] {
            assert!(!Selector::parse(source).unwrap().matches(&root), "{}", source);
        }
    }

    #[test]
    fn test_never_matches_text() {
        let doc = span_doc();
        let text = doc.root().children().next().unwrap();
        assert!(!Selector::parse("*").unwrap().matches(&text));
    }

    #[test]
    fn test_rejects_invalid() {
        for source in ["div p", "ul > li", ".", "[open", "", "a,,b", "[=x]"] {
            assert!(
                matches!(Selector::parse(source), Err(EngineError::InvalidSelector { .. })),
                "{}",
                source
            );
        }
    }

    #[test]
    fn test_normalized_equality() {
        assert_eq!(Selector::parse("pre,code").unwrap(), Selector::parse("pre, code").unwrap());
        assert_eq!(Selector::parse("pre ,code").unwrap().source(), "pre, code");
    }
}
