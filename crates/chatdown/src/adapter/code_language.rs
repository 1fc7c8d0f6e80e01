//! Code block language detection.

use crate::document::NodeRef;
use crate::selector::Selector;

const CLASS_PREFIXES: &[&str] = &["language-", "lang-"];
const LANGUAGE_ATTRIBUTES: &[&str] = &["data-language", "data-lang"];
const MAX_LANGUAGE_LEN: usize = 32;

/// Detect the language of a `code` element.
///
/// Tried in order: a `language-*`/`lang-*` class on the code element or its
/// `pre`, a `data-language` attribute, then the text of a label element
/// matched by `label` inside the `pre` (outside the code) or just before it.
/// Returns an empty string when nothing usable is found.
pub fn detect_code_language(code: &NodeRef<'_>, label: Option<&Selector>) -> String {
    let pre = code.ancestors().find(|a| a.is_tag("pre"));
    let candidates = std::iter::once(*code).chain(pre);

    for node in candidates.clone() {
        if let Some(language) = from_class(&node) {
            return language;
        }
    }
    for node in candidates {
        if let Some(language) = LANGUAGE_ATTRIBUTES
            .iter()
            .find_map(|name| node.attr(name))
            .and_then(normalize_language)
        {
            return language;
        }
    }

    match (label, pre) {
        (Some(selector), Some(pre)) => from_label(code, &pre, selector).unwrap_or_default(),
        _ => String::new(),
    }
}

fn from_class(node: &NodeRef<'_>) -> Option<String> {
    node.classes().find_map(|class| {
        CLASS_PREFIXES
            .iter()
            .find_map(|prefix| class.strip_prefix(prefix))
            .and_then(normalize_language)
    })
}

fn from_label(code: &NodeRef<'_>, pre: &NodeRef<'_>, selector: &Selector) -> Option<String> {
    let inside = pre
        .descendants()
        .filter(|n| n.id() != code.id() && !n.ancestors().any(|a| a.id() == code.id()));

    // Header bars rendered before the block, nearest first
    let mut before = Vec::new();
    let mut sibling = pre.previous_sibling();
    while let Some(node) = sibling {
        before.push(node);
        before.extend(node.descendants());
        sibling = node.previous_sibling();
    }

    inside
        .chain(before)
        .filter(|n| selector.matches(n))
        .filter(|n| !n.is_tag("button") && !n.ancestors().any(|a| a.is_tag("button")))
        .find_map(|n| normalize_language(label_text(&n).trim()))
}

/// Text of a label element, skipping button captions such as "Copy"
fn label_text(node: &NodeRef<'_>) -> String {
    node.descendants()
        .filter(|n| !n.ancestors().any(|a| a.is_tag("button")))
        .filter_map(|n| n.text())
        .collect()
}

/// Normalize a language label to the identifier used after a fence.
///
/// Returns `None` for empty or implausible labels.
pub fn normalize_language(raw: &str) -> Option<String> {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() || lower.chars().count() > MAX_LANGUAGE_LEN {
        return None;
    }
    if !lower
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '+' | '#' | '-' | '_' | '.' | ' '))
    {
        return None;
    }

    let normalized = match lower.as_str() {
        "c++" => "cpp",
        "c#" => "csharp",
        "f#" => "fsharp",
        "shell" | "sh" | "zsh" => "bash",
        "plain text" | "text" => "plaintext",
        other => other,
    };
    if normalized.contains(' ') {
        return None;
    }
    Some(normalized.to_string())
}
