//! Fenced code blocks.

use super::{Filter, Rule};
use crate::error::ParserError;
use crate::utilities::longest_run;

/// Code block rule: a wrapper the adapter recognizes, holding a `code` node
pub fn code_block_rule() -> Rule {
    Rule::new(
        "code-block",
        3,
        Filter::predicate(|node, adapter| adapter.is_code_block(node)),
        |_, node, ctx| {
            let code = if node.is_tag("code") {
                node
            } else {
                node.find_descendant(|n| n.is_tag("code"))
                    .ok_or_else(|| ParserError::fallback("code block without a code element"))?
            };

            let language = ctx.adapter().get_code_language(&code);
            let code = normalize_code(&code.text_content());

            let fence_len = (longest_run(&code, '`') + 1).max(3);
            let fence = "`".repeat(fence_len);
            Ok(format!("\n\n{}{}\n{}\n{}\n\n", fence, language, code, fence))
        },
    )
}

/// Normalize the raw text of a code block.
///
/// Line endings become `\n`, at most one blank line is trimmed at each end,
/// whitespace-only lines are emptied and the indentation shared by every
/// non-blank line is removed.
pub fn normalize_code(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<&str> = text.split('\n').collect();

    if lines.len() > 1 && lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    if lines.len() > 1 && lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| if l.trim().is_empty() { "" } else { &l[common..] })
        .collect::<Vec<_>>()
        .join("\n")
}
