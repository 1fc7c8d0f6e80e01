//! Utility functions and constants for markup processing.

/// Void (self-closing) HTML elements
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// The only entities decoded when recovering LaTeX from rendered error
/// placeholders. Anything else is left exactly as written.
const ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("#39", "'"),
    ("#x27", "'"),
    ("nbsp", " "),
];

/// Longest entity name in [`ENTITIES`], bounds the lookahead for `;`
const MAX_ENTITY_LEN: usize = 4;

/// Check if a tag is a void element
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag.to_lowercase().as_str())
}

/// Repeat a string n times
pub fn repeat(s: &str, n: usize) -> String {
    s.repeat(n)
}

/// Escape text or an attribute value for HTML output
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Decode the minimal entity set in a single pass.
///
/// `&amp;lt;` decodes to `&lt;`, not `<`. Unknown entities such as
/// `&unknownEntity;` pass through unchanged.
pub fn decode_entities(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('&') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let decoded = after
            .char_indices()
            .take(MAX_ENTITY_LEN + 1)
            .find(|&(_, c)| c == ';')
            .and_then(|(end, _)| {
                let name = &after[..end];
                ENTITIES
                    .iter()
                    .find(|(entity, _)| *entity == name)
                    .map(|(_, value)| (*value, end))
            });

        match decoded {
            Some((value, end)) => {
                result.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                result.push('&');
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

/// Clean an attribute value (trim and handle empty)
pub fn clean_attribute(value: Option<&str>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_default()
}

/// Collapse every run of whitespace (newlines included) into one space
pub fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_whitespace = false;

    for c in s.chars() {
        if c.is_whitespace() {
            if !prev_was_whitespace {
                result.push(' ');
                prev_was_whitespace = true;
            }
        } else {
            result.push(c);
            prev_was_whitespace = false;
        }
    }

    result
}

/// Length of the longest run of `ch` in `s`
pub fn longest_run(s: &str, ch: char) -> usize {
    s.chars()
        .fold((0, 0), |(max, current), c| {
            if c == ch {
                (max.max(current + 1), current + 1)
            } else {
                (max, 0)
            }
        })
        .0
}
