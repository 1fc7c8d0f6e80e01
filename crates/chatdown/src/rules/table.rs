//! GFM pipe tables.

use std::collections::HashMap;

use super::Rule;
use crate::document::{NodeId, NodeRef};
use crate::error::ParserError;
use crate::parser::Converter;
use crate::utilities::collapse_whitespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alignment {
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    fn of(cell: &NodeRef<'_>) -> Self {
        let value = cell
            .attr("align")
            .map(|a| a.trim().to_ascii_lowercase())
            .or_else(|| {
                cell.attr("style")?.split(';').find_map(|decl| {
                    let (key, value) = decl.split_once(':')?;
                    key.trim()
                        .eq_ignore_ascii_case("text-align")
                        .then(|| value.trim().to_ascii_lowercase())
                })
            });

        match value.as_deref() {
            Some("left") | Some("start") => Alignment::Left,
            Some("center") => Alignment::Center,
            Some("right") | Some("end") => Alignment::Right,
            _ => Alignment::None,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Alignment::None => "---",
            Alignment::Left => ":---",
            Alignment::Center => ":---:",
            Alignment::Right => "---:",
        }
    }
}

pub fn table_rule() -> Rule {
    Rule::for_tag("table", 4, "table", |_, node, ctx| {
        let converted = convert_cells(node, ctx)?;
        let (header, body) = collect_rows(node);
        let Some(header) = header else {
            return Ok(String::new());
        };

        let alignments: Vec<Alignment> = cells(header).iter().map(Alignment::of).collect();
        let header = render_row(header, &converted);
        let body: Vec<Vec<String>> = body.into_iter().map(|row| render_row(row, &converted)).collect();

        let width = std::iter::once(&header)
            .chain(body.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0);
        if width == 0 {
            return Ok(String::new());
        }

        let separator: Vec<String> = (0..width)
            .map(|i| {
                alignments
                    .get(i)
                    .copied()
                    .unwrap_or(Alignment::None)
                    .marker()
                    .to_string()
            })
            .collect();

        let mut lines = vec![format_row(&header, width), format_row(&separator, width)];
        lines.extend(body.iter().map(|row| format_row(row, width)));
        Ok(format!("\n\n{}\n\n", lines.join("\n")))
    })
    .converting_children()
}

/// Convert every cell under `table` once, entering the row structure around
/// them. Nested tables are converted as part of their cell.
fn convert_cells<'d>(
    table: NodeRef<'d>,
    ctx: &mut Converter<'d>,
) -> Result<HashMap<NodeId, String>, ParserError> {
    let mut converted = HashMap::new();
    let mut pending: Vec<NodeRef<'d>> = table.children().collect();
    pending.reverse();

    while let Some(node) = pending.pop() {
        ctx.enter(node)?;
        if is_cell(&node) {
            let content = ctx.convert_children(node)?;
            converted.insert(node.id(), clean_cell(&content));
        } else {
            let start = pending.len();
            pending.extend(node.children());
            pending[start..].reverse();
        }
    }

    Ok(converted)
}

/// Header row and body rows. A row in an explicit header section wins over
/// the first-row heuristic.
fn collect_rows<'d>(table: NodeRef<'d>) -> (Option<NodeRef<'d>>, Vec<NodeRef<'d>>) {
    let mut header = None;
    let mut rows = Vec::new();

    for child in table.element_children() {
        match child.tag_name() {
            "thead" => {
                for tr in child.element_children().filter(|n| n.is_tag("tr")) {
                    if header.is_none() {
                        header = Some(tr);
                    } else {
                        rows.push(tr);
                    }
                }
            }
            "tbody" | "tfoot" => rows.extend(child.element_children().filter(|n| n.is_tag("tr"))),
            "tr" => rows.push(child),
            _ => {}
        }
    }

    if header.is_none() && !rows.is_empty() {
        header = Some(rows.remove(0));
    }
    (header, rows)
}

fn is_cell(node: &NodeRef<'_>) -> bool {
    node.is_tag("td") || node.is_tag("th")
}

fn cells<'d>(row: NodeRef<'d>) -> Vec<NodeRef<'d>> {
    row.element_children().filter(is_cell).collect()
}

fn render_row(row: NodeRef<'_>, converted: &HashMap<NodeId, String>) -> Vec<String> {
    cells(row)
        .iter()
        .map(|cell| converted.get(&cell.id()).cloned().unwrap_or_default())
        .collect()
}

fn clean_cell(content: &str) -> String {
    collapse_whitespace(content.trim()).replace('|', "\\|")
}

fn format_row(cells: &[String], width: usize) -> String {
    let padded: Vec<&str> = (0..width)
        .map(|i| cells.get(i).map(String::as_str).unwrap_or(""))
        .collect();
    format!("| {} |", padded.join(" | "))
}
