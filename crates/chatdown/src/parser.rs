//! Parser - the main entry point for tree to Markdown conversion.
//!
//! A [`Parser`] owns a sealed [`RuleEngine`], the platform adapter chosen by
//! the caller and the budgets. Each call to [`Parser::parse`] creates a fresh
//! [`Converter`] that walks the tree depth-first, post-order, and never fails:
//! rule failures fall back to the converted children and budget overruns
//! degrade to a diagnostic marker plus the flattened text.

use std::time::{Duration, Instant};

use crate::adapter::PlatformAdapter;
use crate::document::{Document, NodeRef};
use crate::error::{ParserError, RecoveryAction};
use crate::node::Node;
use crate::options::ParserOptions;
use crate::rules::{Rule, RuleCache, RuleEngine};

/// Prefix of the marker emitted when a conversion is aborted
pub const ABORT_MARKER: &str = "<!-- chatdown: conversion aborted";

/// Result of one conversion with its diagnostics
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The Markdown output
    pub markdown: String,
    /// Recovered problems, in the order they occurred
    pub warnings: Vec<String>,
    /// Errors recorded during the conversion, including a final abort
    pub errors: Vec<ParserError>,
    /// Nodes visited, each at most once
    pub nodes_visited: usize,
    /// Wall-clock time spent converting
    pub elapsed: Duration,
    /// Whether a budget or depth guard aborted the conversion
    pub degraded: bool,
}

/// Converts trees to Markdown with a fixed rule set and adapter
pub struct Parser {
    engine: RuleEngine,
    adapter: Box<dyn PlatformAdapter>,
    options: ParserOptions,
}

impl Parser {
    /// Create a parser. The engine is sealed here; it accepts no further rules.
    pub fn new<A>(mut engine: RuleEngine, adapter: A, options: ParserOptions) -> Self
    where
        A: PlatformAdapter + 'static,
    {
        engine.seal();
        Self {
            engine,
            adapter: Box::new(adapter),
            options,
        }
    }

    /// Create a parser with the standard rules and default options
    pub fn with_defaults<A>(adapter: A) -> crate::Result<Self>
    where
        A: PlatformAdapter + 'static,
    {
        Ok(Self::new(
            RuleEngine::standard()?,
            adapter,
            ParserOptions::default(),
        ))
    }

    /// Get the current options
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    pub fn adapter(&self) -> &dyn PlatformAdapter {
        self.adapter.as_ref()
    }

    /// Convert a tree to Markdown
    pub fn parse(&self, root: &Node) -> String {
        self.parse_detailed(root).markdown
    }

    /// Convert a tree to Markdown, keeping diagnostics
    pub fn parse_detailed(&self, root: &Node) -> Conversion {
        let doc = Document::from_node(root);
        self.parse_document(&doc)
    }

    /// Convert an HTML fragment to Markdown
    #[cfg(feature = "html")]
    pub fn parse_html(&self, html: &str) -> String {
        self.parse(&crate::html::parse_html(html))
    }

    /// Convert an already-lowered document
    pub fn parse_document(&self, doc: &Document) -> Conversion {
        let span = tracing::debug_span!("parse", adapter = self.adapter.name(), nodes = doc.len());
        let _enter = span.enter();

        let mut converter = Converter::new(doc, &self.engine, self.adapter.as_ref(), &self.options);
        let (markdown, degraded) = match converter.convert_node(doc.root(), 0) {
            Ok(markdown) => (finalize(&markdown), false),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    context = err.context.as_deref().unwrap_or(""),
                    "conversion aborted, returning flattened text"
                );
                let markdown = degraded_output(doc.root(), &err);
                converter.record(err);
                (markdown, true)
            }
        };

        let elapsed = converter.started.elapsed();
        if self.options.log_performance {
            tracing::info!(
                nodes_visited = converter.visited,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                degraded,
                warnings = converter.warnings.len(),
                "conversion finished"
            );
        }

        Conversion {
            markdown,
            warnings: converter.warnings,
            errors: converter.errors,
            nodes_visited: converter.visited,
            elapsed,
            degraded,
        }
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("engine", &self.engine)
            .field("adapter", &self.adapter.name())
            .field("options", &self.options)
            .finish()
    }
}

/// Per-conversion context handed to rule replacements.
///
/// Holds the budgets and live counters, the rule cache, and the diagnostics
/// collected so far. Rules use it to reach the adapter and to convert
/// arbitrary sub-nodes with the same guards.
pub struct Converter<'d> {
    engine: &'d RuleEngine,
    adapter: &'d dyn PlatformAdapter,
    options: &'d ParserOptions,
    cache: RuleCache,
    started: Instant,
    visited: usize,
    /// Tree level and recursion depth of the node whose rule is running
    active: (usize, usize),
    warnings: Vec<String>,
    errors: Vec<ParserError>,
}

impl<'d> Converter<'d> {
    fn new(
        doc: &'d Document,
        engine: &'d RuleEngine,
        adapter: &'d dyn PlatformAdapter,
        options: &'d ParserOptions,
    ) -> Self {
        Self {
            engine,
            adapter,
            options,
            cache: RuleCache::new(doc.len()),
            started: Instant::now(),
            visited: 0,
            active: (0, 0),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// The active platform adapter
    pub fn adapter(&self) -> &'d dyn PlatformAdapter {
        self.adapter
    }

    /// Nodes visited so far
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// Record a recovered problem
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Convert the children of `node` from inside a rule replacement.
    ///
    /// Only rules built with [`Rule::converting_children`] should call this on
    /// their own subtree; the generic pass has already converted it otherwise.
    /// Depth continues from the node whose rule is running, so nested
    /// conversions stay under the same depth ceiling.
    pub fn convert_children(&mut self, node: NodeRef<'d>) -> Result<String, ParserError> {
        let depth = self.depth_of(node);
        self.convert_children_at(node, depth + 1)
    }

    /// Count a node a rule walks over without converting it, applying the
    /// same budget and depth guards as a conversion.
    pub fn enter(&mut self, node: NodeRef<'d>) -> Result<(), ParserError> {
        let depth = self.depth_of(node);
        self.visit(node, depth)
    }

    fn depth_of(&self, node: NodeRef<'d>) -> usize {
        let (level, depth) = self.active;
        depth + node.level().saturating_sub(level)
    }

    /// Convert one node at the given recursion depth
    pub fn convert_node(&mut self, node: NodeRef<'d>, depth: usize) -> Result<String, ParserError> {
        self.visit(node, depth)?;

        if let Some(text) = node.text() {
            return Ok(self.convert_text(node, text));
        }

        let engine = self.engine;
        let rule = engine.find_rule(&node, self.adapter, &mut self.cache);
        let content = match rule {
            Some(rule) if rule.converts_children => String::new(),
            _ => self.convert_children_at(node, depth + 1)?,
        };

        match rule {
            Some(rule) => self.apply_rule(rule, content, node, depth),
            None => Ok(content),
        }
    }

    fn convert_children_at(&mut self, node: NodeRef<'d>, depth: usize) -> Result<String, ParserError> {
        let mut output = String::new();

        for child in node.children() {
            match self.convert_node(child, depth) {
                Ok(markdown) => output.push_str(&markdown),
                Err(err) if err.is_abort() => return Err(err),
                Err(err) => {
                    let action = err.action;
                    self.record(err.at(child.id()));
                    if action == RecoveryAction::Fallback {
                        output.push_str(&child.text_content());
                    }
                }
            }
        }

        Ok(output)
    }

    /// Budget and depth guards, checked on every visit
    fn visit(&mut self, node: NodeRef<'d>, depth: usize) -> Result<(), ParserError> {
        self.visited += 1;

        if self.visited > self.options.max_node_count {
            return Err(ParserError::abort("node budget exceeded")
                .at(node.id())
                .with_context(format!("limit {}", self.options.max_node_count)));
        }
        if depth > self.options.max_depth {
            return Err(ParserError::abort("maximum depth exceeded")
                .at(node.id())
                .with_context(format!("depth {} > {}", depth, self.options.max_depth)));
        }
        let elapsed = self.started.elapsed();
        if elapsed > self.options.max_processing_time {
            return Err(ParserError::abort("processing time exceeded")
                .at(node.id())
                .with_context(format!(
                    "{} ms > {} ms",
                    elapsed.as_millis(),
                    self.options.max_processing_time.as_millis()
                )));
        }

        Ok(())
    }

    fn convert_text(&self, node: NodeRef<'d>, text: &str) -> String {
        let in_pre = node.ancestors().any(|a| a.is_tag("pre"));
        if !in_pre && text.contains('\n') && text.trim().is_empty() {
            // Formatting whitespace between elements
            return "\n".to_string();
        }
        self.adapter.clean_text(text).into_owned()
    }

    fn apply_rule(
        &mut self,
        rule: &Rule,
        content: String,
        node: NodeRef<'d>,
        depth: usize,
    ) -> Result<String, ParserError> {
        let saved = self.active;
        self.active = (node.level(), depth);
        let result = rule.replace(&content, node, self);
        self.active = saved;

        match result {
            Ok(markdown) => Ok(markdown),
            Err(err) if err.is_abort() => Err(err),
            Err(err) => {
                let action = err.action;
                let err = if err.node.is_none() { err.at(node.id()) } else { err };
                let err = err.with_context(format!("rule `{}`", rule.name));
                self.warn(format!("rule `{}` failed on <{}>: {}", rule.name, node.tag_name(), err));
                self.record(err);
                match action {
                    RecoveryAction::Skip => Ok(String::new()),
                    _ => Ok(content),
                }
            }
        }
    }

    fn record(&mut self, err: ParserError) {
        if let Some(callback) = &self.options.on_error {
            callback(&err);
        }
        self.errors.push(err);
    }
}

fn degraded_output(root: NodeRef<'_>, err: &ParserError) -> String {
    let text = root.text_content();
    let text = text.trim();
    if text.is_empty() {
        format!("{}: {} -->\n", ABORT_MARKER, err.message)
    } else {
        format!("{}: {} -->\n\n{}\n", ABORT_MARKER, err.message, text)
    }
}

/// Drop leading blank lines and collapse runs of blank lines outside fenced
/// code into a single blank line.
pub(crate) fn finalize(markdown: &str) -> String {
    let mut output = String::with_capacity(markdown.len());
    let mut fence: Option<(char, usize)> = None;
    let mut previous_blank = true;

    for line in markdown.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some(marker) = fence_marker(trimmed) {
            fence = match fence {
                None => Some(marker),
                // Closing fence: same character, at least as long, no info string
                Some((ch, len)) if marker.0 == ch && marker.1 >= len && trimmed.len() == marker.1 => None,
                open => open,
            };
        } else if fence.is_none() && trimmed.is_empty() {
            if !previous_blank && line.ends_with('\n') {
                output.push('\n');
            }
            previous_blank = true;
            continue;
        }
        output.push_str(line);
        previous_blank = false;
    }

    output
}

/// Fence character and run length if `line` opens or closes fenced code
pub(crate) fn fence_marker(line: &str) -> Option<(char, usize)> {
    let ch = line.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = line.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}
