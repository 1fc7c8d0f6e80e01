//! Rule system for markup to Markdown conversion.
//!
//! Rules are registered into a [`RuleEngine`] during a build phase. The engine
//! keeps them sorted by priority, rejects conflicting registrations eagerly and
//! is sealed by the [`Parser`](crate::Parser) before any conversion runs.

mod code;
mod commonmark;
mod math;
mod rule;
mod table;

pub use code::{code_block_rule, normalize_code};
pub use commonmark::commonmark_rules;
pub use math::{block_math_rule, inline_math_rule, is_math_root};
pub use rule::{Filter, PredicateFn, ReplacementFn, Rule};
pub use table::table_rule;

use crate::adapter::PlatformAdapter;
use crate::document::NodeRef;
use crate::error::{EngineError, Result};

/// Every standard rule, in no particular order
pub fn default_rules() -> Vec<Rule> {
    let mut rules = vec![
        block_math_rule(),
        inline_math_rule(),
        code_block_rule(),
        table_rule(),
    ];
    rules.extend(commonmark_rules());
    rules
}

/// Priority-ordered rule table
#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: Vec<Rule>,
    sealed: bool,
}

impl RuleEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine holding [`default_rules`]
    pub fn standard() -> Result<Self> {
        let mut engine = Self::new();
        for rule in default_rules() {
            engine.add_rule(rule)?;
        }
        Ok(engine)
    }

    /// Register a rule.
    ///
    /// Fails if the engine is sealed, if the name is taken, or if a rule with
    /// the same priority has an overlapping filter.
    pub fn add_rule(&mut self, rule: Rule) -> Result<&mut Self> {
        if self.sealed {
            return Err(EngineError::Sealed(rule.name));
        }
        if self.rules.iter().any(|r| r.name == rule.name) {
            return Err(EngineError::DuplicateName(rule.name));
        }
        if let Some(existing) = self
            .rules
            .iter()
            .find(|r| r.priority == rule.priority && r.filter.overlaps(&rule.filter))
        {
            return Err(EngineError::PriorityConflict {
                rule: rule.name,
                existing: existing.name.clone(),
                priority: rule.priority,
            });
        }

        // Stable: equal priorities keep registration order
        let pos = self.rules.partition_point(|r| r.priority <= rule.priority);
        self.rules.insert(pos, rule);
        Ok(self)
    }

    /// Freeze the table; later registrations fail
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Registered rules in priority order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Find the first rule, in priority order, whose filter matches `node`.
    ///
    /// Resolutions are memoized in `cache`, which belongs to a single
    /// conversion.
    pub fn find_rule<'e>(
        &'e self,
        node: &NodeRef<'_>,
        adapter: &dyn PlatformAdapter,
        cache: &mut RuleCache,
    ) -> Option<&'e Rule> {
        let index = node.id().index();
        let resolution = match cache.get(index) {
            Some(resolution) => resolution,
            None => {
                let resolution = self
                    .rules
                    .iter()
                    .position(|rule| rule.filter.matches(node, adapter));
                cache.set(index, resolution);
                resolution
            }
        };
        resolution.map(|i| &self.rules[i])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Unresolved,
    NoRule,
    Rule(usize),
}

/// Per-conversion memo of node id to resolved rule
#[derive(Debug)]
pub struct RuleCache {
    slots: Vec<Resolution>,
}

impl RuleCache {
    /// Cache sized for a document with `len` nodes
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![Resolution::Unresolved; len],
        }
    }

    fn get(&self, index: usize) -> Option<Option<usize>> {
        match self.slots.get(index)? {
            Resolution::Unresolved => None,
            Resolution::NoRule => Some(None),
            Resolution::Rule(i) => Some(Some(*i)),
        }
    }

    fn set(&mut self, index: usize, resolution: Option<usize>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = match resolution {
                Some(i) => Resolution::Rule(i),
                None => Resolution::NoRule,
            };
        }
    }

    /// Number of nodes resolved so far
    pub fn resolved(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| **s != Resolution::Unresolved)
            .count()
    }
}
