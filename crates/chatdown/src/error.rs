//! Error types.
//!
//! [`EngineError`] covers wiring defects detected while the rule table is
//! built; those are returned to the caller and never recovered.
//! [`ParserError`] is raised during a conversion and always handled by an
//! enclosing boundary inside the parser.

use crate::document::NodeId;

/// Configuration errors raised while registering rules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("rule `{rule}` conflicts with `{existing}`: both have priority {priority} and overlapping filters")]
    PriorityConflict {
        rule: String,
        existing: String,
        priority: i32,
    },

    #[error("a rule named `{0}` is already registered")]
    DuplicateName(String),

    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("rule `{0}` was added after the engine was sealed")]
    Sealed(String),
}

/// How an enclosing boundary recovers from a [`ParserError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Drop the node's output entirely
    Skip,
    /// Substitute the node's already-converted children
    Fallback,
    /// Stop the conversion and return the degraded result
    Abort,
}

/// Error raised while converting a node
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParserError {
    pub message: String,
    pub node: Option<NodeId>,
    pub action: RecoveryAction,
    pub context: Option<String>,
}

impl ParserError {
    pub fn new(message: impl Into<String>, action: RecoveryAction) -> Self {
        Self {
            message: message.into(),
            node: None,
            action,
            context: None,
        }
    }

    /// A per-node failure recovered with the node's children markdown
    pub fn fallback(message: impl Into<String>) -> Self {
        Self::new(message, RecoveryAction::Fallback)
    }

    /// A per-node failure that drops the node's output
    pub fn skip(message: impl Into<String>) -> Self {
        Self::new(message, RecoveryAction::Skip)
    }

    /// A budget or depth failure that ends the conversion
    pub fn abort(message: impl Into<String>) -> Self {
        Self::new(message, RecoveryAction::Abort)
    }

    pub fn at(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_abort(&self) -> bool {
        self.action == RecoveryAction::Abort
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_both_rules() {
        let err = EngineError::PriorityConflict {
            rule: "bold".to_string(),
            existing: "strong".to_string(),
            priority: 7,
        };
        let message = err.to_string();
        assert!(message.contains("`bold`"));
        assert!(message.contains("`strong`"));
        assert!(message.contains("priority 7"));
    }

    #[test]
    fn test_parser_error_builders() {
        let err = ParserError::abort("node budget exceeded").with_context("50001 > 50000");
        assert!(err.is_abort());
        assert_eq!(err.to_string(), "node budget exceeded");
        assert_eq!(err.context.as_deref(), Some("50001 > 50000"));
        assert!(!ParserError::fallback("bad rule").is_abort());
    }
}
