//! Configuration options for a conversion

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ParserError;

/// Callback invoked for every error recorded during a conversion
pub type ErrorCallback = Arc<dyn Fn(&ParserError) + Send + Sync>;

/// Default maximum number of visited nodes
pub const DEFAULT_MAX_NODE_COUNT: usize = 50_000;

/// Default wall-clock budget
pub const DEFAULT_MAX_PROCESSING_TIME: Duration = Duration::from_millis(5_000);

/// Default maximum recursion depth
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Options for [`Parser`](crate::Parser)
#[derive(Clone)]
pub struct ParserOptions {
    /// Maximum number of nodes visited in one conversion
    pub max_node_count: usize,

    /// Maximum wall-clock time for one conversion
    pub max_processing_time: Duration,

    /// Maximum recursion depth
    pub max_depth: usize,

    /// Emit a timing summary for each conversion
    pub log_performance: bool,

    /// Called for each recovered or fatal error
    pub on_error: Option<ErrorCallback>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_node_count: DEFAULT_MAX_NODE_COUNT,
            max_processing_time: DEFAULT_MAX_PROCESSING_TIME,
            max_depth: DEFAULT_MAX_DEPTH,
            log_performance: false,
            on_error: None,
        }
    }
}

impl fmt::Debug for ParserOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserOptions")
            .field("max_node_count", &self.max_node_count)
            .field("max_processing_time", &self.max_processing_time)
            .field("max_depth", &self.max_depth)
            .field("log_performance", &self.log_performance)
            .field("on_error", &self.on_error.as_ref().map(|_| "<callback>"))
            .finish()
    }
}
