// Engine Configuration
//
// Tunables for planning and execution. Loaded from JSON by the shell or
// constructed with `EngineConfig::default()`.

use serde::{Deserialize, Serialize};

/// Default size of the bounded queues used while gathering join inputs
pub const DEFAULT_JOIN_CHANNEL_CAPACITY: usize = 256;

/// Runtime options for the query engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Render eligible WHERE conjuncts into backend filter documents
    pub pushdown: bool,
    /// Capacity of each bounded channel used by the concurrent join gather
    pub join_channel_capacity: usize,
    /// Drain both join inputs on worker threads instead of sequentially
    pub concurrent_join_gather: bool,
    /// Upper bound on rows buffered by a single grouping operator
    pub max_group_rows: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            pushdown: true,
            join_channel_capacity: DEFAULT_JOIN_CHANNEL_CAPACITY,
            concurrent_join_gather: true,
            max_group_rows: None,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON, filling unspecified fields with defaults
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Channel capacity clamped to at least one slot
    pub fn channel_capacity(&self) -> usize {
        self.join_channel_capacity.max(1)
    }
}
