use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Longest pattern the level-wise miner counts.
    pub max_pattern_len: usize,
    /// Minimum once-per-user count for a pattern to be kept.
    pub min_user_support: u64,
    /// Per-level cap on generated candidates.
    pub max_candidates: usize,
    pub workers: usize,
    pub tree: TreeConfig,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            max_pattern_len: 4,
            min_user_support: 1,
            max_candidates: 10_000,
            workers: 1,
            tree: TreeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Levels below the root.
    pub max_depth: usize,
    pub max_children: usize,
    /// Skip children whose split does not lower impurity.
    pub require_positive_gini_drop: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_children: 10,
            require_positive_gini_drop: true,
        }
    }
}
