//! Sequential pattern counting and influence-tree construction.
//!
//! Per-user sorted event streams are replayed through [`Pattern`] automata,
//! the counted patterns are collected in a [`PatternWrapper`], and
//! [`build_influence_tree`] ranks the antecedent sequences of a goal event.

mod candidates;
mod config;
mod counter;
mod error;
mod events;
mod itree;
mod mine;
mod online_stat;
mod pattern;
mod wrapper;

pub use candidates::{generate_candidate_pair, generate_candidates, generate_candidates_capped};
pub use config::{MiningConfig, TreeConfig};
pub use counter::{count_patterns, count_patterns_parallel, count_sharded, CountReport};
pub use error::{MiningError, MiningErrorKind};
pub use events::{group_by_user, read_event_file, read_pattern_file, Event, UserEvents};
pub use itree::{
    build_influence_tree, build_influence_tree_from, InfluenceTree, SkipReason, SkippedCandidate,
    SplitCounts, TreeNode,
};
pub use mine::{mine_patterns, LevelStats, MiningOutcome};
pub use online_stat::OnlineStat;
pub use pattern::{pattern_key, Pattern, KEY_SEPARATOR};
pub use wrapper::PatternWrapper;
