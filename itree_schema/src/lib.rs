use serde::{Deserialize, Serialize};

/// Unix time in whole seconds, as written by the sort/merge job.
pub type Seconds = i64;

/// One line of the per-user sorted event file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    #[serde(alias = "uid")]
    pub user_id: String,
    #[serde(alias = "en")]
    pub event_name: String,
    #[serde(alias = "et")]
    pub event_timestamp: Seconds,
    #[serde(alias = "ujt")]
    pub user_created_timestamp: Seconds,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct StatRecord {
    pub count: u64,
    pub mean: f64,
    #[serde(default)]
    pub m2: f64,
}

/// Persisted form of a counted pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternRecord {
    pub event_names: Vec<String>,
    pub count: u64,
    #[serde(default)]
    pub event_count: u64,
    pub user_count: u64,
    pub once_per_user_count: u64,
    #[serde(default)]
    pub timings: Vec<StatRecord>,
    #[serde(default)]
    pub repeats: Vec<StatRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfluenceTreeDoc {
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    pub nodes: Vec<TreeNodeDoc>,
    #[serde(default)]
    pub skipped: Vec<SkippedDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeNodeDoc {
    pub pattern: Vec<String>,
    pub key: String,
    /// -1 marks the root.
    pub parent_index: i64,
    pub confidence: f64,
    pub right_gini: f64,
    pub overall_gini: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gini_drop: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_gain: Option<f64>,
    pub once_per_user_count: u64,
    pub prefix_count: u64,
}

impl TreeNodeDoc {
    pub fn is_root(&self) -> bool {
        self.gini_drop.is_none() && self.confidence_gain.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedDoc {
    pub key: String,
    pub reason: String,
}
