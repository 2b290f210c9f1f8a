use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::{pattern_key, Pattern};

/// Read-only lookup of counted patterns by their canonical key.
///
/// Built once from finished patterns; lookups hand out shared [`Arc`]s so any
/// number of tree builders can query it concurrently.
#[derive(Debug, Clone, Default)]
pub struct PatternWrapper {
    by_key: HashMap<String, Arc<Pattern>>,
}

impl PatternWrapper {
    pub fn new(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        let mut by_key = HashMap::new();
        for pattern in patterns {
            let key = pattern.key();
            if by_key.insert(key.clone(), Arc::new(pattern)).is_some() {
                debug!(%key, "duplicate pattern replaced");
            }
        }
        Self { by_key }
    }

    pub fn get<S: AsRef<str>>(&self, event_names: &[S]) -> Option<Arc<Pattern>> {
        self.get_key(&pattern_key(event_names))
    }

    pub fn get_key(&self, key: &str) -> Option<Arc<Pattern>> {
        self.by_key.get(key).cloned()
    }

    pub fn contains<S: AsRef<str>>(&self, event_names: &[S]) -> bool {
        self.by_key.contains_key(&pattern_key(event_names))
    }

    /// All length-1 patterns, ordered by key.
    pub fn single_event_patterns(&self) -> Vec<Arc<Pattern>> {
        let mut singles: Vec<_> = self
            .by_key
            .values()
            .filter(|p| p.len() == 1)
            .cloned()
            .collect();
        singles.sort_by(|a, b| a.event_names().cmp(b.event_names()));
        singles
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Pattern>> {
        self.by_key.values()
    }
}
