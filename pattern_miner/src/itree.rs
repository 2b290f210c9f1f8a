use std::{collections::VecDeque, fmt, sync::Arc};

use itree_schema::{InfluenceTreeDoc, SkippedDoc, TreeNodeDoc};
use tracing::{debug, info};

use crate::{generate_candidates, MiningError, MiningErrorKind, Pattern, PatternWrapper, TreeConfig};

/// Once-per-user counts feeding one split.
///
/// `fcr`/`fcp`: the node pattern and its prefix. `fpr`/`fpp`: the same pair for
/// the parent node. Below the goal-only root `fcp` is the population size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitCounts {
    pub fcr: u64,
    pub fcp: u64,
    pub fpr: u64,
    pub fpp: u64,
}

impl SplitCounts {
    fn is_consistent(&self) -> bool {
        self.fpp >= self.fpr && self.fcp >= self.fcr && self.fpp >= self.fcp && self.fpr >= self.fcr
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub pattern: Arc<Pattern>,
    pub parent_index: Option<usize>,
    pub counts: SplitCounts,
    pub confidence: f64,
    pub right_gi: f64,
    pub left_gi: f64,
    pub right_fraction: f64,
    pub overall_gi: f64,
    pub gini_drop: Option<f64>,
    pub confidence_gain: Option<f64>,
}

impl TreeNode {
    pub fn is_root(&self) -> bool {
        self.parent_index.is_none()
    }

    fn depth(&self, root_len: usize) -> usize {
        self.pattern.len() - root_len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotObserved,
    PrefixNotObserved,
    InconsistentCounts,
    NonPositiveGiniDrop,
    ChildLimit,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotObserved => "not_observed",
            Self::PrefixNotObserved => "prefix_not_observed",
            Self::InconsistentCounts => "inconsistent_counts",
            Self::NonPositiveGiniDrop => "non_positive_gini_drop",
            Self::ChildLimit => "child_limit",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCandidate {
    pub key: String,
    pub reason: SkipReason,
}

/// Breadth-first tree of patterns ending in the goal event.
///
/// Index in `nodes` is creation order; children are found by scanning
/// `parent_index`.
#[derive(Debug, Clone)]
pub struct InfluenceTree {
    pub goal: String,
    pub start: Option<String>,
    pub nodes: Vec<TreeNode>,
    pub skipped: Vec<SkippedCandidate>,
}

impl InfluenceTree {
    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn children(&self, index: usize) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent_index == Some(index))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn find(&self, key: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.pattern.key() == key)
    }

    pub fn is_skipped(&self, key: &str) -> bool {
        self.skipped.iter().any(|s| s.key == key)
    }

    pub fn to_document(&self) -> InfluenceTreeDoc {
        InfluenceTreeDoc {
            goal: self.goal.clone(),
            start: self.start.clone(),
            nodes: self
                .nodes
                .iter()
                .map(|n| TreeNodeDoc {
                    pattern: n.pattern.event_names().to_vec(),
                    key: n.pattern.key(),
                    parent_index: n.parent_index.map_or(-1, |i| i as i64),
                    confidence: n.confidence,
                    right_gini: n.right_gi,
                    overall_gini: n.overall_gi,
                    gini_drop: n.gini_drop,
                    confidence_gain: n.confidence_gain,
                    once_per_user_count: n.counts.fcr,
                    prefix_count: n.counts.fcp,
                })
                .collect(),
            skipped: self
                .skipped
                .iter()
                .map(|s| SkippedDoc {
                    key: s.key.clone(),
                    reason: s.reason.to_string(),
                })
                .collect(),
        }
    }
}

pub fn build_influence_tree(
    goal: &str,
    wrapper: &PatternWrapper,
    config: &TreeConfig,
) -> Result<InfluenceTree, MiningError> {
    let root_pattern = wrapper.get(&[goal]).ok_or_else(|| goal_not_found(goal))?;
    let population = root_pattern.user_count();
    let once = root_pattern.once_per_user_count();
    if population == 0 || once == 0 {
        return Err(goal_not_found(goal));
    }

    let root = root_node(root_pattern, once, population);
    let mut builder = TreeBuilder::new(goal, None, root, wrapper, config);

    let level_one: Vec<Vec<String>> = wrapper
        .single_event_patterns()
        .iter()
        .map(|p| p.last_event())
        .filter(|e| *e != goal)
        .map(|e| vec![e.to_string(), goal.to_string()])
        .collect();
    builder.expand_root(level_one);
    Ok(builder.finish())
}

/// Tree rooted at `[start, goal]` instead of the goal alone.
pub fn build_influence_tree_from(
    start: &str,
    goal: &str,
    wrapper: &PatternWrapper,
    config: &TreeConfig,
) -> Result<InfluenceTree, MiningError> {
    let not_found = || goal_not_found(&format!("{start},{goal}"));
    let start_pattern = wrapper.get(&[start]).ok_or_else(not_found)?;
    let root_pattern = wrapper.get(&[start, goal]).ok_or_else(not_found)?;
    let fcp = start_pattern.once_per_user_count();
    let fcr = root_pattern.once_per_user_count();
    if fcp == 0 || fcr == 0 {
        return Err(not_found());
    }

    let root = root_node(root_pattern, fcr, fcp);
    let mut builder = TreeBuilder::new(goal, Some(start), root, wrapper, config);

    let level_one: Vec<Vec<String>> = wrapper
        .single_event_patterns()
        .iter()
        .map(|p| p.last_event())
        .filter(|e| *e != goal && *e != start)
        .map(|e| vec![start.to_string(), e.to_string(), goal.to_string()])
        .collect();
    builder.expand_root(level_one);
    Ok(builder.finish())
}

fn goal_not_found(what: &str) -> MiningError {
    MiningError::new(
        MiningErrorKind::GoalNotFound,
        format!("no observed pattern for '{what}'"),
    )
    .with_event(what)
}

fn root_node(pattern: Arc<Pattern>, fcr: u64, fcp: u64) -> TreeNode {
    let confidence = fcr as f64 / fcp as f64;
    let right_gi = gini(confidence);
    TreeNode {
        pattern,
        parent_index: None,
        counts: SplitCounts { fcr, fcp, fpr: fcr, fpp: fcp },
        confidence,
        right_gi,
        left_gi: 0.0,
        right_fraction: 1.0,
        overall_gi: right_gi,
        gini_drop: None,
        confidence_gain: None,
    }
}

fn gini(p: f64) -> f64 {
    p * (1.0 - p)
}

/// Ranking key for children; drops equal to nine decimals tie and keep
/// generation order.
fn drop_rank(node: &TreeNode) -> i64 {
    -(node.gini_drop.unwrap_or(0.0) * 1e9).round() as i64
}

struct TreeBuilder<'a> {
    goal: String,
    start: Option<String>,
    wrapper: &'a PatternWrapper,
    config: &'a TreeConfig,
    root_len: usize,
    nodes: Vec<TreeNode>,
    skipped: Vec<SkippedCandidate>,
}

impl<'a> TreeBuilder<'a> {
    fn new(
        goal: &str,
        start: Option<&str>,
        root: TreeNode,
        wrapper: &'a PatternWrapper,
        config: &'a TreeConfig,
    ) -> Self {
        info!(root = %root.pattern, confidence = root.confidence, "influence tree root");
        Self {
            goal: goal.to_string(),
            start: start.map(str::to_string),
            wrapper,
            config,
            root_len: root.pattern.len(),
            nodes: vec![root],
            skipped: Vec::new(),
        }
    }

    fn finish(self) -> InfluenceTree {
        info!(
            goal = %self.goal,
            nodes = self.nodes.len(),
            skipped = self.skipped.len(),
            "influence tree built"
        );
        InfluenceTree {
            goal: self.goal,
            start: self.start,
            nodes: self.nodes,
            skipped: self.skipped,
        }
    }

    fn skip(&mut self, key: String, reason: SkipReason) {
        debug!(%key, %reason, "candidate skipped");
        self.skipped.push(SkippedCandidate { key, reason });
    }

    fn expand_root(&mut self, level_one: Vec<Vec<String>>) {
        if self.config.max_depth == 0 {
            return;
        }
        let added = self.attach_children(0, level_one);
        // Sibling groups awaiting expansion; a single sibling has nothing to pair with.
        let mut groups: VecDeque<Vec<usize>> = VecDeque::new();
        if added.len() > 1 {
            groups.push_back(added);
        }

        while let Some(group) = groups.pop_front() {
            if self.nodes[group[0]].depth(self.root_len) >= self.config.max_depth {
                continue;
            }

            let frontier: Vec<Arc<Pattern>> =
                group.iter().map(|&i| Arc::clone(&self.nodes[i].pattern)).collect();
            let candidates = generate_candidates(&frontier);

            // Each candidate extends the sibling obtained by dropping its newest antecedent.
            let mut per_parent: Vec<Vec<Vec<String>>> = vec![Vec::new(); group.len()];
            for candidate in candidates {
                let names = candidate.event_names();
                let mut parent_names = names.to_vec();
                parent_names.remove(names.len() - 2);
                match frontier.iter().position(|p| p.event_names() == parent_names.as_slice()) {
                    Some(slot) => per_parent[slot].push(names.to_vec()),
                    None => debug!(candidate = %candidate, "candidate has no parent in its sibling group"),
                }
            }

            for (slot, names) in per_parent.into_iter().enumerate() {
                if names.is_empty() {
                    continue;
                }
                let added = self.attach_children(group[slot], names);
                if added.len() > 1 {
                    groups.push_back(added);
                }
            }
        }
    }

    /// Scores every candidate under `parent`, ranks by gini drop and appends
    /// the survivors. Returns the new node indices.
    fn attach_children(&mut self, parent: usize, candidates: Vec<Vec<String>>) -> Vec<usize> {
        let mut children = Vec::new();
        for names in candidates {
            match self.score_child(parent, &names) {
                Ok(node) => children.push(node),
                Err(reason) => self.skip(names.join(","), reason),
            }
        }

        children.sort_by_key(drop_rank);
        if children.len() > self.config.max_children {
            for dropped in children.split_off(self.config.max_children) {
                self.skip(dropped.pattern.key(), SkipReason::ChildLimit);
            }
        }

        let mut added = Vec::with_capacity(children.len());
        for node in children {
            info!(
                index = self.nodes.len(),
                parent,
                pattern = %node.pattern,
                confidence = node.confidence,
                gini_drop = node.gini_drop.unwrap_or(0.0),
                "influence tree node added"
            );
            added.push(self.nodes.len());
            self.nodes.push(node);
        }
        added
    }

    fn score_child(&self, parent_index: usize, names: &[String]) -> Result<TreeNode, SkipReason> {
        let pattern = self
            .wrapper
            .get(names)
            .filter(|p| p.once_per_user_count() > 0)
            .ok_or(SkipReason::NotObserved)?;
        let prefix = self
            .wrapper
            .get(&names[..names.len() - 1])
            .filter(|p| p.once_per_user_count() > 0)
            .ok_or(SkipReason::PrefixNotObserved)?;

        let parent = &self.nodes[parent_index];
        let counts = SplitCounts {
            fcr: pattern.once_per_user_count(),
            fcp: prefix.once_per_user_count(),
            fpr: parent.counts.fcr,
            fpp: parent.counts.fcp,
        };
        if !counts.is_consistent() {
            debug!(pattern = %pattern, ?counts, "inconsistent counts");
            return Err(SkipReason::InconsistentCounts);
        }

        let confidence = counts.fcr as f64 / counts.fcp as f64;
        let right_gi = gini(confidence);
        let right_fraction = counts.fcp as f64 / counts.fpp as f64;
        let left_p = if counts.fpp > counts.fcp {
            ((counts.fpr - counts.fcr) as f64 / (counts.fpp - counts.fcp) as f64).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let left_gi = gini(left_p);
        let overall_gi = right_fraction * right_gi + (1.0 - right_fraction) * left_gi;
        let gini_drop = parent.right_gi - overall_gi;

        if self.config.require_positive_gini_drop && gini_drop <= 0.0 {
            return Err(SkipReason::NonPositiveGiniDrop);
        }

        Ok(TreeNode {
            pattern,
            parent_index: Some(parent_index),
            counts,
            confidence,
            right_gi,
            left_gi,
            right_fraction,
            overall_gi,
            gini_drop: Some(gini_drop),
            confidence_gain: Some(confidence - parent.confidence),
        })
    }
}
