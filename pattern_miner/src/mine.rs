use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::{
    count_patterns_parallel, generate_candidates_capped, CountReport, MiningConfig, MiningError,
    Pattern, PatternWrapper, UserEvents,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelStats {
    pub length: usize,
    pub candidates: usize,
    pub kept: usize,
}

#[derive(Debug, Clone)]
pub struct MiningOutcome {
    pub patterns: Vec<Pattern>,
    pub levels: Vec<LevelStats>,
    pub report: CountReport,
}

impl MiningOutcome {
    pub fn into_wrapper(self) -> PatternWrapper {
        PatternWrapper::new(self.patterns)
    }
}

/// Level-wise mining: every observed event as a length-1 pattern, then one
/// more position per level through candidate generation, keeping patterns
/// that reach `min_user_support` users.
pub fn mine_patterns(
    users: &[UserEvents],
    config: &MiningConfig,
) -> Result<MiningOutcome, MiningError> {
    let names: BTreeSet<&str> = users
        .iter()
        .flat_map(|u| u.events.iter().map(|e| e.name.as_str()))
        .collect();

    // Names that cannot seed a pattern are dropped along with their records.
    let mut candidates = Vec::with_capacity(names.len());
    let mut rejected = 0;
    for name in names {
        match Pattern::new(&[name]) {
            Ok(pattern) => candidates.push(pattern),
            Err(e) => {
                let records = users
                    .iter()
                    .flat_map(|u| &u.events)
                    .filter(|ev| ev.name == name)
                    .count();
                warn!(event = name, records, error = %e, "event name skipped");
                rejected += records;
            }
        }
    }

    let mut outcome = MiningOutcome {
        patterns: Vec::new(),
        levels: Vec::new(),
        report: CountReport::default(),
    };
    let mut length = 1;

    while !candidates.is_empty() && length <= config.max_pattern_len {
        let generated = candidates.len();
        let report = count_patterns_parallel(users, &mut candidates, config.workers);
        if outcome.levels.is_empty() {
            outcome.report = report;
            outcome.report.skipped_records += rejected;
        } else {
            outcome.report.skipped_users += report.skipped_users;
            outcome.report.skipped_records += report.skipped_records;
        }

        let mut frontier: Vec<Pattern> = candidates
            .into_iter()
            .filter(|p| p.once_per_user_count() >= config.min_user_support.max(1))
            .collect();
        frontier.sort_by(|a, b| {
            b.once_per_user_count()
                .cmp(&a.once_per_user_count())
                .then_with(|| a.event_names().cmp(b.event_names()))
        });

        info!(length, candidates = generated, kept = frontier.len(), "mining level finished");
        outcome.levels.push(LevelStats {
            length,
            candidates: generated,
            kept: frontier.len(),
        });

        candidates = if length < config.max_pattern_len {
            generate_candidates_capped(&frontier, config.max_candidates)
        } else {
            Vec::new()
        };
        outcome.patterns.extend(frontier);
        length += 1;
    }

    Ok(outcome)
}
