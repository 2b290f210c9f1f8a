use std::{
    ops::AddAssign,
    panic,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use crossbeam_channel::unbounded;
use tracing::{info, warn};

use crate::{MiningError, MiningErrorKind, Pattern, UserEvents};

/// Totals of one counting pass. Skips are tallied per pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountReport {
    pub users: usize,
    pub records: usize,
    pub skipped_users: usize,
    pub skipped_records: usize,
}

impl AddAssign for CountReport {
    fn add_assign(&mut self, rhs: Self) {
        self.users += rhs.users;
        self.records += rhs.records;
        self.skipped_users += rhs.skipped_users;
        self.skipped_records += rhs.skipped_records;
    }
}

impl CountReport {
    fn for_users(users: &[UserEvents]) -> Self {
        Self {
            users: users.len(),
            records: users.iter().map(|u| u.events.len()).sum(),
            ..Self::default()
        }
    }

    fn add_skips(&mut self, other: &CountReport) {
        self.skipped_users += other.skipped_users;
        self.skipped_records += other.skipped_records;
    }
}

/// Replays every user segment through one pattern. Failing users and records
/// are skipped and tallied.
fn count_one(pattern: &mut Pattern, users: &[UserEvents], report: &mut CountReport) {
    for user in users {
        if let Err(e) = pattern.reset_for_new_user(&user.user_id, user.user_created_time) {
            warn!(pattern = %pattern, user = %user.user_id, error = %e, "user skipped");
            report.skipped_users += 1;
            continue;
        }
        for event in &user.events {
            if let Err(e) = pattern.count_for_event(
                &event.name,
                event.timestamp,
                &user.user_id,
                event.user_created_time,
            ) {
                warn!(pattern = %pattern, user = %user.user_id, error = %e, "record skipped");
                report.skipped_records += 1;
            }
        }
        pattern.finish_user();
    }
}

pub fn count_patterns(users: &[UserEvents], patterns: &mut [Pattern]) -> CountReport {
    let mut report = CountReport::for_users(users);
    for pattern in patterns.iter_mut() {
        count_one(pattern, users, &mut report);
    }
    info!(
        patterns = patterns.len(),
        users = report.users,
        records = report.records,
        skipped_users = report.skipped_users,
        skipped_records = report.skipped_records,
        "counting pass finished"
    );
    report
}

/// Splits `patterns` into contiguous batches, one scoped thread per batch.
/// Every thread reads the shared user list and mutates only its own batch.
pub fn count_patterns_parallel(
    users: &[UserEvents],
    patterns: &mut [Pattern],
    workers: usize,
) -> CountReport {
    if workers <= 1 || patterns.len() <= 1 {
        return count_patterns(users, patterns);
    }

    let batch = patterns.len().div_ceil(workers);
    let mut report = CountReport::for_users(users);

    let partials: Vec<CountReport> = thread::scope(|s| {
        let handles: Vec<_> = patterns
            .chunks_mut(batch)
            .map(|chunk| {
                s.spawn(move || {
                    let mut partial = CountReport::default();
                    for pattern in chunk.iter_mut() {
                        count_one(pattern, users, &mut partial);
                    }
                    partial
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
            .collect()
    });

    for partial in &partials {
        report.add_skips(partial);
    }
    info!(
        patterns = patterns.len(),
        workers = partials.len(),
        users = report.users,
        records = report.records,
        skipped_users = report.skipped_users,
        skipped_records = report.skipped_records,
        "parallel counting pass finished"
    );
    report
}

enum ShardMessage {
    Done {
        shard: usize,
        patterns: Vec<Pattern>,
        report: CountReport,
    },
    Cancelled {
        shard: usize,
    },
}

/// Counts `template` over user shards, each worker owning fresh copies, and
/// merges the partial results in shard order.
///
/// `cancel` is checked before every user. If any shard observes it, nothing is
/// merged and the call fails with `Cancelled`.
pub fn count_sharded(
    users: &[UserEvents],
    template: &[Pattern],
    shards: usize,
    cancel: &AtomicBool,
) -> Result<(Vec<Pattern>, CountReport), MiningError> {
    let shards = shards.max(1);
    let shard_len = users.len().div_ceil(shards).max(1);
    let (tx, rx) = unbounded::<ShardMessage>();

    thread::scope(|s| {
        for (shard, segment) in users.chunks(shard_len).enumerate() {
            let tx = tx.clone();
            s.spawn(move || {
                let mut patterns: Vec<Pattern> = template.iter().map(Pattern::fresh_copy).collect();
                let mut report = CountReport::for_users(segment);
                for user in segment {
                    if cancel.load(Ordering::Relaxed) {
                        let _ = tx.send(ShardMessage::Cancelled { shard });
                        return;
                    }
                    for pattern in patterns.iter_mut() {
                        count_one(pattern, std::slice::from_ref(user), &mut report);
                    }
                }
                let _ = tx.send(ShardMessage::Done {
                    shard,
                    patterns,
                    report,
                });
            });
        }
    });
    drop(tx);

    let mut done: Vec<(usize, Vec<Pattern>, CountReport)> = Vec::new();
    let mut cancelled = Vec::new();
    for message in rx.iter() {
        match message {
            ShardMessage::Done {
                shard,
                patterns,
                report,
            } => done.push((shard, patterns, report)),
            ShardMessage::Cancelled { shard } => cancelled.push(shard),
        }
    }

    if !cancelled.is_empty() {
        cancelled.sort_unstable();
        warn!(?cancelled, "counting cancelled, partial results discarded");
        return Err(MiningError::new(
            MiningErrorKind::Cancelled,
            format!("{} of {} shards cancelled", cancelled.len(), cancelled.len() + done.len()),
        ));
    }

    done.sort_by_key(|(shard, _, _)| *shard);
    let mut merged: Vec<Pattern> = template.iter().map(Pattern::fresh_copy).collect();
    let mut total = CountReport::default();
    for (_, partial, report) in &done {
        for (acc, p) in merged.iter_mut().zip(partial) {
            acc.merge(p)?;
        }
        total += *report;
    }

    info!(
        shards = done.len(),
        patterns = merged.len(),
        users = total.users,
        records = total.records,
        "sharded counting pass finished"
    );
    Ok((merged, total))
}
