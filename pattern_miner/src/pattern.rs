use std::{collections::HashSet, fmt};

use itree_schema::{PatternRecord, Seconds};

use crate::{MiningError, MiningErrorKind, OnlineStat};

/// Separator of the canonical pattern key ("A,B,C").
pub const KEY_SEPARATOR: &str = ",";

pub fn pattern_key<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Scanning state of the user whose stream is currently being replayed.
#[derive(Debug, Clone, PartialEq)]
struct ScanState {
    user_id: String,
    user_created_time: Seconds,
    position: usize,
    last_event_time: Seconds,
    anchor_time: Seconds,
    in_flight_repeats: u64,
    completed_for_user: bool,
}

impl ScanState {
    fn start(user_id: &str, user_created_time: Seconds) -> Self {
        Self {
            user_id: user_id.to_string(),
            user_created_time,
            position: 0,
            last_event_time: user_created_time,
            anchor_time: user_created_time,
            in_flight_repeats: 0,
            completed_for_user: false,
        }
    }
}

/// An ordered, duplicate-free sequence of event names together with the
/// occurrence counters gathered by replaying user streams through it.
///
/// A user's stream is replayed with [`Pattern::reset_for_new_user`] followed by
/// one [`Pattern::count_for_event`] per record, in timestamp order. Matching is
/// by subsequence: unrelated events between two pattern positions are ignored.
#[derive(Debug, Clone)]
pub struct Pattern {
    names: Vec<String>,
    timings: Vec<OnlineStat>,
    repeats: Vec<OnlineStat>,
    count: u64,
    event_count: u64,
    user_count: u64,
    once_per_user_count: u64,
    scan: Option<ScanState>,
}

impl Pattern {
    pub fn new<S: AsRef<str>>(event_names: &[S]) -> Result<Self, MiningError> {
        if event_names.is_empty() {
            return Err(MiningError::new(
                MiningErrorKind::InvalidPattern,
                "pattern has no events",
            ));
        }

        let mut seen = HashSet::with_capacity(event_names.len());
        for name in event_names {
            let name = name.as_ref();
            if name.is_empty() {
                return Err(MiningError::new(
                    MiningErrorKind::InvalidPattern,
                    "pattern contains an empty event name",
                ));
            }
            if !seen.insert(name) {
                return Err(MiningError::new(
                    MiningErrorKind::InvalidPattern,
                    format!("duplicate event '{name}' in pattern {}", pattern_key(event_names)),
                )
                .with_event(name));
            }
        }

        let len = event_names.len();
        Ok(Self {
            names: event_names.iter().map(|s| s.as_ref().to_string()).collect(),
            timings: vec![OnlineStat::new(); len],
            repeats: vec![OnlineStat::new(); len],
            count: 0,
            event_count: 0,
            user_count: 0,
            once_per_user_count: 0,
            scan: None,
        })
    }

    pub fn event_names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn key(&self) -> String {
        pattern_key(&self.names)
    }

    pub fn last_event(&self) -> &str {
        self.names.last().map(String::as_str).unwrap_or_default()
    }

    pub fn timings(&self) -> &[OnlineStat] {
        &self.timings
    }

    pub fn repeats(&self) -> &[OnlineStat] {
        &self.repeats
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn user_count(&self) -> u64 {
        self.user_count
    }

    pub fn once_per_user_count(&self) -> u64 {
        self.once_per_user_count
    }

    /// Same event names, all counters zero, no active session.
    pub fn fresh_copy(&self) -> Self {
        let len = self.names.len();
        Self {
            names: self.names.clone(),
            timings: vec![OnlineStat::new(); len],
            repeats: vec![OnlineStat::new(); len],
            count: 0,
            event_count: 0,
            user_count: 0,
            once_per_user_count: 0,
            scan: None,
        }
    }

    pub fn reset_for_new_user(
        &mut self,
        user_id: &str,
        user_created_time: Seconds,
    ) -> Result<(), MiningError> {
        if user_id.is_empty() {
            return Err(MiningError::new(MiningErrorKind::InvalidUser, "empty user id")
                .with_timestamp(user_created_time));
        }
        if user_created_time <= 0 {
            return Err(MiningError::new(
                MiningErrorKind::InvalidUser,
                format!("user '{user_id}' has no creation time"),
            )
            .with_user(user_id)
            .with_timestamp(user_created_time));
        }

        self.scan = Some(ScanState::start(user_id, user_created_time));
        self.user_count += 1;
        Ok(())
    }

    /// Ends the active session. Counting again requires a new reset.
    pub fn finish_user(&mut self) {
        self.scan = None;
    }

    pub fn count_for_event(
        &mut self,
        event_name: &str,
        event_time: Seconds,
        user_id: &str,
        user_created_time: Seconds,
    ) -> Result<(), MiningError> {
        let Some(scan) = self.scan.as_mut() else {
            return Err(MiningError::new(
                MiningErrorKind::NotInitialized,
                format!("no active user session for pattern {}", pattern_key(&self.names)),
            )
            .with_user(user_id)
            .with_event(event_name));
        };

        if scan.user_id != user_id || scan.user_created_time != user_created_time {
            return Err(MiningError::new(
                MiningErrorKind::WrongUser,
                format!(
                    "event for user '{user_id}' (created {user_created_time}) while scanning user '{}' (created {})",
                    scan.user_id, scan.user_created_time
                ),
            )
            .with_user(user_id)
            .with_event(event_name));
        }

        if event_time < scan.last_event_time {
            return Err(MiningError::new(
                MiningErrorKind::OutOfOrder,
                format!(
                    "event at {event_time} precedes previous event at {}",
                    scan.last_event_time
                ),
            )
            .with_user(user_id)
            .with_event(event_name)
            .with_timestamp(event_time));
        }

        scan.last_event_time = event_time;
        self.event_count += 1;

        let position = scan.position;
        if event_name == self.names[position] {
            self.timings[position].observe((event_time - scan.anchor_time) as f64);
            if position > 0 {
                self.repeats[position - 1].observe(scan.in_flight_repeats as f64);
            }
            scan.in_flight_repeats = 1;
            scan.anchor_time = event_time;
            scan.position += 1;

            if scan.position == self.names.len() {
                self.repeats[position].observe(1.0);
                self.count += 1;
                if !scan.completed_for_user {
                    scan.completed_for_user = true;
                    self.once_per_user_count += 1;
                }
                scan.position = 0;
                scan.anchor_time = scan.user_created_time;
                scan.in_flight_repeats = 0;
            }
        } else if position > 0 && event_name == self.names[position - 1] {
            scan.in_flight_repeats += 1;
        }

        Ok(())
    }

    /// Folds a partial result for the same event names into `self`.
    pub fn merge(&mut self, other: &Pattern) -> Result<(), MiningError> {
        if self.names != other.names {
            return Err(MiningError::new(
                MiningErrorKind::Merge,
                format!(
                    "cannot merge pattern {} into {}",
                    other.key(),
                    self.key()
                ),
            ));
        }

        self.count += other.count;
        self.event_count += other.event_count;
        self.user_count += other.user_count;
        self.once_per_user_count += other.once_per_user_count;
        for (mine, theirs) in self.timings.iter_mut().zip(&other.timings) {
            mine.merge(theirs);
        }
        for (mine, theirs) in self.repeats.iter_mut().zip(&other.repeats) {
            mine.merge(theirs);
        }
        Ok(())
    }

    pub fn to_record(&self) -> PatternRecord {
        PatternRecord {
            event_names: self.names.clone(),
            count: self.count,
            event_count: self.event_count,
            user_count: self.user_count,
            once_per_user_count: self.once_per_user_count,
            timings: self.timings.iter().map(OnlineStat::to_record).collect(),
            repeats: self.repeats.iter().map(OnlineStat::to_record).collect(),
        }
    }

    /// Rebuilds a counted pattern. Missing stat lists are treated as empty stats.
    pub fn from_record(record: &PatternRecord) -> Result<Self, MiningError> {
        let mut pattern = Self::new(&record.event_names)?;
        let len = pattern.len();

        for (label, stats) in [("timings", &record.timings), ("repeats", &record.repeats)] {
            if !stats.is_empty() && stats.len() != len {
                return Err(MiningError::new(
                    MiningErrorKind::InvalidPattern,
                    format!(
                        "pattern {} has {} {label} for {len} events",
                        pattern.key(),
                        stats.len()
                    ),
                ));
            }
        }

        if !record.timings.is_empty() {
            pattern.timings = record.timings.iter().map(OnlineStat::from_record).collect();
        }
        if !record.repeats.is_empty() {
            pattern.repeats = record.repeats.iter().map(OnlineStat::from_record).collect();
        }
        pattern.count = record.count;
        pattern.event_count = record.event_count;
        pattern.user_count = record.user_count;
        pattern.once_per_user_count = record.once_per_user_count;
        Ok(pattern)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
