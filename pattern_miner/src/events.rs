use std::{fs, path::Path};

use itree_schema::{EventRecord, PatternRecord, Seconds};

use crate::{MiningError, MiningErrorKind, Pattern};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub timestamp: Seconds,
    /// Creation time as written on this record; normally equal to the segment's.
    pub user_created_time: Seconds,
}

/// One user's chronological segment of the sorted event file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEvents {
    pub user_id: String,
    pub user_created_time: Seconds,
    pub events: Vec<Event>,
}

/// Splits a per-user sorted record stream at `user_id` boundaries.
pub fn group_by_user(records: impl IntoIterator<Item = EventRecord>) -> Vec<UserEvents> {
    let mut users: Vec<UserEvents> = Vec::new();
    for rec in records {
        let event = Event {
            name: rec.event_name,
            timestamp: rec.event_timestamp,
            user_created_time: rec.user_created_timestamp,
        };
        match users.last_mut() {
            Some(current) if current.user_id == rec.user_id => current.events.push(event),
            _ => users.push(UserEvents {
                user_id: rec.user_id,
                user_created_time: rec.user_created_timestamp,
                events: vec![event],
            }),
        }
    }
    users
}

/// Reads a JSON-lines event file. Blank lines are ignored.
pub fn read_event_file(path: impl AsRef<Path>) -> Result<Vec<EventRecord>, MiningError> {
    read_json_lines(path.as_ref(), "event")
}

/// Reads JSON-lines pattern records, as written by the `mine` command.
pub fn read_pattern_file(path: impl AsRef<Path>) -> Result<Vec<Pattern>, MiningError> {
    let path = path.as_ref();
    let records: Vec<PatternRecord> = read_json_lines(path, "pattern")?;
    records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            Pattern::from_record(rec).map_err(|e| {
                e.with_file(path.display().to_string()).with_line(i + 1)
            })
        })
        .collect()
}

fn read_json_lines<T: serde::de::DeserializeOwned>(
    path: &Path,
    what: &str,
) -> Result<Vec<T>, MiningError> {
    let src = fs::read_to_string(path).map_err(|e| {
        MiningError::new(MiningErrorKind::Io, format!("failed to read {what} file: {e}"))
            .with_file(path.display().to_string())
    })?;

    let mut out = Vec::new();
    for (idx, line) in src.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = serde_json::from_str(line).map_err(|e| {
            MiningError::new(MiningErrorKind::Parse, format!("invalid {what} record: {e}"))
                .with_file(path.display().to_string())
                .with_line(idx + 1)
        })?;
        out.push(value);
    }
    Ok(out)
}
