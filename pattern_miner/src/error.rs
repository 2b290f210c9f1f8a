use std::fmt;

use itree_schema::Seconds;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningErrorKind {
    InvalidPattern,
    InvalidUser,
    NotInitialized,
    WrongUser,
    OutOfOrder,
    GoalNotFound,
    Io,
    Parse,
    Cancelled,
    Merge,
}

impl MiningErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPattern => "InvalidPattern",
            Self::InvalidUser => "InvalidUser",
            Self::NotInitialized => "NotInitialized",
            Self::WrongUser => "WrongUser",
            Self::OutOfOrder => "OutOfOrder",
            Self::GoalNotFound => "GoalNotFound",
            Self::Io => "Io",
            Self::Parse => "Parse",
            Self::Cancelled => "Cancelled",
            Self::Merge => "Merge",
        }
    }
}

impl fmt::Display for MiningErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone)]
#[error("{kind}: {message}{}", line_suffix(.line))]
pub struct MiningError {
    pub kind: MiningErrorKind,
    pub message: String,

    // Optional context; message stays the source of truth.
    pub user_id: Option<String>,
    pub event_name: Option<String>,
    pub timestamp: Option<Seconds>,
    pub line: Option<usize>,
    pub file: Option<String>,
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" (line {line})"),
        None => String::new(),
    }
}

impl MiningError {
    pub(crate) fn new(kind: MiningErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            user_id: None,
            event_name: None,
            timestamp: None,
            line: None,
            file: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_event(mut self, event_name: impl Into<String>) -> Self {
        self.event_name = Some(event_name.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: Seconds) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_appends_line_only_when_known() {
        let err = MiningError::new(MiningErrorKind::Parse, "bad json");
        assert_eq!(err.to_string(), "Parse: bad json");

        let err = err.with_line(7).with_file("events.jsonl");
        assert_eq!(err.to_string(), "Parse: bad json (line 7)");
        assert_eq!(err.file.as_deref(), Some("events.jsonl"));
    }
}
