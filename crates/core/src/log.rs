//! Audit-log entries.

use crate::Time;
use serde::{Deserialize, Serialize};

/// One append-only audit-log entry, externally sourced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp string, `%Y-%m-%d %H:%M`
    pub timestamp: String,

    /// Acting user
    pub username: String,

    /// Action performed
    pub action: String,

    /// Free-text details, typically `field = value` lines
    #[serde(default)]
    pub details: Option<String>,

    /// Associated record id, when the action touched one
    #[serde(default)]
    pub record: Option<String>,
}

impl LogEntry {
    /// Parsed timestamp, `None` when malformed.
    pub fn parsed_timestamp(&self) -> Option<Time> {
        Time::parse_from_str(self.timestamp.trim(), "%Y-%m-%d %H:%M").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_timestamp() {
        let log = LogEntry {
            timestamp: "2024-03-01 14:30".into(),
            username: "alice".into(),
            action: "Update record".into(),
            details: None,
            record: Some("101".into()),
        };
        let ts = log.parsed_timestamp().unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M").to_string(), "2024-03-01 14:30");
    }

    #[test]
    fn test_malformed_timestamp_is_none() {
        let log = LogEntry {
            timestamp: "yesterday".into(),
            username: "alice".into(),
            action: "Update record".into(),
            details: None,
            record: None,
        };
        assert!(log.parsed_timestamp().is_none());
    }
}
