//! Captured data rows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known record key carrying the event name.
pub const EVENT_KEY: &str = "redcap_event_name";

/// Well-known record key carrying the repeating-instrument name.
pub const REPEAT_INSTRUMENT_KEY: &str = "redcap_repeat_instrument";

/// Well-known record key carrying the repeating-instance number.
pub const REPEAT_INSTANCE_KEY: &str = "redcap_repeat_instance";

/// One row of captured data: field name → raw value.
///
/// Values are always strings as exported; empty string and absent key
/// are both treated as empty. Many records share a record id across
/// events and repeat instances.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    /// Raw values keyed by field name
    pub values: BTreeMap<String, String>,
}

impl Record {
    /// Raw value for a field, if present.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(|s| s.as_str())
    }

    /// Event name, empty for classic (non-longitudinal) projects.
    pub fn event_name(&self) -> &str {
        self.get(EVENT_KEY).unwrap_or("")
    }

    /// Repeating-instrument name, if this row belongs to one.
    pub fn repeat_instrument(&self) -> Option<&str> {
        self.get(REPEAT_INSTRUMENT_KEY).filter(|v| !v.is_empty())
    }

    /// Repeating-instance number, if parseable.
    pub fn repeat_instance(&self) -> Option<u32> {
        self.get(REPEAT_INSTANCE_KEY)?.trim().parse().ok()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Record {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Record {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_keys() {
        let r = Record::from([
            ("record_id", "101"),
            (EVENT_KEY, "baseline_arm_1"),
            (REPEAT_INSTRUMENT_KEY, "adverse_events"),
            (REPEAT_INSTANCE_KEY, "2"),
        ]);
        assert_eq!(r.get("record_id"), Some("101"));
        assert_eq!(r.event_name(), "baseline_arm_1");
        assert_eq!(r.repeat_instrument(), Some("adverse_events"));
        assert_eq!(r.repeat_instance(), Some(2));
    }

    #[test]
    fn test_missing_keys() {
        let r = Record::default();
        assert_eq!(r.get("anything"), None);
        assert_eq!(r.event_name(), "");
        assert_eq!(r.repeat_instrument(), None);
        assert_eq!(r.repeat_instance(), None);
    }
}
