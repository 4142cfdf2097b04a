//! Longitudinal study events.

use serde::{Deserialize, Serialize};

/// One named event in a longitudinal project.
///
/// Event order in `ProjectData::events` is the declared protocol
/// sequence; the temporal analyzer relies on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event name, as stored on records
    pub unique_event_name: String,

    /// Display label
    pub event_name: String,

    /// Study arm number
    pub arm_num: u32,

    /// Optional custom label
    #[serde(default)]
    pub custom_event_label: Option<String>,

    /// Expected day offset from baseline
    #[serde(default)]
    pub days_offset: Option<i64>,

    /// Lower bound of the visit window, in days from baseline
    #[serde(default)]
    pub offset_min: Option<i64>,

    /// Upper bound of the visit window, in days from baseline
    #[serde(default)]
    pub offset_max: Option<i64>,
}

impl Event {
    /// Display name, preferring the custom label.
    pub fn display_name(&self) -> &str {
        self.custom_event_label
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.event_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_custom_label() {
        let mut e = Event {
            unique_event_name: "visit_1_arm_1".into(),
            event_name: "Visit 1".into(),
            arm_num: 1,
            custom_event_label: None,
            days_offset: None,
            offset_min: None,
            offset_max: None,
        };
        assert_eq!(e.display_name(), "Visit 1");
        e.custom_event_label = Some("Month 3".into());
        assert_eq!(e.display_name(), "Month 3");
    }
}
