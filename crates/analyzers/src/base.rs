//! Shared analyzer behavior: the capability trait and the issue builder.

use crate::config::CRITICAL_DATE_FIELDS;
use redqc_core::{Issue, IssueType, Priority, ProjectData, RemediationEffort};

/// Errors surfaced by an analyzer. Individual check failures never
/// abort a pass; this is reserved for whole-analyzer breakage so the
/// orchestrator can report an incomplete run and keep going.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// The analyzer could not complete its pass
    #[error("{0}")]
    Failed(String),
}

/// A data-quality analyzer: one full batch pass over the dataset.
pub trait Analyzer {
    /// Stable analyzer name, used in failure reporting.
    fn name(&self) -> &'static str;

    /// Run the pass and return every detected issue.
    fn analyze(&self, data: &ProjectData) -> Result<Vec<Issue>, AnalyzerError>;
}

/// Builder for [`Issue`] shared by all analyzers.
///
/// Auto-assigns the remediation-effort class, the guidance text, and
/// the priority from the issue-type lookup tables unless explicitly
/// overridden. Fields named in the critical-date list always escalate
/// to High.
pub struct IssueBuilder {
    issue_type: IssueType,
    record_id: String,
    event: String,
    instrument: String,
    field: String,
    value_found: Option<String>,
    explanation: String,
    priority: Option<Priority>,
    suggested_action: Option<String>,
    effort: Option<RemediationEffort>,
    details: Option<String>,
}

impl IssueBuilder {
    /// Start an issue of the given type for a (record, field) pair.
    pub fn new(
        issue_type: IssueType,
        record_id: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            issue_type,
            record_id: record_id.into(),
            event: String::new(),
            instrument: String::new(),
            field: field.into(),
            value_found: None,
            explanation: String::new(),
            priority: None,
            suggested_action: None,
            effort: None,
            details: None,
        }
    }

    /// Set the event name.
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    /// Set the instrument (form) name.
    pub fn instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = instrument.into();
        self
    }

    /// Set the observed value.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value_found = Some(value.into());
        self
    }

    /// Set the observed value from an optional raw value.
    pub fn value_opt(mut self, value: Option<&str>) -> Self {
        self.value_found = value.map(|v| v.to_string());
        self
    }

    /// Set the explanation text.
    pub fn explanation(mut self, text: impl Into<String>) -> Self {
        self.explanation = text.into();
        self
    }

    /// Override the auto-assigned priority.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the suggested correction.
    pub fn suggested_action(mut self, action: impl Into<String>) -> Self {
        self.suggested_action = Some(action.into());
        self
    }

    /// Finalize, applying lookup-table defaults.
    pub fn build(self) -> Issue {
        let priority = if CRITICAL_DATE_FIELDS.contains(&self.field.as_str()) {
            Priority::High
        } else {
            self.priority
                .unwrap_or_else(|| self.issue_type.default_priority())
        };

        Issue {
            record_id: self.record_id,
            event: if self.event.is_empty() {
                "N/A".to_string()
            } else {
                self.event
            },
            instrument: if self.instrument.is_empty() {
                "N/A".to_string()
            } else {
                self.instrument
            },
            field: self.field,
            value_found: self.value_found,
            issue_type: self.issue_type,
            explanation: self.explanation,
            priority,
            suggested_action: self.suggested_action,
            remediation_effort: self
                .effort
                .unwrap_or_else(|| self.issue_type.default_effort()),
            remediation_details: self
                .details
                .unwrap_or_else(|| self.issue_type.default_guidance().to_string()),
            link: None,
        }
    }
}

/// Instrument name for a field, `"N/A"` when the metadata is missing.
pub(crate) fn instrument_for<'a>(data: &'a ProjectData, field: &str) -> &'a str {
    data.field(field).map(|f| f.form_name.as_str()).unwrap_or("N/A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_applies_defaults() {
        let issue = IssueBuilder::new(IssueType::RequiredFieldEmpty, "101", "age")
            .event("baseline_arm_1")
            .instrument("demographics")
            .explanation("Field 'Age' is required but empty.")
            .build();

        assert_eq!(issue.priority, Priority::High);
        assert_eq!(issue.remediation_effort, RemediationEffort::Simple);
        assert!(issue.remediation_details.contains("missing value"));
        assert_eq!(issue.event, "baseline_arm_1");
    }

    #[test]
    fn test_builder_empty_event_becomes_na() {
        let issue = IssueBuilder::new(IssueType::SuspiciousEditPattern, "101", "edit_timing").build();
        assert_eq!(issue.event, "N/A");
        assert_eq!(issue.instrument, "N/A");
    }

    #[test]
    fn test_critical_date_field_escalates_priority() {
        let issue = IssueBuilder::new(IssueType::InvalidFormat, "101", "death_date")
            .priority(Priority::Low)
            .build();
        assert_eq!(issue.priority, Priority::High);
    }

    #[test]
    fn test_priority_override() {
        let issue = IssueBuilder::new(IssueType::InvalidFormat, "101", "age")
            .priority(Priority::Low)
            .build();
        assert_eq!(issue.priority, Priority::Low);
    }
}
