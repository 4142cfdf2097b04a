//! Issues (queries): the canonical engine output.

use serde::{Deserialize, Serialize};

/// Issue priority, a fixed closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Study-integrity or participant-safety risk
    High,
    /// Inconsistent but not safety-relevant
    Medium,
    /// Cosmetic or supplementary
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        f.write_str(s)
    }
}

/// Remediation-effort classification, a fixed closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationEffort {
    /// Fill in or correct a single value
    Simple,
    /// Needs a look at related fields
    Moderate,
    /// Needs detailed investigation
    Complex,
}

impl std::fmt::Display for RemediationEffort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RemediationEffort::Simple => "Simple",
            RemediationEffort::Moderate => "Moderate",
            RemediationEffort::Complex => "Complex",
        };
        f.write_str(s)
    }
}

/// Issue-type codes emitted by the analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// Required field is visible but empty
    RequiredFieldEmpty,
    /// Numeric value outside the declared min/max
    ValueOutOfRange,
    /// Value does not match its validation format
    InvalidFormat,
    /// Code not in the declared choice list
    InvalidChoice,
    /// Populated despite being hidden by conditional logic
    FieldShouldBeEmpty,
    /// Date earlier than the previous event's latest date
    DateOutOfOrder,
    /// Follow-up date earlier than baseline
    FollowupBeforeBaseline,
    /// Date outside the expected visit window
    EventOutOfTimeline,
    /// Date after the recorded death date
    DeathDateInconsistent,
    /// Gap in repeating-instrument instance numbering
    RepeatingSequenceBroken,
    /// Value outside physiological limits
    PhysiologicallyImpossible,
    /// Cross-field clinical values disagree
    ClinicalClassificationMismatch,
    /// Recorded computed field differs from recalculation
    CalculatedFieldMismatch,
    /// Audit-log anomaly (spikes, off-hours, correction churn)
    SuspiciousEditPattern,
    /// Per-user edit-volume outlier
    HighEditVolume,
    /// Violation of a user-authored rule
    CustomRuleViolation,
}

impl IssueType {
    /// Machine code, identical to the serde representation.
    pub fn code(&self) -> &'static str {
        match self {
            IssueType::RequiredFieldEmpty => "required_field_empty",
            IssueType::ValueOutOfRange => "value_out_of_range",
            IssueType::InvalidFormat => "invalid_format",
            IssueType::InvalidChoice => "invalid_choice",
            IssueType::FieldShouldBeEmpty => "field_should_be_empty",
            IssueType::DateOutOfOrder => "date_out_of_order",
            IssueType::FollowupBeforeBaseline => "followup_before_baseline",
            IssueType::EventOutOfTimeline => "event_out_of_timeline",
            IssueType::DeathDateInconsistent => "death_date_inconsistent",
            IssueType::RepeatingSequenceBroken => "repeating_sequence_broken",
            IssueType::PhysiologicallyImpossible => "physiologically_impossible",
            IssueType::ClinicalClassificationMismatch => "clinical_classification_mismatch",
            IssueType::CalculatedFieldMismatch => "calculated_field_mismatch",
            IssueType::SuspiciousEditPattern => "suspicious_edit_pattern",
            IssueType::HighEditVolume => "high_edit_volume",
            IssueType::CustomRuleViolation => "custom_rule_violation",
        }
    }

    /// Short human description.
    pub fn description(&self) -> &'static str {
        match self {
            IssueType::RequiredFieldEmpty => "Required field empty",
            IssueType::ValueOutOfRange => "Value outside allowed range",
            IssueType::InvalidFormat => "Invalid format",
            IssueType::InvalidChoice => "Code not in choice list",
            IssueType::FieldShouldBeEmpty => "Field populated but hidden by branching logic",
            IssueType::DateOutOfOrder => "Date out of chronological order",
            IssueType::FollowupBeforeBaseline => "Follow-up before baseline",
            IssueType::EventOutOfTimeline => "Event outside expected window",
            IssueType::DeathDateInconsistent => "Date inconsistent with death date",
            IssueType::RepeatingSequenceBroken => "Repeating-instrument sequence broken",
            IssueType::PhysiologicallyImpossible => "Physiologically impossible value",
            IssueType::ClinicalClassificationMismatch => "Clinical classification mismatch",
            IssueType::CalculatedFieldMismatch => "Calculated field mismatch",
            IssueType::SuspiciousEditPattern => "Suspicious edit pattern",
            IssueType::HighEditVolume => "High edit volume",
            IssueType::CustomRuleViolation => "Custom rule violation",
        }
    }

    /// Remediation-effort class assigned when not explicitly overridden.
    pub fn default_effort(&self) -> RemediationEffort {
        match self {
            IssueType::RequiredFieldEmpty
            | IssueType::InvalidChoice
            | IssueType::InvalidFormat
            | IssueType::ValueOutOfRange => RemediationEffort::Simple,
            IssueType::PhysiologicallyImpossible
            | IssueType::ClinicalClassificationMismatch
            | IssueType::DeathDateInconsistent
            | IssueType::SuspiciousEditPattern
            | IssueType::RepeatingSequenceBroken => RemediationEffort::Complex,
            _ => RemediationEffort::Moderate,
        }
    }

    /// Remediation guidance attached when the analyzer supplies none.
    pub fn default_guidance(&self) -> &'static str {
        match self {
            IssueType::RequiredFieldEmpty => {
                "Fill in the missing value. Consult the primary data source or contact the participant."
            }
            IssueType::InvalidChoice => {
                "Correct the invalid code to a valid option. Check the option list in the data dictionary."
            }
            IssueType::InvalidFormat => {
                "Adjust the value's format (e.g. date, number). Check the expected format in the data dictionary."
            }
            IssueType::ValueOutOfRange => {
                "Verify the value against the primary source. If correct, document the exception in the comments field."
            }
            IssueType::DateOutOfOrder => {
                "Review the event chronology. Check whether dates were swapped or the event was entered on the wrong form."
            }
            IssueType::FollowupBeforeBaseline => {
                "Check whether the follow-up date is correct or the baseline needs correction."
            }
            IssueType::EventOutOfTimeline => {
                "Document the protocol deviation, or correct the date if it is a typo."
            }
            IssueType::FieldShouldBeEmpty => {
                "Remove the value or correct the related conditional field."
            }
            IssueType::CalculatedFieldMismatch => {
                "Verify the source values and recalculate. May indicate a data-entry error."
            }
            IssueType::PhysiologicallyImpossible => {
                "Needs detailed investigation. Verify with the clinical team and the primary source."
            }
            IssueType::ClinicalClassificationMismatch => {
                "Review the related clinical values. Values may have been swapped."
            }
            IssueType::DeathDateInconsistent => {
                "Critical investigation. Verify the medical chart and official records."
            }
            IssueType::SuspiciousEditPattern => {
                "Audit the edits. Verify with the user responsible for the changes."
            }
            IssueType::RepeatingSequenceBroken => {
                "Check the repeating-instrument sequence. May indicate missing data."
            }
            _ => "Verify the value and correct as needed.",
        }
    }

    /// Priority assigned when the analyzer does not override it.
    pub fn default_priority(&self) -> Priority {
        match self {
            IssueType::RequiredFieldEmpty
            | IssueType::PhysiologicallyImpossible
            | IssueType::DeathDateInconsistent
            | IssueType::FollowupBeforeBaseline => Priority::High,
            IssueType::FieldShouldBeEmpty => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One detected data-quality violation, immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Participant record id
    pub record_id: String,

    /// Event name, `"N/A"` when not event-scoped
    pub event: String,

    /// Instrument (form) name
    pub instrument: String,

    /// Field name
    pub field: String,

    /// Observed value, if any
    pub value_found: Option<String>,

    /// Issue-type code
    pub issue_type: IssueType,

    /// Technical explanation
    pub explanation: String,

    /// Priority
    pub priority: Priority,

    /// Optional correction suggestion
    #[serde(default)]
    pub suggested_action: Option<String>,

    /// Remediation-effort class
    pub remediation_effort: RemediationEffort,

    /// Remediation guidance
    pub remediation_details: String,

    /// Optional deep link into the source system
    #[serde(default)]
    pub link: Option<String>,
}
