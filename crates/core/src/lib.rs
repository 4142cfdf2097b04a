//! redqc core data models.
//!
//! This crate defines the data structures shared by every analyzer:
//! field metadata, events, records, audit-log entries, custom rules,
//! and the issues (queries) the engine emits.

#![warn(missing_docs)]

// Project metadata
mod field;
mod event;

// Captured data
mod record;
mod log;

// Rules and engine output
mod rule;
mod issue;
mod report;

// Shared parsing primitives
pub mod value;

mod dataset;

pub use field::{FieldDefinition, FieldType};
pub use event::Event;
pub use record::{Record, EVENT_KEY, REPEAT_INSTANCE_KEY, REPEAT_INSTRUMENT_KEY};
pub use log::LogEntry;
pub use rule::{json_to_string, ConditionSpec, CustomRule, RuleOperator, RuleType, ALL_FIELDS};
pub use issue::{Issue, IssueType, Priority, RemediationEffort};
pub use report::{ProjectSummary, QualityReport};
pub use dataset::ProjectData;

/// Timestamp type used across the engine. Source exports carry no
/// timezone, so everything is naive local time.
pub type Time = chrono::NaiveDateTime;
