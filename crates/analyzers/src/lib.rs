//! Data-quality analyzers.
//!
//! Five specialized analyzers walk the project dataset and emit a
//! uniform issue stream: structural (per-field validation), temporal
//! (cross-event chronology), clinical (physiological plausibility),
//! operational (audit-log anomalies), and custom rules (user-authored).

#![warn(missing_docs)]

mod base;
pub mod config;

mod structural;
mod temporal;
mod clinical;
mod operational;
mod custom_rules;

pub use base::{Analyzer, AnalyzerError, IssueBuilder};
pub use config::{ChecksConfig, ClinicalLimit, ClinicalLimits, OperationalConfig, StructuralChecks};
pub use structural::StructuralAnalyzer;
pub use temporal::TemporalAnalyzer;
pub use clinical::ClinicalAnalyzer;
pub use operational::OperationalAnalyzer;
pub use custom_rules::CustomRulesAnalyzer;
