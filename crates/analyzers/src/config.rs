//! Analyzer configuration: check toggles, clinical limits, thresholds.

use serde::{Deserialize, Serialize};

/// Fields conventionally holding the baseline reference date, checked
/// before falling back to the earliest parseable date.
pub const BASELINE_DATE_FIELDS: &[&str] = &[
    "enrollment_date",
    "baseline_date",
    "consent_date",
    "study_start_date",
];

/// Terminal date fields; issues on these always carry High priority.
pub const CRITICAL_DATE_FIELDS: &[&str] = &["death_date", "withdrawal_date"];

/// Per-check toggles for the structural analyzer. All on by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralChecks {
    /// Required-but-empty
    pub required: bool,
    /// Declared numeric min/max
    pub range: bool,
    /// Validation-type format
    pub format: bool,
    /// Enumerated choice codes
    pub choices: bool,
    /// Populated despite hidden by conditional logic
    pub branching: bool,
}

impl Default for StructuralChecks {
    fn default() -> Self {
        Self {
            required: true,
            range: true,
            format: true,
            choices: true,
            branching: true,
        }
    }
}

/// One physiological limit: plausible bounds plus display unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalLimit {
    /// Minimum plausible value
    pub min: f64,
    /// Maximum plausible value
    pub max: f64,
    /// Display unit
    pub unit: String,
}

/// Physiological-limit library keyed by semantic field pattern.
///
/// A record field matches a pattern when either name contains the
/// other, case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalLimits {
    limits: Vec<(String, ClinicalLimit)>,
}

impl ClinicalLimits {
    /// Empty library.
    pub fn empty() -> Self {
        Self { limits: Vec::new() }
    }

    /// Add or replace a limit pattern.
    pub fn set(&mut self, pattern: impl Into<String>, min: f64, max: f64, unit: &str) {
        let pattern = pattern.into();
        let limit = ClinicalLimit {
            min,
            max,
            unit: unit.to_string(),
        };
        if let Some(entry) = self.limits.iter_mut().find(|(p, _)| *p == pattern) {
            entry.1 = limit;
        } else {
            self.limits.push((pattern, limit));
        }
    }

    /// First limit whose pattern matches the field name.
    pub fn match_field(&self, field_name: &str) -> Option<(&str, &ClinicalLimit)> {
        let field_lower = field_name.to_lowercase();
        self.limits
            .iter()
            .find(|(pattern, _)| {
                let p = pattern.to_lowercase();
                field_lower.contains(&p) || p.contains(&field_lower)
            })
            .map(|(p, l)| (p.as_str(), l))
    }
}

impl Default for ClinicalLimits {
    fn default() -> Self {
        let mut limits = ClinicalLimits::empty();
        // Vital signs
        limits.set("systolic_bp", 50.0, 250.0, "mmHg");
        limits.set("diastolic_bp", 30.0, 150.0, "mmHg");
        limits.set("heart_rate", 30.0, 220.0, "bpm");
        limits.set("respiratory_rate", 8.0, 40.0, "rpm");
        limits.set("temperature", 32.0, 42.0, "C");
        limits.set("oxygen_saturation", 50.0, 100.0, "%");
        // Anthropometry
        limits.set("weight", 0.5, 300.0, "kg");
        limits.set("height", 30.0, 250.0, "cm");
        limits.set("age", 0.0, 120.0, "years");
        // Laboratory
        limits.set("glucose", 20.0, 1000.0, "mg/dL");
        limits.set("hemoglobin", 3.0, 20.0, "g/dL");
        limits.set("creatinine", 0.1, 30.0, "mg/dL");
        limits.set("potassium", 1.5, 10.0, "mEq/L");
        limits.set("sodium", 100.0, 180.0, "mEq/L");
        limits
    }
}

/// Operational (audit-log) analyzer thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationalConfig {
    /// Edits within the window that count as a spike
    pub edit_threshold: usize,
    /// Spike window size, in hours
    pub window_hours: i64,
}

impl Default for OperationalConfig {
    fn default() -> Self {
        Self {
            edit_threshold: 10,
            window_hours: 1,
        }
    }
}

/// The full configuration set enumerating which checks are active.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChecksConfig {
    /// Structural per-check toggles
    pub structural: StructuralChecks,
    /// Disable the temporal analyzer
    pub skip_temporal: bool,
    /// Disable the clinical analyzer
    pub skip_clinical: bool,
    /// Disable the operational analyzer
    pub skip_operational: bool,
    /// Clinical limit library (defaults overridable per protocol)
    pub clinical_limits: ClinicalLimits,
    /// Operational thresholds
    pub operational: OperationalConfig,
}
