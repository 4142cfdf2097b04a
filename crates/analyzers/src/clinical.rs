//! Clinical analyzer: physiological plausibility and consistency.

use crate::base::{instrument_for, Analyzer, AnalyzerError, IssueBuilder};
use crate::config::ClinicalLimits;
use redqc_core::{value, Issue, IssueType, Priority, ProjectData, Record};

const SYSTOLIC_PATTERNS: &[&str] = &["systolic", "sbp"];
const DIASTOLIC_PATTERNS: &[&str] = &["diastolic", "dbp"];
const WEIGHT_PATTERNS: &[&str] = &["weight", "wt"];
const HEIGHT_PATTERNS: &[&str] = &["height", "stature"];
const BMI_PATTERNS: &[&str] = &["bmi"];
const AGE_PATTERNS: &[&str] = &["age"];
const BIRTH_PATTERNS: &[&str] = &["birth", "dob"];

/// Flags values outside physiological limits plus cross-field clinical
/// contradictions: blood-pressure inversions, BMI mismatches, negative
/// or extreme ages, future birth dates.
pub struct ClinicalAnalyzer {
    limits: ClinicalLimits,
}

impl ClinicalAnalyzer {
    /// Create with a physiological-limit library.
    pub fn new(limits: ClinicalLimits) -> Self {
        Self { limits }
    }

    fn check_physiological_limits(
        &self,
        issues: &mut Vec<Issue>,
        data: &ProjectData,
        record_id: &str,
        record: &Record,
    ) {
        for (field, raw) in &record.values {
            let Some(num) = value::parse_number(raw) else { continue };
            let Some((_, limit)) = self.limits.match_field(field) else { continue };
            if num < limit.min || num > limit.max {
                issues.push(
                    IssueBuilder::new(IssueType::PhysiologicallyImpossible, record_id, field)
                        .event(record.event_name())
                        .instrument(instrument_for(data, field))
                        .value(raw.as_str())
                        .explanation(format!(
                            "Value {num} {} in field '{field}' is outside the plausible \
                             range ({} to {} {}).",
                            limit.unit, limit.min, limit.max, limit.unit
                        ))
                        .suggested_action(
                            "Verify against the source document; likely a unit or typing error.",
                        )
                        .build(),
                );
            }
        }
    }

    fn check_blood_pressure(
        &self,
        issues: &mut Vec<Issue>,
        data: &ProjectData,
        record_id: &str,
        record: &Record,
    ) {
        let systolic = find_numeric(record, SYSTOLIC_PATTERNS);
        let diastolic = find_numeric(record, DIASTOLIC_PATTERNS);
        let (Some((sys_field, sys)), Some((dia_field, dia))) = (systolic, diastolic) else {
            return;
        };

        if dia >= sys {
            issues.push(
                IssueBuilder::new(IssueType::ClinicalClassificationMismatch, record_id, dia_field)
                    .event(record.event_name())
                    .instrument(instrument_for(data, dia_field))
                    .value(format!("{sys}/{dia}"))
                    .priority(Priority::High)
                    .explanation(format!(
                        "Diastolic pressure ({dia}) is greater than or equal to systolic \
                         pressure ({sys})."
                    ))
                    .suggested_action("Check whether the two values were swapped at entry.")
                    .build(),
            );
        } else if sys - dia < 10.0 {
            issues.push(
                IssueBuilder::new(IssueType::ClinicalClassificationMismatch, record_id, sys_field)
                    .event(record.event_name())
                    .instrument(instrument_for(data, sys_field))
                    .value(format!("{sys}/{dia}"))
                    .priority(Priority::Medium)
                    .explanation(format!(
                        "Pulse pressure of {} mmHg ({sys}/{dia}) is implausibly narrow.",
                        sys - dia
                    ))
                    .suggested_action("Confirm both readings against the source document.")
                    .build(),
            );
        }
    }

    fn check_bmi(
        &self,
        issues: &mut Vec<Issue>,
        data: &ProjectData,
        record_id: &str,
        record: &Record,
    ) {
        let (Some((weight_field, weight)), Some((_, height))) = (
            find_numeric(record, WEIGHT_PATTERNS),
            find_numeric(record, HEIGHT_PATTERNS),
        ) else {
            return;
        };
        if height <= 0.0 {
            return;
        }
        // Heights above 3 are assumed to be centimeters.
        let height_m = if height > 3.0 { height / 100.0 } else { height };
        let computed = weight / (height_m * height_m);

        if let Some((bmi_field, recorded)) = find_numeric(record, BMI_PATTERNS) {
            if (recorded - computed).abs() > 1.0 {
                issues.push(
                    IssueBuilder::new(IssueType::CalculatedFieldMismatch, record_id, bmi_field)
                        .event(record.event_name())
                        .instrument(instrument_for(data, bmi_field))
                        .value(format!("{recorded}"))
                        .explanation(format!(
                            "Recorded BMI: {recorded:.1}, calculated from weight and \
                             height: {computed:.1}."
                        ))
                        .suggested_action(
                            "Recalculate from weight and height and correct the stored value.",
                        )
                        .build(),
                );
            }
        }

        if !(10.0..=80.0).contains(&computed) {
            issues.push(
                IssueBuilder::new(IssueType::PhysiologicallyImpossible, record_id, weight_field)
                    .event(record.event_name())
                    .instrument(instrument_for(data, weight_field))
                    .value(format!("{weight}"))
                    .explanation(format!(
                        "BMI calculated from weight ({weight}) and height ({height}) is \
                         {computed:.1}, outside the plausible range."
                    ))
                    .suggested_action("Check weight and height units and values.")
                    .build(),
            );
        }
    }

    fn check_age(
        &self,
        issues: &mut Vec<Issue>,
        data: &ProjectData,
        record_id: &str,
        record: &Record,
    ) {
        let Some((field, age)) = find_numeric(record, AGE_PATTERNS) else { return };
        let explanation = if age < 0.0 {
            Some(format!("Age {age} is negative."))
        } else if age > 120.0 {
            Some(format!("Age {age} exceeds the plausible maximum of 120."))
        } else {
            None
        };
        if let Some(explanation) = explanation {
            issues.push(
                IssueBuilder::new(IssueType::PhysiologicallyImpossible, record_id, field)
                    .event(record.event_name())
                    .instrument(instrument_for(data, field))
                    .value(format!("{age}"))
                    .explanation(explanation)
                    .suggested_action("Verify against the date of birth.")
                    .build(),
            );
        }
    }

    fn check_birth_date(
        &self,
        issues: &mut Vec<Issue>,
        data: &ProjectData,
        record_id: &str,
        record: &Record,
        now: redqc_core::Time,
    ) {
        for (field, raw) in &record.values {
            let lower = field.to_lowercase();
            if !BIRTH_PATTERNS.iter().any(|p| lower.contains(p)) {
                continue;
            }
            let Some(t) = value::parse_date(raw) else { continue };
            if t > now {
                issues.push(
                    IssueBuilder::new(IssueType::PhysiologicallyImpossible, record_id, field)
                        .event(record.event_name())
                        .instrument(instrument_for(data, field))
                        .value(raw.as_str())
                        .explanation(format!("Birth date '{raw}' is in the future."))
                        .suggested_action("Correct the date of birth.")
                        .build(),
                );
            }
        }
    }
}

/// First non-empty numeric value in a field whose name contains one of
/// the given patterns.
fn find_numeric<'a>(record: &'a Record, patterns: &[&str]) -> Option<(&'a str, f64)> {
    for (field, raw) in &record.values {
        let lower = field.to_lowercase();
        if patterns.iter().any(|p| lower.contains(p)) {
            if let Some(num) = value::parse_number(raw) {
                return Some((field.as_str(), num));
            }
        }
    }
    None
}

impl Analyzer for ClinicalAnalyzer {
    fn name(&self) -> &'static str {
        "clinical"
    }

    fn analyze(&self, data: &ProjectData) -> Result<Vec<Issue>, AnalyzerError> {
        let mut issues = Vec::new();
        let record_id_field = data.record_id_field();
        let now = chrono::Local::now().naive_local();

        for record in &data.records {
            let record_id = record.get(record_id_field).unwrap_or("UNKNOWN");
            self.check_physiological_limits(&mut issues, data, record_id, record);
            self.check_blood_pressure(&mut issues, data, record_id, record);
            self.check_bmi(&mut issues, data, record_id, record);
            self.check_age(&mut issues, data, record_id, record);
            self.check_birth_date(&mut issues, data, record_id, record, now);
        }

        tracing::debug!(count = issues.len(), "clinical analysis complete");
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(records: Vec<Record>) -> Vec<Issue> {
        let data = ProjectData {
            records,
            ..ProjectData::default()
        };
        ClinicalAnalyzer::new(ClinicalLimits::default())
            .analyze(&data)
            .unwrap()
    }

    #[test]
    fn test_heart_rate_outside_limits() {
        let issues = run(vec![Record::from([
            ("record_id", "1"),
            ("heart_rate", "250"),
        ])]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::PhysiologicallyImpossible);
        assert_eq!(issues[0].priority, Priority::High);
        assert!(issues[0].explanation.contains("bpm"));
    }

    #[test]
    fn test_diastolic_above_systolic() {
        let issues = run(vec![Record::from([
            ("record_id", "1"),
            ("systolic_bp", "80"),
            ("diastolic_bp", "120"),
        ])]);
        let bp: Vec<_> = issues
            .iter()
            .filter(|i| i.issue_type == IssueType::ClinicalClassificationMismatch)
            .collect();
        assert_eq!(bp.len(), 1);
        // The inversion is raised against the diastolic reading.
        assert_eq!(bp[0].field, "diastolic_bp");
        assert_eq!(bp[0].value_found.as_deref(), Some("80/120"));
    }

    #[test]
    fn test_narrow_pulse_pressure() {
        let issues = run(vec![Record::from([
            ("record_id", "1"),
            ("systolic_bp", "120"),
            ("diastolic_bp", "115"),
        ])]);
        let bp: Vec<_> = issues
            .iter()
            .filter(|i| i.issue_type == IssueType::ClinicalClassificationMismatch)
            .collect();
        assert_eq!(bp.len(), 1);
        assert!(bp[0].explanation.contains("Pulse pressure"));
    }

    #[test]
    fn test_bmi_mismatch() {
        let issues = run(vec![Record::from([
            ("record_id", "1"),
            ("weight", "80"),
            ("height", "180"),
            ("bmi", "30"),
        ])]);
        // 80 / 1.8^2 = 24.7, recorded 30 differs by more than 1.
        let mismatch: Vec<_> = issues
            .iter()
            .filter(|i| i.issue_type == IssueType::CalculatedFieldMismatch)
            .collect();
        assert_eq!(mismatch.len(), 1);
        assert!(mismatch[0].explanation.contains("24.7"));
    }

    #[test]
    fn test_bmi_accepts_height_in_meters() {
        let issues = run(vec![Record::from([
            ("record_id", "1"),
            ("weight", "80"),
            ("height", "1,80"),
            ("bmi", "24.7"),
        ])]);
        assert!(issues
            .iter()
            .all(|i| i.issue_type != IssueType::CalculatedFieldMismatch));
    }

    #[test]
    fn test_negative_age() {
        let issues = run(vec![Record::from([("record_id", "1"), ("age", "-2")])]);
        // Both the limit table and the dedicated age check fire.
        assert!(issues
            .iter()
            .any(|i| i.explanation.contains("negative")));
    }

    #[test]
    fn test_future_birth_date() {
        let issues = run(vec![Record::from([
            ("record_id", "1"),
            ("date_of_birth", "2099-01-01"),
        ])]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].explanation.contains("future"));
    }

    #[test]
    fn test_plausible_record_is_clean() {
        let issues = run(vec![Record::from([
            ("record_id", "1"),
            ("heart_rate", "72"),
            ("systolic_bp", "120"),
            ("diastolic_bp", "80"),
            ("weight", "70"),
            ("height", "175"),
            ("age", "45"),
        ])]);
        assert!(issues.is_empty());
    }
}
