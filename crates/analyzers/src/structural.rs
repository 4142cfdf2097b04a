//! Structural analyzer: per-field validation against the dictionary.

use crate::base::{Analyzer, AnalyzerError, IssueBuilder};
use crate::config::StructuralChecks;
use redqc_core::{value, FieldDefinition, Issue, IssueType, Record};
use regex::Regex;
use std::sync::OnceLock;

const NUMERIC_VALIDATIONS: &[&str] = &["number", "integer", "number_1dp", "number_2dp"];
const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const PHONE_PATTERN: &str = r"^[\d\s\-\(\)\+]+$";

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static PHONE_RE: OnceLock<Regex> = OnceLock::new();

// Both patterns are literals; compilation cannot fail at runtime.
fn cached_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern"))
}

/// Detects required-but-empty fields, out-of-range values, format
/// violations, invalid choice codes, and branching-logic violations.
/// Each check is individually toggle-able.
pub struct StructuralAnalyzer {
    checks: StructuralChecks,
}

impl StructuralAnalyzer {
    /// Create with the given toggles.
    pub fn new(checks: StructuralChecks) -> Self {
        Self { checks }
    }

    fn check_required(
        &self,
        issues: &mut Vec<Issue>,
        record_id: &str,
        event: &str,
        field: &FieldDefinition,
        raw: Option<&str>,
        should_exist: bool,
    ) {
        if !field.required || !should_exist || !value::is_empty(raw) {
            return;
        }
        issues.push(
            IssueBuilder::new(IssueType::RequiredFieldEmpty, record_id, &field.field_name)
                .event(event)
                .instrument(&field.form_name)
                .value_opt(raw)
                .explanation(format!(
                    "Field '{}' is required but empty.",
                    field.field_label
                ))
                .suggested_action("Fill in the field with a valid value.")
                .build(),
        );
    }

    fn check_range(
        &self,
        issues: &mut Vec<Issue>,
        record_id: &str,
        event: &str,
        field: &FieldDefinition,
        raw: Option<&str>,
        should_exist: bool,
    ) {
        if value::is_empty(raw) || !should_exist {
            return;
        }
        let validation = field.validation.as_deref().unwrap_or("");
        if !NUMERIC_VALIDATIONS.contains(&validation) {
            return;
        }
        let raw = raw.unwrap_or("");
        let Some(num) = value::parse_number(raw) else {
            return; // left to the format check
        };

        let min = field.min.as_deref().and_then(value::parse_number);
        let max = field.max.as_deref().and_then(value::parse_number);

        let violation = match (min, max) {
            (Some(min), _) if num < min => Some(format!("below the allowed minimum ({min})")),
            (_, Some(max)) if num > max => Some(format!("above the allowed maximum ({max})")),
            _ => None,
        };

        if let Some(violation) = violation {
            let range = format!(
                "{} to {}",
                field.min.as_deref().unwrap_or("N/A"),
                field.max.as_deref().unwrap_or("N/A")
            );
            issues.push(
                IssueBuilder::new(IssueType::ValueOutOfRange, record_id, &field.field_name)
                    .event(event)
                    .instrument(&field.form_name)
                    .value(raw)
                    .explanation(format!(
                        "Value '{raw}' in field '{}' is {violation}.",
                        field.field_label
                    ))
                    .suggested_action(format!(
                        "Verify and correct the value. Allowed range: {range}."
                    ))
                    .build(),
            );
        }
    }

    fn check_format(
        &self,
        issues: &mut Vec<Issue>,
        record_id: &str,
        event: &str,
        field: &FieldDefinition,
        raw: Option<&str>,
        should_exist: bool,
    ) {
        if value::is_empty(raw) || !should_exist {
            return;
        }
        let Some(validation) = field.validation.as_deref() else {
            return;
        };
        let raw = raw.unwrap_or("");

        let expected = match validation {
            "date_ymd" | "date_mdy" | "date_dmy" => {
                (value::parse_date(raw).is_none()).then_some("a valid date (e.g. 2024-01-15)")
            }
            "datetime_ymd" | "datetime_mdy" | "datetime_dmy" | "datetime_seconds_ymd" => {
                (value::parse_date(raw).is_none())
                    .then_some("a valid date/time (e.g. 2024-01-15 14:30)")
            }
            "integer" => (value::parse_integer(raw).is_none()).then_some("an integer"),
            "number" | "number_1dp" | "number_2dp" => {
                (value::parse_number(raw).is_none()).then_some("a decimal number")
            }
            "email" => {
                (!cached_regex(&EMAIL_RE, EMAIL_PATTERN).is_match(raw.trim()))
                    .then_some("a valid email address")
            }
            "phone" => {
                (!cached_regex(&PHONE_RE, PHONE_PATTERN).is_match(raw.trim()))
                    .then_some("a valid phone number")
            }
            _ => None,
        };

        if let Some(expected) = expected {
            issues.push(
                IssueBuilder::new(IssueType::InvalidFormat, record_id, &field.field_name)
                    .event(event)
                    .instrument(&field.form_name)
                    .value(raw)
                    .explanation(format!(
                        "Value '{raw}' in field '{}' does not match the expected format: {expected}.",
                        field.field_label
                    ))
                    .suggested_action(format!("Correct the value to the format: {expected}."))
                    .build(),
            );
        }
    }

    fn check_choices(
        &self,
        issues: &mut Vec<Issue>,
        record_id: &str,
        event: &str,
        field: &FieldDefinition,
        raw: Option<&str>,
        should_exist: bool,
    ) {
        if value::is_empty(raw) || !should_exist {
            return;
        }
        if !matches!(
            field.field_type,
            redqc_core::FieldType::Dropdown | redqc_core::FieldType::Radio
        ) {
            return;
        }
        let choices = field.parsed_choices();
        if choices.is_empty() {
            return;
        }
        let raw = raw.unwrap_or("").trim();
        if choices.iter().any(|(code, _)| code == raw) {
            return;
        }

        let mut valid_options: String = choices
            .iter()
            .take(5)
            .map(|(code, label)| format!("{code}={label}"))
            .collect::<Vec<_>>()
            .join(", ");
        if choices.len() > 5 {
            valid_options.push_str(&format!("... (+{} options)", choices.len() - 5));
        }

        issues.push(
            IssueBuilder::new(IssueType::InvalidChoice, record_id, &field.field_name)
                .event(event)
                .instrument(&field.form_name)
                .value(raw)
                .explanation(format!(
                    "Value '{raw}' in field '{}' is not a valid option.",
                    field.field_label
                ))
                .suggested_action(format!("Correct to a valid option: {valid_options}."))
                .build(),
        );
    }

    fn check_branching_violation(
        &self,
        issues: &mut Vec<Issue>,
        record_id: &str,
        event: &str,
        field: &FieldDefinition,
        raw: Option<&str>,
        should_exist: bool,
    ) {
        if !field.has_branching_logic() {
            return;
        }
        if value::is_empty(raw) || should_exist {
            return;
        }
        issues.push(
            IssueBuilder::new(IssueType::FieldShouldBeEmpty, record_id, &field.field_name)
                .event(event)
                .instrument(&field.form_name)
                .value_opt(raw)
                .explanation(format!(
                    "Field '{}' is populated but should be hidden by its conditional logic: {}",
                    field.field_label,
                    field.branching_logic.as_deref().unwrap_or("")
                ))
                .suggested_action(
                    "Check whether the value should be removed or related fields need correction.",
                )
                .build(),
        );
    }
}

impl Analyzer for StructuralAnalyzer {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn analyze(&self, data: &redqc_core::ProjectData) -> Result<Vec<Issue>, AnalyzerError> {
        let mut issues = Vec::new();
        let record_id_field = data.record_id_field();

        for record in &data.records {
            let record_id = record.get(record_id_field).unwrap_or("UNKNOWN");
            let event = record.event_name();

            for field in &data.metadata {
                if field.field_name == record_id_field {
                    continue;
                }
                let raw = record.get(&field.field_name);
                let should_exist = should_exist(field, record);

                if self.checks.required {
                    self.check_required(&mut issues, record_id, event, field, raw, should_exist);
                }
                if self.checks.range {
                    self.check_range(&mut issues, record_id, event, field, raw, should_exist);
                }
                if self.checks.format {
                    self.check_format(&mut issues, record_id, event, field, raw, should_exist);
                }
                if self.checks.choices {
                    self.check_choices(&mut issues, record_id, event, field, raw, should_exist);
                }
                if self.checks.branching {
                    self.check_branching_violation(
                        &mut issues,
                        record_id,
                        event,
                        field,
                        raw,
                        should_exist,
                    );
                }
            }
        }

        tracing::debug!(count = issues.len(), "structural analysis complete");
        Ok(issues)
    }
}

fn should_exist(field: &FieldDefinition, record: &Record) -> bool {
    match field.branching_logic.as_deref() {
        Some(logic) => redqc_logic::evaluate(logic, record),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redqc_core::{FieldType, Priority, ProjectData};

    fn field(name: &str) -> FieldDefinition {
        FieldDefinition {
            field_name: name.into(),
            form_name: "demographics".into(),
            field_type: FieldType::Text,
            field_label: name.into(),
            validation: None,
            min: None,
            max: None,
            required: false,
            branching_logic: None,
            choices: None,
        }
    }

    fn dataset(fields: Vec<FieldDefinition>, records: Vec<Record>) -> ProjectData {
        let mut metadata = vec![field("record_id")];
        metadata.extend(fields);
        ProjectData {
            metadata,
            records,
            events: Vec::new(),
            logs: Vec::new(),
        }
    }

    fn run(data: &ProjectData) -> Vec<Issue> {
        StructuralAnalyzer::new(StructuralChecks::default())
            .analyze(data)
            .unwrap()
    }

    #[test]
    fn test_required_empty_is_high_priority() {
        let mut age = field("age");
        age.required = true;
        let data = dataset(
            vec![age],
            vec![Record::from([("record_id", "1"), ("age", "")])],
        );

        let issues = run(&data);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::RequiredFieldEmpty);
        assert_eq!(issues[0].priority, Priority::High);
    }

    #[test]
    fn test_required_hidden_by_branching_is_not_flagged() {
        let mut detail = field("symptom_detail");
        detail.required = true;
        detail.branching_logic = Some("[has_symptom]=1".into());
        let data = dataset(
            vec![field("has_symptom"), detail],
            vec![Record::from([
                ("record_id", "1"),
                ("has_symptom", "0"),
                ("symptom_detail", ""),
            ])],
        );

        assert!(run(&data).is_empty());
    }

    #[test]
    fn test_branching_violation_is_low_priority() {
        let mut detail = field("symptom_detail");
        detail.branching_logic = Some("[has_symptom]=1".into());
        let data = dataset(
            vec![field("has_symptom"), detail],
            vec![Record::from([
                ("record_id", "1"),
                ("has_symptom", "0"),
                ("symptom_detail", "fever"),
            ])],
        );

        let issues = run(&data);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::FieldShouldBeEmpty);
        assert_eq!(issues[0].priority, Priority::Low);
        assert_eq!(issues[0].field, "symptom_detail");
    }

    #[test]
    fn test_range_check_bounds() {
        let mut hr = field("heart_rate");
        hr.validation = Some("integer".into());
        hr.min = Some("30".into());
        hr.max = Some("220".into());
        let data = dataset(
            vec![hr],
            vec![
                Record::from([("record_id", "1"), ("heart_rate", "25")]),
                Record::from([("record_id", "2"), ("heart_rate", "30")]),
                Record::from([("record_id", "3"), ("heart_rate", "221")]),
            ],
        );

        let issues = run(&data);
        let range_issues: Vec<_> = issues
            .iter()
            .filter(|i| i.issue_type == IssueType::ValueOutOfRange)
            .collect();
        assert_eq!(range_issues.len(), 2);
        assert_eq!(range_issues[0].record_id, "1");
        assert_eq!(range_issues[1].record_id, "3");
    }

    #[test]
    fn test_format_checks() {
        let mut visit = field("visit_date");
        visit.validation = Some("date_ymd".into());
        let mut email = field("contact_email");
        email.validation = Some("email".into());
        let data = dataset(
            vec![visit, email],
            vec![Record::from([
                ("record_id", "1"),
                ("visit_date", "not-a-date"),
                ("contact_email", "nobody@nowhere"),
            ])],
        );

        let issues = run(&data);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.issue_type == IssueType::InvalidFormat));
    }

    #[test]
    fn test_valid_email_passes() {
        let mut email = field("contact_email");
        email.validation = Some("email".into());
        let data = dataset(
            vec![email],
            vec![Record::from([
                ("record_id", "1"),
                ("contact_email", "a.b@example.org"),
            ])],
        );
        assert!(run(&data).is_empty());
    }

    #[test]
    fn test_invalid_choice_lists_options() {
        let mut sex = field("sex");
        sex.field_type = FieldType::Dropdown;
        sex.choices = Some("1, Male | 2, Female".into());
        let data = dataset(
            vec![sex],
            vec![Record::from([("record_id", "1"), ("sex", "3")])],
        );

        let issues = run(&data);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::InvalidChoice);
        let action = issues[0].suggested_action.as_deref().unwrap();
        assert!(action.contains("1=Male"));
        assert!(action.contains("2=Female"));
    }

    #[test]
    fn test_choice_compares_code_not_label() {
        let mut sex = field("sex");
        sex.field_type = FieldType::Dropdown;
        sex.choices = Some("1, Male | 2, Female".into());
        let data = dataset(
            vec![sex],
            vec![Record::from([("record_id", "1"), ("sex", "Male")])],
        );
        assert_eq!(run(&data).len(), 1);
    }

    #[test]
    fn test_toggles_disable_checks() {
        let mut age = field("age");
        age.required = true;
        let data = dataset(
            vec![age],
            vec![Record::from([("record_id", "1"), ("age", "")])],
        );

        let issues = StructuralAnalyzer::new(StructuralChecks {
            required: false,
            ..StructuralChecks::default()
        })
        .analyze(&data)
        .unwrap();
        assert!(issues.is_empty());
    }
}
