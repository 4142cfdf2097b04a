//! Custom-rule analyzer: evaluation of user-authored rules.

use crate::base::{instrument_for, Analyzer, AnalyzerError, IssueBuilder};
use redqc_core::{
    json_to_string, value, CustomRule, Issue, IssueType, ProjectData, Record, RuleOperator,
    RuleType, EVENT_KEY, REPEAT_INSTANCE_KEY, REPEAT_INSTRUMENT_KEY,
};
use std::collections::HashMap;

/// Evaluates user-authored rules against every record.
///
/// Disabled rules are skipped; a rule whose payload does not fit its
/// type evaluates to "no violation" rather than erroring. Uniqueness
/// rules run against a value-count index built once per pass.
pub struct CustomRulesAnalyzer {
    rules: Vec<CustomRule>,
}

/// value → occurrence count for one uniqueness-rule field.
type ValueCounts = HashMap<String, usize>;

impl CustomRulesAnalyzer {
    /// Create with the rules to evaluate.
    pub fn new(rules: Vec<CustomRule>) -> Self {
        Self { rules }
    }

    /// Occurrence index per uniqueness-rule field, computed once.
    fn uniqueness_index(&self, data: &ProjectData) -> HashMap<String, ValueCounts> {
        let mut index: HashMap<String, ValueCounts> = HashMap::new();
        for rule in &self.rules {
            if rule.rule_type != RuleType::Uniqueness || !rule.enabled {
                continue;
            }
            if index.contains_key(&rule.field) {
                continue;
            }
            let mut counts = ValueCounts::new();
            for record in &data.records {
                if let Some(v) = record.get(&rule.field) {
                    let v = v.trim();
                    if !v.is_empty() {
                        *counts.entry(v.to_string()).or_default() += 1;
                    }
                }
            }
            index.insert(rule.field.clone(), counts);
        }
        index
    }

    /// Concrete target fields for a rule, expanding the all-fields
    /// sentinel over the data dictionary.
    fn target_fields<'a>(&self, rule: &'a CustomRule, data: &'a ProjectData) -> Vec<&'a str> {
        if !rule.targets_all_fields() {
            return vec![rule.field.as_str()];
        }
        let fields: Vec<&str> = data
            .metadata
            .iter()
            .map(|f| f.field_name.as_str())
            .filter(|f| ![EVENT_KEY, REPEAT_INSTRUMENT_KEY, REPEAT_INSTANCE_KEY].contains(f))
            .collect();
        if !fields.is_empty() {
            return fields;
        }
        // No dictionary loaded: fall back to the keys of the first record.
        data.records
            .first()
            .map(|r| {
                r.values
                    .keys()
                    .map(String::as_str)
                    .filter(|f| {
                        ![EVENT_KEY, REPEAT_INSTRUMENT_KEY, REPEAT_INSTANCE_KEY].contains(f)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn evaluate(
        &self,
        rule: &CustomRule,
        field: &str,
        raw: &str,
        record: &Record,
        uniqueness: &HashMap<String, ValueCounts>,
    ) -> Option<String> {
        match rule.rule_type {
            RuleType::Range => self.eval_range(rule, raw),
            RuleType::Comparison => self.eval_comparison(rule, raw),
            RuleType::CrossField => self.eval_cross_field(rule, raw, record),
            RuleType::Regex => self.eval_regex(rule, raw),
            RuleType::Condition => self.eval_condition(rule, field, record),
            RuleType::Uniqueness => self.eval_uniqueness(rule, raw, uniqueness),
        }
    }

    fn eval_range(&self, rule: &CustomRule, raw: &str) -> Option<String> {
        let (min, max) = rule.range_bounds()?;
        let num = value::parse_number(raw)?;
        let outside =
            min.is_some_and(|m| num < m) || max.is_some_and(|m| num > m);
        outside.then(|| violation_message(rule))
    }

    fn eval_comparison(&self, rule: &CustomRule, raw: &str) -> Option<String> {
        let target = rule.value_as_string();
        let holds = compare(raw, rule.operator, &target)?;
        (!holds).then(|| violation_message(rule))
    }

    fn eval_cross_field(&self, rule: &CustomRule, raw: &str, record: &Record) -> Option<String> {
        let other_field = rule.field2.as_deref()?;
        let other = record.get(other_field).unwrap_or("");
        if raw.trim().is_empty() || other.trim().is_empty() {
            return None;
        }
        let holds = compare_cross(raw, rule.operator, other)?;
        (!holds).then(|| violation_message(rule))
    }

    fn eval_regex(&self, rule: &CustomRule, raw: &str) -> Option<String> {
        let pattern = rule.value_as_string();
        // Anchored so the pattern must cover the whole value.
        let re = regex::Regex::new(&format!(r"\A(?:{pattern})\z")).ok()?;
        let matched = re.is_match(raw.trim());
        let violated = match rule.operator {
            RuleOperator::NotMatches => matched,
            _ => !matched,
        };
        violated.then(|| violation_message(rule))
    }

    fn eval_condition(&self, rule: &CustomRule, field: &str, record: &Record) -> Option<String> {
        let spec = rule.condition_spec()?;

        let if_field = match spec.if_field.as_deref() {
            Some(f) if f != rule.field => f,
            _ => field,
        };
        let then_field = match spec.then_field.as_deref() {
            Some(f) if f != rule.field => f,
            _ => rule.field2.as_deref().unwrap_or(field),
        };

        let if_value = record.get(if_field).unwrap_or("");
        let if_target = spec.if_value.as_ref().map(json_to_string).unwrap_or_default();
        if !condition_matches(if_value, spec.if_operator, &if_target) {
            return None;
        }

        let then_value = record.get(then_field).unwrap_or("");
        let then_target = spec
            .then_value
            .as_ref()
            .map(json_to_string)
            .unwrap_or_default();
        let holds = condition_matches(then_value, spec.then_operator, &then_target);
        (!holds).then(|| violation_message(rule))
    }

    fn eval_uniqueness(
        &self,
        rule: &CustomRule,
        raw: &str,
        uniqueness: &HashMap<String, ValueCounts>,
    ) -> Option<String> {
        let v = raw.trim();
        let count = uniqueness.get(&rule.field)?.get(v).copied().unwrap_or(0);
        if count <= 1 {
            return None;
        }
        Some(if rule.message.is_empty() {
            format!("Duplicate value '{v}' found ({count} occurrences)")
        } else {
            rule.message.clone()
        })
    }
}

fn violation_message(rule: &CustomRule) -> String {
    if rule.message.is_empty() {
        format!("Rule violated: {}", rule.name)
    } else {
        rule.message.clone()
    }
}

/// Comparison-rule semantics: numeric when both sides parse, string
/// otherwise. Returns `None` when the operator needs numbers and the
/// values do not parse.
fn compare(raw: &str, op: RuleOperator, target: &str) -> Option<bool> {
    let nums = value::parse_number(raw).zip(value::parse_number(target));
    match op {
        RuleOperator::Eq => Some(match nums {
            Some((a, b)) => a == b,
            None => raw.trim() == target.trim(),
        }),
        RuleOperator::Ne => Some(match nums {
            Some((a, b)) => a != b,
            None => raw.trim() != target.trim(),
        }),
        RuleOperator::Lt => nums.map(|(a, b)| a < b),
        RuleOperator::Gt => nums.map(|(a, b)| a > b),
        RuleOperator::Le => nums.map(|(a, b)| a <= b),
        RuleOperator::Ge => nums.map(|(a, b)| a >= b),
        RuleOperator::Empty => Some(value::is_empty(Some(raw))),
        RuleOperator::NotEmpty => Some(!value::is_empty(Some(raw))),
        RuleOperator::Contains => Some(raw.contains(target)),
        RuleOperator::Matches | RuleOperator::NotMatches => None,
    }
}

/// Cross-field semantics: dates first, numbers second, strings last.
fn compare_cross(raw: &str, op: RuleOperator, other: &str) -> Option<bool> {
    if let Some((a, b)) = value::parse_date(raw).zip(value::parse_date(other)) {
        return ordered(op, a.partial_cmp(&b)?);
    }
    if let Some((a, b)) = value::parse_number(raw).zip(value::parse_number(other)) {
        return ordered(op, a.partial_cmp(&b)?);
    }
    ordered(op, raw.trim().cmp(other.trim()))
}

fn ordered(op: RuleOperator, ord: std::cmp::Ordering) -> Option<bool> {
    use std::cmp::Ordering::*;
    match op {
        RuleOperator::Eq => Some(ord == Equal),
        RuleOperator::Ne => Some(ord != Equal),
        RuleOperator::Lt => Some(ord == Less),
        RuleOperator::Gt => Some(ord == Greater),
        RuleOperator::Le => Some(ord != Greater),
        RuleOperator::Ge => Some(ord != Less),
        _ => None,
    }
}

/// Condition-clause test. Unlike [`compare`], a non-numeric value under
/// a numeric operator makes the clause false rather than inert.
fn condition_matches(raw: &str, op: RuleOperator, target: &str) -> bool {
    match op {
        RuleOperator::Eq => raw.trim() == target.trim(),
        RuleOperator::Ne => raw.trim() != target.trim(),
        RuleOperator::Empty => value::is_empty(Some(raw)),
        RuleOperator::NotEmpty => !value::is_empty(Some(raw)),
        RuleOperator::Contains => raw.contains(target),
        RuleOperator::Lt | RuleOperator::Gt | RuleOperator::Le | RuleOperator::Ge => {
            match value::parse_number(raw).zip(value::parse_number(target)) {
                Some((a, b)) => match op {
                    RuleOperator::Lt => a < b,
                    RuleOperator::Gt => a > b,
                    RuleOperator::Le => a <= b,
                    _ => a >= b,
                },
                None => false,
            }
        }
        RuleOperator::Matches | RuleOperator::NotMatches => false,
    }
}

impl Analyzer for CustomRulesAnalyzer {
    fn name(&self) -> &'static str {
        "custom_rules"
    }

    fn analyze(&self, data: &ProjectData) -> Result<Vec<Issue>, AnalyzerError> {
        let mut issues = Vec::new();
        let record_id_field = data.record_id_field();
        let uniqueness = self.uniqueness_index(data);

        for rule in &self.rules {
            if !rule.enabled {
                continue;
            }
            let targets = self.target_fields(rule, data);

            for record in &data.records {
                let record_id = record.get(record_id_field).unwrap_or("UNKNOWN");
                for field in &targets {
                    let raw = record.get(field).unwrap_or("");
                    if value::is_empty(Some(raw))
                        && !rule.operator.tests_emptiness()
                        && rule.rule_type != RuleType::Condition
                    {
                        continue;
                    }
                    if let Some(message) = self.evaluate(rule, field, raw, record, &uniqueness) {
                        issues.push(
                            IssueBuilder::new(IssueType::CustomRuleViolation, record_id, *field)
                                .event(record.event_name())
                                .instrument(instrument_for(data, field))
                                .value(raw)
                                .priority(rule.priority)
                                .explanation(message)
                                .suggested_action(format!(
                                    "Check field against custom rule: {}",
                                    rule.name
                                ))
                                .build(),
                        );
                    }
                }
            }
        }

        tracing::debug!(
            rules = self.rules.len(),
            count = issues.len(),
            "custom-rule analysis complete"
        );
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redqc_core::{FieldDefinition, FieldType, Priority};
    use serde_json::json;

    fn rule(rule_type: RuleType, field: &str, op: RuleOperator, value: serde_json::Value) -> CustomRule {
        CustomRule {
            id: "r1".into(),
            name: "test rule".into(),
            rule_type,
            field: field.into(),
            operator: op,
            value,
            priority: Priority::Medium,
            message: String::new(),
            enabled: true,
            field2: None,
            event1: None,
            event2: None,
            form1: None,
            form2: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn meta(name: &str) -> FieldDefinition {
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

    fn run(rules: Vec<CustomRule>, records: Vec<Record>, fields: &[&str]) -> Vec<Issue> {
        let mut metadata = vec![meta("record_id")];
        metadata.extend(fields.iter().map(|f| meta(f)));
        let data = ProjectData {
            metadata,
            records,
            ..ProjectData::default()
        };
        CustomRulesAnalyzer::new(rules).analyze(&data).unwrap()
    }

    #[test]
    fn test_range_rule_bounds_are_inclusive() {
        let r = rule(RuleType::Range, "age", RuleOperator::Eq, json!({"min": 0, "max": 120}));
        let issues = run(
            vec![r],
            vec![
                Record::from([("record_id", "1"), ("age", "120")]),
                Record::from([("record_id", "2"), ("age", "121")]),
            ],
            &["age"],
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].record_id, "2");
        assert_eq!(issues[0].explanation, "Rule violated: test rule");
    }

    #[test]
    fn test_malformed_range_payload_is_inert() {
        let r = rule(RuleType::Range, "age", RuleOperator::Eq, json!("oops"));
        let issues = run(
            vec![r],
            vec![Record::from([("record_id", "1"), ("age", "999")])],
            &["age"],
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_comparison_not_satisfied_is_violation() {
        let r = rule(RuleType::Comparison, "status", RuleOperator::Eq, json!("Completed"));
        let issues = run(
            vec![r],
            vec![Record::from([("record_id", "1"), ("status", "Pending")])],
            &["status"],
        );
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_comparison_skips_empty_values() {
        let r = rule(RuleType::Comparison, "status", RuleOperator::Eq, json!("Completed"));
        let issues = run(
            vec![r],
            vec![Record::from([("record_id", "1"), ("status", "")])],
            &["status"],
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_not_empty_operator_sees_empty_values() {
        let r = rule(RuleType::Comparison, "status", RuleOperator::NotEmpty, json!(null));
        let issues = run(
            vec![r],
            vec![Record::from([("record_id", "1"), ("status", "")])],
            &["status"],
        );
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_cross_field_date_precedence() {
        let mut r = rule(RuleType::CrossField, "end_date", RuleOperator::Ge, json!(null));
        r.field2 = Some("start_date".into());
        let issues = run(
            vec![r],
            vec![
                Record::from([
                    ("record_id", "1"),
                    ("start_date", "2024-02-01"),
                    ("end_date", "2024-01-15"),
                ]),
                Record::from([
                    ("record_id", "2"),
                    ("start_date", "2024-02-01"),
                    ("end_date", "2024-03-15"),
                ]),
            ],
            &["start_date", "end_date"],
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].record_id, "1");
        assert_eq!(issues[0].field, "end_date");
    }

    #[test]
    fn test_cross_field_with_empty_side_is_silent() {
        let mut r = rule(RuleType::CrossField, "end_date", RuleOperator::Ge, json!(null));
        r.field2 = Some("start_date".into());
        let issues = run(
            vec![r],
            vec![Record::from([
                ("record_id", "1"),
                ("start_date", ""),
                ("end_date", "2024-01-15"),
            ])],
            &["start_date", "end_date"],
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_regex_rule_matches_whole_value() {
        let r = rule(RuleType::Regex, "code", RuleOperator::Matches, json!(r"[A-Z]{3}-\d{4}"));
        let issues = run(
            vec![r],
            vec![
                Record::from([("record_id", "1"), ("code", "ABC-1234")]),
                // A partial match is not enough.
                Record::from([("record_id", "2"), ("code", "xABC-1234x")]),
            ],
            &["code"],
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].record_id, "2");
    }

    #[test]
    fn test_invalid_regex_is_inert() {
        let r = rule(RuleType::Regex, "code", RuleOperator::Matches, json!("([unclosed"));
        let issues = run(
            vec![r],
            vec![Record::from([("record_id", "1"), ("code", "anything")])],
            &["code"],
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_condition_rule_if_then() {
        let r = rule(
            RuleType::Condition,
            "status",
            RuleOperator::Eq,
            json!({
                "if_field": "status",
                "if_operator": "=",
                "if_value": "Completed",
                "then_field": "completion_date",
                "then_operator": "not_empty"
            }),
        );
        let issues = run(
            vec![r],
            vec![
                Record::from([
                    ("record_id", "1"),
                    ("status", "Completed"),
                    ("completion_date", ""),
                ]),
                Record::from([
                    ("record_id", "2"),
                    ("status", "Pending"),
                    ("completion_date", ""),
                ]),
            ],
            &["status", "completion_date"],
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].record_id, "1");
    }

    #[test]
    fn test_uniqueness_flags_every_duplicate_row() {
        let r = rule(RuleType::Uniqueness, "patient_code", RuleOperator::Eq, json!(null));
        let issues = run(
            vec![r],
            vec![
                Record::from([("record_id", "1"), ("patient_code", "P-100")]),
                Record::from([("record_id", "2"), ("patient_code", "P-100")]),
                Record::from([("record_id", "3"), ("patient_code", "P-200")]),
            ],
            &["patient_code"],
        );
        assert_eq!(issues.len(), 2);
        assert!(issues[0].explanation.contains("2 occurrences"));
    }

    #[test]
    fn test_disabled_rule_is_skipped() {
        let mut r = rule(RuleType::Comparison, "status", RuleOperator::Eq, json!("Completed"));
        r.enabled = false;
        let issues = run(
            vec![r],
            vec![Record::from([("record_id", "1"), ("status", "Pending")])],
            &["status"],
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_all_fields_sentinel_expands_over_dictionary() {
        let r = rule(
            RuleType::Comparison,
            redqc_core::ALL_FIELDS,
            RuleOperator::NotEmpty,
            json!(null),
        );
        let mut record = Record::from([
            ("record_id", "1"),
            ("age", ""),
            ("redcap_event_name", "baseline_arm_1"),
        ]);
        // A key absent from the dictionary must not be visited.
        record.values.insert("stray_key".into(), "".into());
        let issues = run(vec![r], vec![record], &["age"]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "age");
    }

    #[test]
    fn test_custom_message_and_priority_carry_through() {
        let mut r = rule(RuleType::Comparison, "status", RuleOperator::Eq, json!("Completed"));
        r.message = "Status must be Completed at closeout".into();
        r.priority = Priority::High;
        let issues = run(
            vec![r],
            vec![Record::from([("record_id", "1"), ("status", "Pending")])],
            &["status"],
        );
        assert_eq!(issues[0].explanation, "Status must be Completed at closeout");
        assert_eq!(issues[0].priority, Priority::High);
    }
}
