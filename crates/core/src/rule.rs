//! User-authored custom validation rules.

use crate::{value, Priority};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Sentinel target meaning "apply to every metadata-declared field".
pub const ALL_FIELDS: &str = "_ALL_";

/// Rule type families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Numeric value must fall inside `{min, max}`
    Range,
    /// Value compared against a fixed target
    Comparison,
    /// Value compared against a second field's value
    CrossField,
    /// Full-string regular-expression match
    Regex,
    /// If/then pair of field tests
    Condition,
    /// Value must be unique across all records
    Uniqueness,
}

/// Operators available to comparison, cross-field, and condition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleOperator {
    /// Equal
    #[serde(rename = "=")]
    Eq,
    /// Not equal
    #[serde(rename = "!=")]
    Ne,
    /// Less than
    #[serde(rename = "<")]
    Lt,
    /// Greater than
    #[serde(rename = ">")]
    Gt,
    /// Less than or equal
    #[serde(rename = "<=")]
    Le,
    /// Greater than or equal
    #[serde(rename = ">=")]
    Ge,
    /// Value must be empty
    #[serde(rename = "empty")]
    Empty,
    /// Value must be non-empty
    #[serde(rename = "not_empty")]
    NotEmpty,
    /// Value must contain the target substring
    #[serde(rename = "contains")]
    Contains,
    /// Value must match the pattern (regex rules)
    #[serde(rename = "matches")]
    Matches,
    /// Value must not match the pattern (regex rules)
    #[serde(rename = "not_matches")]
    NotMatches,
}

impl RuleOperator {
    /// Whether this operator specifically tests emptiness, so empty
    /// values must not be skipped before evaluation.
    pub fn tests_emptiness(&self) -> bool {
        matches!(self, RuleOperator::Empty | RuleOperator::NotEmpty)
    }
}

impl Default for RuleOperator {
    fn default() -> Self {
        RuleOperator::Eq
    }
}

/// The if/then pair carried by a `condition` rule's value object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionSpec {
    /// Field tested by the IF clause; defaults to the rule's own target
    #[serde(default)]
    pub if_field: Option<String>,

    /// IF operator
    #[serde(default)]
    pub if_operator: RuleOperator,

    /// IF comparison value
    #[serde(default)]
    pub if_value: Option<JsonValue>,

    /// Field tested by the THEN clause
    #[serde(default)]
    pub then_field: Option<String>,

    /// THEN operator
    #[serde(default)]
    pub then_operator: RuleOperator,

    /// THEN comparison value
    #[serde(default)]
    pub then_value: Option<JsonValue>,
}

/// One user-authored rule, loaded from persisted configuration.
///
/// The `value` payload is shaped by the rule type: a scalar for
/// comparison/regex, a `{min, max}` object or two-element array for
/// range, an if/then object for condition. A payload that does not
/// match its rule type simply produces no violations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRule {
    /// Rule id (generated when absent)
    #[serde(default = "generated_id")]
    pub id: String,

    /// Display name
    pub name: String,

    /// Rule family
    pub rule_type: RuleType,

    /// Target field, or [`ALL_FIELDS`]
    pub field: String,

    /// Operator
    #[serde(default)]
    pub operator: RuleOperator,

    /// Type-dependent payload
    #[serde(default)]
    pub value: JsonValue,

    /// Priority carried onto every violation
    #[serde(default)]
    pub priority: Priority,

    /// User-facing message; synthesized for uniqueness rules when empty
    #[serde(default)]
    pub message: String,

    /// Disabled rules are never evaluated
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Second field for cross-field rules
    #[serde(default)]
    pub field2: Option<String>,

    /// Event of the target field, for cross-event rules
    #[serde(default)]
    pub event1: Option<String>,

    /// Event of the second field, for cross-event rules
    #[serde(default)]
    pub event2: Option<String>,

    /// Form of the target field
    #[serde(default)]
    pub form1: Option<String>,

    /// Form of the second field
    #[serde(default)]
    pub form2: Option<String>,

    /// Creation timestamp (ISO-8601)
    #[serde(default)]
    pub created_at: Option<String>,

    /// Last-update timestamp (ISO-8601)
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn generated_id() -> String {
    ulid::Ulid::new().to_string()
}

fn default_true() -> bool {
    true
}

impl CustomRule {
    /// Whether this rule targets every field.
    pub fn targets_all_fields(&self) -> bool {
        self.field == ALL_FIELDS
    }

    /// Range bounds for a `range` rule: `(min, max)`.
    ///
    /// Accepts `{"min": x, "max": y}` or `[min, max]`; anything else
    /// yields `None` and the rule is inert.
    pub fn range_bounds(&self) -> Option<(Option<f64>, Option<f64>)> {
        match &self.value {
            JsonValue::Object(map) => {
                let min = map.get("min").and_then(json_number);
                let max = map.get("max").and_then(json_number);
                if min.is_none() && max.is_none() {
                    return None;
                }
                Some((min, max))
            }
            JsonValue::Array(items) if items.len() >= 2 => {
                Some((json_number(&items[0]), json_number(&items[1])))
            }
            _ => None,
        }
    }

    /// If/then payload for a `condition` rule.
    pub fn condition_spec(&self) -> Option<ConditionSpec> {
        if !self.value.is_object() {
            return None;
        }
        serde_json::from_value(self.value.clone()).ok()
    }

    /// The rule value rendered as a comparison string.
    pub fn value_as_string(&self) -> String {
        json_to_string(&self.value)
    }
}

fn json_number(v: &JsonValue) -> Option<f64> {
    match v {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => value::parse_number(s),
        _ => None,
    }
}

/// Render a JSON scalar the way the raw record values look.
pub fn json_to_string(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(rule_type: RuleType, value: JsonValue) -> CustomRule {
        CustomRule {
            id: "r1".into(),
            name: "test".into(),
            rule_type,
            field: "age".into(),
            operator: RuleOperator::Eq,
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

    #[test]
    fn test_range_bounds_object_and_array() {
        let r = rule(RuleType::Range, json!({"min": 0, "max": 120}));
        assert_eq!(r.range_bounds(), Some((Some(0.0), Some(120.0))));

        let r = rule(RuleType::Range, json!([10, 20]));
        assert_eq!(r.range_bounds(), Some((Some(10.0), Some(20.0))));

        let r = rule(RuleType::Range, json!({"max": "5"}));
        assert_eq!(r.range_bounds(), Some((None, Some(5.0))));

        let r = rule(RuleType::Range, json!("oops"));
        assert_eq!(r.range_bounds(), None);
    }

    #[test]
    fn test_condition_spec_parsing() {
        let r = rule(
            RuleType::Condition,
            json!({
                "if_field": "status",
                "if_operator": "=",
                "if_value": "Completed",
                "then_field": "completion_date",
                "then_operator": "not_empty"
            }),
        );
        let spec = r.condition_spec().unwrap();
        assert_eq!(spec.if_field.as_deref(), Some("status"));
        assert_eq!(spec.then_operator, RuleOperator::NotEmpty);

        let r = rule(RuleType::Condition, json!(42));
        assert!(r.condition_spec().is_none());
    }

    #[test]
    fn test_operator_serde_codes() {
        let op: RuleOperator = serde_json::from_str("\"not_empty\"").unwrap();
        assert_eq!(op, RuleOperator::NotEmpty);
        assert_eq!(serde_json::to_string(&RuleOperator::Ge).unwrap(), "\">=\"");
    }

    #[test]
    fn test_rule_deserialization_defaults() {
        let r: CustomRule = serde_json::from_value(json!({
            "name": "dup check",
            "rule_type": "uniqueness",
            "field": "patient_code"
        }))
        .unwrap();
        assert!(r.enabled);
        assert!(!r.id.is_empty());
        assert_eq!(r.rule_type, RuleType::Uniqueness);
        assert_eq!(r.priority, Priority::Medium);
    }
}
