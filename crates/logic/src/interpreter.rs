//! Expression evaluation against one record.

use crate::ast::{CmpOp, Expr, Operand};
use crate::parser::parse;
use redqc_core::{value, Record};
use std::borrow::Cow;

/// Evaluate a visibility expression against a record.
///
/// - Blank expression: `true` (field is always visible).
/// - Security-screen match: `false` (fails closed).
/// - Any parse failure: `true` (fails open; an unparseable rule must
///   not suppress an otherwise-valid required-field check).
pub fn evaluate(logic: &str, record: &Record) -> bool {
    if logic.trim().is_empty() {
        return true;
    }

    if is_blocked_expression(logic) {
        tracing::warn!(expression = logic, "blocked suspicious visibility expression");
        return false;
    }

    match parse(logic) {
        Ok(expr) => eval(&expr, record),
        Err(err) => {
            tracing::debug!(expression = logic, error = %err, "unparseable visibility expression, assuming visible");
            true
        }
    }
}

/// Security screen: reject namespace-escape and import-like tokens.
///
/// Tokens are only suspicious outside bracketed field references:
/// checkbox synthetic names (`field___3`) legitimately carry `__`, and
/// a field may be called `important_date` without being an import.
pub fn is_blocked_expression(logic: &str) -> bool {
    let mut outside = String::with_capacity(logic.len());
    let mut in_brackets = false;
    for c in logic.chars() {
        match c {
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            c if !in_brackets => outside.push(c),
            _ => {}
        }
    }
    outside.contains("__") || outside.contains("lambda") || outside.contains("import")
}

fn eval(expr: &Expr, record: &Record) -> bool {
    match expr {
        Expr::Or(lhs, rhs) => eval(lhs, record) || eval(rhs, record),
        Expr::And(lhs, rhs) => eval(lhs, record) && eval(rhs, record),
        Expr::Cmp(lhs, op, rhs) => compare(resolve(lhs, record), *op, resolve(rhs, record)),
        Expr::Truthy(operand) => truthy(&resolve(operand, record)),
    }
}

fn resolve<'a>(operand: &'a Operand, record: &'a Record) -> Cow<'a, str> {
    match operand {
        Operand::FieldRef(name) => Cow::Borrowed(record.get(name).unwrap_or("")),
        Operand::Str(s) => Cow::Borrowed(s.as_str()),
        Operand::Num(n) => {
            if n.fract() == 0.0 {
                Cow::Owned(format!("{}", *n as i64))
            } else {
                Cow::Owned(n.to_string())
            }
        }
    }
}

/// Numeric comparison when both sides parse as numbers, string
/// comparison otherwise.
fn compare(lhs: Cow<'_, str>, op: CmpOp, rhs: Cow<'_, str>) -> bool {
    if let (Some(a), Some(b)) = (value::parse_number(&lhs), value::parse_number(&rhs)) {
        return match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Gt => a > b,
            CmpOp::Le => a <= b,
            CmpOp::Ge => a >= b,
        };
    }
    let a = lhs.trim();
    let b = rhs.trim();
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        CmpOp::Lt => a < b,
        CmpOp::Gt => a > b,
        CmpOp::Le => a <= b,
        CmpOp::Ge => a >= b,
    }
}

fn truthy(v: &str) -> bool {
    let t = v.trim();
    !t.is_empty() && t != "0" && t != "false"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record::from([
            ("has_symptom", "1"),
            ("age", "20"),
            ("sex", "2"),
            ("meds___3", "1"),
            ("notes", ""),
        ])
    }

    #[test]
    fn test_blank_logic_is_visible() {
        assert!(evaluate("", &record()));
        assert!(evaluate("   ", &record()));
    }

    #[test]
    fn test_simple_equality() {
        assert!(evaluate("[has_symptom]=1", &record()));
        assert!(evaluate("[has_symptom]='1'", &record()));
        assert!(!evaluate("[has_symptom]=0", &record()));
    }

    #[test]
    fn test_numeric_comparison() {
        assert!(evaluate("[age] > 18", &record()));
        assert!(evaluate("[age] >= 20", &record()));
        assert!(!evaluate("[age] < 20", &record()));
        // String "9" vs number 18 would compare wrongly as text;
        // numeric parsing must win.
        let r = Record::from([("age", "9")]);
        assert!(!evaluate("[age] > 18", &r));
    }

    #[test]
    fn test_not_equal() {
        assert!(evaluate("[sex] <> 1", &record()));
        assert!(!evaluate("[sex] <> 2", &record()));
    }

    #[test]
    fn test_checkbox_reference() {
        assert!(evaluate("[meds(3)] = 1", &record()));
        assert!(!evaluate("[meds(4)] = 1", &record()));
    }

    #[test]
    fn test_boolean_combinations() {
        assert!(evaluate("[has_symptom]=1 and [age]>18", &record()));
        assert!(evaluate("[has_symptom]=0 or [age]>18", &record()));
        assert!(!evaluate("[has_symptom]=0 and [age]>18", &record()));
        assert!(evaluate("([has_symptom]=0 or [sex]=2) and [age]=20", &record()));
    }

    #[test]
    fn test_missing_field_resolves_to_empty() {
        assert!(evaluate("[nonexistent]=''", &record()));
        assert!(!evaluate("[nonexistent]=1", &record()));
    }

    // Documented quirk: the security screen fails closed while parse
    // errors fail open. Both behaviors are intentional; do not unify.
    #[test]
    fn test_security_screen_fails_closed() {
        assert!(!evaluate("lambda: 1", &record()));
        assert!(!evaluate("import os", &record()));
        assert!(!evaluate("__class__", &record()));
    }

    #[test]
    fn test_parse_error_fails_open() {
        assert!(evaluate("[age] >>> 18", &record()));
        assert!(evaluate("totally not an expression", &record()));
    }

    #[test]
    fn test_blocking_ignores_bracket_contents() {
        assert!(!is_blocked_expression("[meds___3] = 1"));
        assert!(!is_blocked_expression("[important_date] = ''"));
        assert!(is_blocked_expression("[a] = 1 and __import__"));
    }

    #[test]
    fn test_bare_field_truthiness() {
        assert!(evaluate("[has_symptom]", &record()));
        assert!(!evaluate("[notes]", &record()));
    }
}
