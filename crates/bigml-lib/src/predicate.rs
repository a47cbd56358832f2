//! Split predicates used by decision trees and isolation trees

use crate::error::{Error, Result};
use crate::fields::{Fields, Optype};
use crate::input::{FeatureValue, InputData};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
    In,
}

impl Operator {
    /// Parse an operator, returning whether it carries the `*` (or missing) suffix
    fn parse(raw: &str) -> Result<(Self, bool)> {
        let (op, missing) = match raw.strip_suffix('*') {
            Some(op) => (op, true),
            None => (raw, false),
        };
        let op = match op {
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            "=" | "==" => Operator::Eq,
            "!=" | "/=" => Operator::Ne,
            ">=" => Operator::Ge,
            ">" => Operator::Gt,
            "in" => Operator::In,
            other => {
                return Err(Error::InvalidModel(format!("unknown operator '{}'", other)));
            }
        };
        Ok((op, missing))
    }

    fn symbol(&self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Ge => ">=",
            Operator::Gt => ">",
            Operator::In => "in",
        }
    }

    fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Operator::Lt => lhs < rhs,
            Operator::Le => lhs <= rhs,
            Operator::Eq => lhs == rhs,
            Operator::Ne => lhs != rhs,
            Operator::Ge => lhs >= rhs,
            Operator::Gt => lhs > rhs,
            Operator::In => false,
        }
    }
}

/// A single split condition
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Always applies (tree roots)
    True,
    Condition {
        field: String,
        operator: Operator,
        value: Value,
        term: Option<String>,
        missing: bool,
    },
}

impl Predicate {
    pub fn from_json(json: &Value) -> Result<Self> {
        if json.as_bool() == Some(true) {
            return Ok(Predicate::True);
        }

        let field = json
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidModel("predicate without field".to_string()))?;
        let operator = json
            .get("operator")
            .or_else(|| json.get("op"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidModel("predicate without operator".to_string()))?;
        let (operator, missing) = Operator::parse(operator)?;

        Ok(Predicate::Condition {
            field: field.to_string(),
            operator,
            value: json.get("value").cloned().unwrap_or(Value::Null),
            term: json.get("term").and_then(Value::as_str).map(str::to_string),
            missing,
        })
    }

    /// Field the predicate splits on, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Predicate::True => None,
            Predicate::Condition { field, .. } => Some(field),
        }
    }

    /// Evaluate against input keyed by field id
    pub fn apply(&self, input: &InputData, fields: &Fields) -> bool {
        let Predicate::Condition {
            field,
            operator,
            value,
            term,
            missing,
        } = self
        else {
            return true;
        };

        let Some(input_value) = input.get(field) else {
            return *missing || (*operator == Operator::Eq && value.is_null());
        };

        if let Some(term) = term {
            let case_sensitive = fields.get(field).map(|f| f.case_sensitive()).unwrap_or(false);
            let text = input_value.to_string();
            let count = term_count(&text, term, case_sensitive) as f64;
            return value
                .as_f64()
                .map(|v| operator.compare(count, v))
                .unwrap_or(false);
        }

        if value.is_null() {
            return *operator == Operator::Ne;
        }

        match operator {
            Operator::In => value
                .as_array()
                .map(|items| items.iter().any(|item| value_matches(item, input_value)))
                .unwrap_or(false),
            Operator::Eq => value_matches(value, input_value),
            Operator::Ne => !value_matches(value, input_value),
            _ => match (input_value, value.as_f64()) {
                (FeatureValue::Numeric(lhs), Some(rhs)) => operator.compare(*lhs, rhs),
                _ => false,
            },
        }
    }

    /// Human readable form, e.g. `petal width <= 0.8`
    pub fn to_rule(&self, fields: &Fields) -> String {
        match self {
            Predicate::True => "TRUE".to_string(),
            Predicate::Condition {
                field,
                operator,
                value,
                term,
                missing,
            } => {
                let name = fields.name_for_id(field).unwrap_or(field);
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let suffix = if *missing { " or missing" } else { "" };
                let text_field = fields
                    .get(field)
                    .map(|f| matches!(f.optype, Optype::Text | Optype::Items))
                    .unwrap_or(false);
                match term {
                    Some(term) if text_field => format!(
                        "{} contains '{}' {} {} times{}",
                        name,
                        term,
                        operator.symbol(),
                        value,
                        suffix
                    ),
                    _ => format!("{} {} {}{}", name, operator.symbol(), value, suffix),
                }
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::True => f.write_str("TRUE"),
            Predicate::Condition {
                field,
                operator,
                value,
                ..
            } => write!(f, "{} {} {}", field, operator.symbol(), value),
        }
    }
}

fn value_matches(expected: &Value, actual: &FeatureValue) -> bool {
    match (expected, actual) {
        (Value::String(e), FeatureValue::Text(a)) => e == a,
        (Value::Number(e), FeatureValue::Numeric(a)) => e.as_f64() == Some(*a),
        (Value::Number(e), FeatureValue::Text(a)) => a.parse::<f64>().ok() == e.as_f64(),
        (Value::String(e), FeatureValue::Numeric(a)) => e.parse::<f64>().ok() == Some(*a),
        _ => false,
    }
}

/// Whole-word occurrences of `term` in `text`
pub fn term_count(text: &str, term: &str, case_sensitive: bool) -> usize {
    let normalize = |s: &str| {
        if case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    };
    let term = normalize(term);
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|token| !token.is_empty())
        .filter(|token| normalize(token) == term)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn iris_fields() -> Fields {
        Fields::from_json(
            &json!({
                "000002": {"name": "petal length", "optype": "numeric"},
                "000003": {"name": "petal width", "optype": "numeric"},
                "000004": {"name": "species", "optype": "categorical"},
                "000005": {"name": "notes", "optype": "text"}
            }),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_numeric_predicates() {
        let fields = iris_fields();
        let input = crate::input_data! { "000003" => 0.8 };

        let le = Predicate::from_json(&json!({"field": "000003", "operator": "<=", "value": 0.8}))
            .unwrap();
        let gt = Predicate::from_json(&json!({"field": "000003", "operator": ">", "value": 0.8}))
            .unwrap();
        assert!(le.apply(&input, &fields));
        assert!(!gt.apply(&input, &fields));
    }

    #[test]
    fn test_missing_field() {
        let fields = iris_fields();
        let input = InputData::new();

        let plain = Predicate::from_json(&json!({"field": "000003", "operator": ">", "value": 1}))
            .unwrap();
        let or_missing =
            Predicate::from_json(&json!({"field": "000003", "operator": ">*", "value": 1}))
                .unwrap();
        let is_null =
            Predicate::from_json(&json!({"field": "000003", "operator": "=", "value": null}))
                .unwrap();

        assert!(!plain.apply(&input, &fields));
        assert!(or_missing.apply(&input, &fields));
        assert!(is_null.apply(&input, &fields));
        assert_eq!(or_missing.to_rule(&fields), "petal width > 1 or missing");
    }

    #[test]
    fn test_categorical_predicates() {
        let fields = iris_fields();
        let input = crate::input_data! { "000004" => "Iris-setosa" };

        let eq = Predicate::from_json(
            &json!({"field": "000004", "operator": "=", "value": "Iris-setosa"}),
        )
        .unwrap();
        let ne = Predicate::from_json(
            &json!({"field": "000004", "operator": "/=", "value": "Iris-setosa"}),
        )
        .unwrap();
        let within = Predicate::from_json(&json!({
            "field": "000004",
            "operator": "in",
            "value": ["Iris-virginica", "Iris-setosa"]
        }))
        .unwrap();

        assert!(eq.apply(&input, &fields));
        assert!(!ne.apply(&input, &fields));
        assert!(within.apply(&input, &fields));
    }

    #[test]
    fn test_term_predicate() {
        let fields = iris_fields();
        let input = crate::input_data! { "000005" => "Great wine, great price." };

        let pred = Predicate::from_json(
            &json!({"field": "000005", "operator": ">=", "value": 2, "term": "great"}),
        )
        .unwrap();
        assert!(pred.apply(&input, &fields));
        assert_eq!(term_count("Great wine, great price.", "great", true), 1);
        assert_eq!(
            pred.to_rule(&fields),
            "notes contains 'great' >= 2 times"
        );
    }

    #[test]
    fn test_true_predicate_and_unknown_operator() {
        assert_eq!(Predicate::from_json(&json!(true)).unwrap(), Predicate::True);
        assert!(Predicate::from_json(&json!({"field": "000001", "operator": "~", "value": 1}))
            .is_err());
    }
}
