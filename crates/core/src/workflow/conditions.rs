//! Condition evaluation.
//!
//! Pure and total: a condition referencing a missing attribute, or an
//! attribute of the wrong type, evaluates to false -- never an error. The
//! caller extracts a flat attribute map from the submitted object before
//! invoking the engine; the engine never inspects domain objects directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::template::{Condition, StepDefinition};

/// Attribute key conventions shared with callers.
pub const ATTR_AMOUNT: &str = "amount";
pub const ATTR_CATEGORY: &str = "category";

/// A single attribute value extracted from a submitted object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Flat attribute map of a submitted object, e.g.
/// `{"amount": 1500.0, "category": "travel"}`.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Evaluate one condition against the attribute map.
pub fn condition_matches(condition: &Condition, attributes: &Attributes) -> bool {
    match condition {
        Condition::AmountRange {
            min_amount,
            max_amount,
        } => {
            let Some(amount) = attributes.get(ATTR_AMOUNT).and_then(AttributeValue::as_number)
            else {
                return false;
            };
            if min_amount.is_some_and(|min| amount < min) {
                return false;
            }
            if max_amount.is_some_and(|max| amount > max) {
                return false;
            }
            true
        }
        Condition::Category { values } => attributes
            .get(ATTR_CATEGORY)
            .and_then(AttributeValue::as_text)
            .is_some_and(|category| values.iter().any(|v| v == category)),
    }
}

/// Evaluate a step's condition set against the attribute map.
///
/// Combines with AND when `all_conditions_must_match`, OR otherwise.
/// A step with no conditions always matches.
pub fn step_matches(step: &StepDefinition, attributes: &Attributes) -> bool {
    if step.conditions.is_empty() {
        return true;
    }
    if step.all_conditions_must_match {
        step.conditions
            .iter()
            .all(|c| condition_matches(c, attributes))
    } else {
        step.conditions
            .iter()
            .any(|c| condition_matches(c, attributes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::template::{ActionDefinition, ApprovalMode};

    fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn step_with(all_must_match: bool, conditions: Vec<Condition>) -> StepDefinition {
        StepDefinition {
            step_name: "review".into(),
            display_order: 0,
            description: None,
            all_conditions_must_match: all_must_match,
            conditions,
            actions: vec![ActionDefinition::Role {
                approver_role: "admin".into(),
                approval_mode: ApprovalMode::All,
            }],
            transitions: vec![],
        }
    }

    #[test]
    fn amount_range_bounds_are_inclusive() {
        let cond = Condition::AmountRange {
            min_amount: Some(1000.0),
            max_amount: Some(2000.0),
        };
        let at = |n: f64| attrs(&[(ATTR_AMOUNT, AttributeValue::Number(n))]);
        assert!(condition_matches(&cond, &at(1000.0)));
        assert!(condition_matches(&cond, &at(2000.0)));
        assert!(condition_matches(&cond, &at(1500.0)));
        assert!(!condition_matches(&cond, &at(999.99)));
        assert!(!condition_matches(&cond, &at(2000.01)));
    }

    #[test]
    fn amount_range_with_single_bound() {
        let min_only = Condition::AmountRange {
            min_amount: Some(1000.0),
            max_amount: None,
        };
        let at = |n: f64| attrs(&[(ATTR_AMOUNT, AttributeValue::Number(n))]);
        assert!(condition_matches(&min_only, &at(1_000_000.0)));
        assert!(!condition_matches(&min_only, &at(500.0)));

        let max_only = Condition::AmountRange {
            min_amount: None,
            max_amount: Some(100.0),
        };
        assert!(condition_matches(&max_only, &at(50.0)));
        assert!(!condition_matches(&max_only, &at(150.0)));
    }

    #[test]
    fn missing_attribute_evaluates_false_not_error() {
        let cond = Condition::AmountRange {
            min_amount: Some(1.0),
            max_amount: None,
        };
        assert!(!condition_matches(&cond, &Attributes::new()));
        // Wrong type: amount present but textual.
        let wrong = attrs(&[(ATTR_AMOUNT, AttributeValue::Text("lots".into()))]);
        assert!(!condition_matches(&cond, &wrong));
    }

    #[test]
    fn category_membership() {
        let cond = Condition::Category {
            values: vec!["travel".into(), "meals".into()],
        };
        let travel = attrs(&[(ATTR_CATEGORY, AttributeValue::Text("travel".into()))]);
        let office = attrs(&[(ATTR_CATEGORY, AttributeValue::Text("office".into()))]);
        assert!(condition_matches(&cond, &travel));
        assert!(!condition_matches(&cond, &office));
        assert!(!condition_matches(&cond, &Attributes::new()));
    }

    #[test]
    fn empty_condition_set_always_matches() {
        let step = step_with(true, vec![]);
        assert!(step_matches(&step, &Attributes::new()));
    }

    #[test]
    fn all_must_match_is_and() {
        let step = step_with(
            true,
            vec![
                Condition::AmountRange {
                    min_amount: Some(1000.0),
                    max_amount: None,
                },
                Condition::Category {
                    values: vec!["travel".into()],
                },
            ],
        );
        let both = attrs(&[
            (ATTR_AMOUNT, AttributeValue::Number(1500.0)),
            (ATTR_CATEGORY, AttributeValue::Text("travel".into())),
        ]);
        let one = attrs(&[(ATTR_AMOUNT, AttributeValue::Number(1500.0))]);
        assert!(step_matches(&step, &both));
        assert!(!step_matches(&step, &one));
    }

    #[test]
    fn any_may_match_is_or() {
        let step = step_with(
            false,
            vec![
                Condition::AmountRange {
                    min_amount: Some(1000.0),
                    max_amount: None,
                },
                Condition::Category {
                    values: vec!["travel".into()],
                },
            ],
        );
        let amount_only = attrs(&[(ATTR_AMOUNT, AttributeValue::Number(1500.0))]);
        let neither = attrs(&[(ATTR_AMOUNT, AttributeValue::Number(10.0))]);
        assert!(step_matches(&step, &amount_only));
        assert!(!step_matches(&step, &neither));
    }

    #[test]
    fn attribute_value_json_shapes() {
        let parsed: Attributes = serde_json::from_value(serde_json::json!({
            "amount": 1500.0,
            "category": "travel",
            "reimbursable": true
        }))
        .unwrap();
        assert_eq!(parsed["amount"].as_number(), Some(1500.0));
        assert_eq!(parsed["category"].as_text(), Some("travel"));
        assert_eq!(parsed["reimbursable"], AttributeValue::Bool(true));
    }
}
