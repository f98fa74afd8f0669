//! Workflow template definition types.
//!
//! These are the in-memory (and API wire) representation of a template.
//! Condition and action kinds are closed sum types: adding a new kind means
//! adding a variant, which forces every `match` in the evaluator and
//! resolver to handle it.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// How an instance of this template gets created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Created by an explicit user/API action.
    Manual,
    /// Created automatically when a gated business event fires.
    Automatic,
}

/// Policy for satisfying a step's resolved approver set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// Every resolved actor must approve.
    All,
    /// The first recorded decision settles the step.
    Any,
}

/// How a step concluded, keyed by transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Approved,
    Rejected,
    /// The step's conditions did not match at entry; no execution is
    /// recorded and the step's `skipped` transition is followed instead.
    Skipped,
}

/// Final status a transition can assign to the whole instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Approved,
    Rejected,
}

/// A typed predicate over the submitted object's attribute map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Matches when the `amount` attribute falls inside the (inclusive)
    /// bounds. At least one bound is required; validation rejects the
    /// unbounded form rather than treating it as match-all.
    AmountRange {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_amount: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_amount: Option<f64>,
    },
    /// Matches when the `category` attribute equals one of `values`.
    Category { values: Vec<String> },
}

/// Defines who must act on a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionDefinition {
    /// All active members holding `approver_role` in the template's scope.
    Role {
        approver_role: String,
        approval_mode: ApprovalMode,
    },
    /// A single named member.
    SpecificMember {
        member_id: DbId,
        approval_mode: ApprovalMode,
    },
}

impl ActionDefinition {
    pub fn approval_mode(&self) -> ApprovalMode {
        match self {
            ActionDefinition::Role { approval_mode, .. } => *approval_mode,
            ActionDefinition::SpecificMember { approval_mode, .. } => *approval_mode,
        }
    }
}

impl TriggerType {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerType::Manual => "manual",
            TriggerType::Automatic => "automatic",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(TriggerType::Manual),
            "automatic" => Some(TriggerType::Automatic),
            _ => None,
        }
    }
}

impl ApprovalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalMode::All => "all",
            ApprovalMode::Any => "any",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(ApprovalMode::All),
            "any" => Some(ApprovalMode::Any),
            _ => None,
        }
    }
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Approved => "approved",
            Outcome::Rejected => "rejected",
            Outcome::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "approved" => Some(Outcome::Approved),
            "rejected" => Some(Outcome::Rejected),
            "skipped" => Some(Outcome::Skipped),
            _ => None,
        }
    }
}

impl TerminalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminalStatus::Approved => "approved",
            TerminalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "approved" => Some(TerminalStatus::Approved),
            "rejected" => Some(TerminalStatus::Rejected),
            _ => None,
        }
    }
}

/// Where a step's outcome leads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTarget {
    /// Advance to the named step in the same template.
    #[serde(rename = "to_step")]
    Step(String),
    /// Finish the instance with the given status.
    #[serde(rename = "terminal")]
    Terminal(TerminalStatus),
}

/// One outcome-to-target edge of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub on: Outcome,
    #[serde(flatten)]
    pub target: TransitionTarget,
}

/// One stage of a template.
///
/// `display_order` is UI metadata only -- execution order is driven entirely
/// by the transition graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub step_name: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// AND semantics over `conditions` when true, OR when false.
    #[serde(default = "default_true")]
    pub all_conditions_must_match: bool,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub actions: Vec<ActionDefinition>,
    pub transitions: Vec<TransitionRule>,
}

/// A complete, immutable template definition.
///
/// The persisted record (organization, department, version, active flag)
/// lives in the database layer; this struct is the structure that gets
/// validated and versioned as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub trigger_type: TriggerType,
    pub initial_step: String,
    pub steps: Vec<StepDefinition>,
}

impl TemplateDefinition {
    /// Look up a step by name.
    pub fn step(&self, name: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.step_name == name)
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_round_trips_with_type_tag() {
        let cond = Condition::AmountRange {
            min_amount: Some(1000.0),
            max_amount: None,
        };
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["type"], "amount_range");
        assert_eq!(json["min_amount"], 1000.0);
        assert!(json.get("max_amount").is_none());

        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back, cond);
    }

    #[test]
    fn transition_rule_flattens_target() {
        let rule = TransitionRule {
            on: Outcome::Approved,
            target: TransitionTarget::Step("manager_review".into()),
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["on"], "approved");
        assert_eq!(json["to_step"], "manager_review");

        let terminal = TransitionRule {
            on: Outcome::Rejected,
            target: TransitionTarget::Terminal(TerminalStatus::Rejected),
        };
        let json = serde_json::to_value(&terminal).unwrap();
        assert_eq!(json["terminal"], "rejected");

        let back: TransitionRule = serde_json::from_value(json).unwrap();
        assert_eq!(back, terminal);
    }

    #[test]
    fn step_defaults_apply() {
        let step: StepDefinition = serde_json::from_value(serde_json::json!({
            "step_name": "review",
            "actions": [{"type": "role", "approver_role": "admin", "approval_mode": "all"}],
            "transitions": [
                {"on": "approved", "terminal": "approved"},
                {"on": "rejected", "terminal": "rejected"}
            ]
        }))
        .unwrap();
        assert!(step.all_conditions_must_match);
        assert!(step.conditions.is_empty());
        assert_eq!(step.display_order, 0);
    }

    #[test]
    fn step_lookup_by_name() {
        let def: TemplateDefinition = serde_json::from_value(serde_json::json!({
            "name": "expense approval",
            "trigger_type": "automatic",
            "initial_step": "review",
            "steps": [{
                "step_name": "review",
                "actions": [{"type": "role", "approver_role": "admin", "approval_mode": "any"}],
                "transitions": [
                    {"on": "approved", "terminal": "approved"},
                    {"on": "rejected", "terminal": "rejected"}
                ]
            }]
        }))
        .unwrap();
        assert!(def.step("review").is_some());
        assert!(def.step("missing").is_none());
    }
}
