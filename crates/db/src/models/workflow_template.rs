//! Workflow template models.
//!
//! A template is persisted as normalized rows (template, steps, conditions,
//! actions, transitions) and reassembled into the core
//! [`TemplateDefinition`] on read. The kind/mode/outcome columns are
//! CHECK-constrained in the schema, so decode failures here indicate a
//! defect, not bad user input.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tally_core::types::{DbId, Timestamp};
use tally_core::workflow::template::{
    ActionDefinition, ApprovalMode, Condition, Outcome, StepDefinition, TemplateDefinition,
    TerminalStatus, TransitionRule, TransitionTarget, TriggerType,
};

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A row from the `workflow_templates` table -- one immutable version.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowTemplateRecord {
    pub id: DbId,
    pub organization_id: DbId,
    pub department_id: Option<DbId>,
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: String,
    pub active: bool,
    pub initial_step: String,
    pub version: i32,
    pub supersedes_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// A row from the `workflow_steps` table.
#[derive(Debug, Clone, FromRow)]
pub struct WorkflowStepRow {
    pub id: DbId,
    pub template_id: DbId,
    pub step_name: String,
    pub display_order: i32,
    pub description: Option<String>,
    pub all_conditions_must_match: bool,
}

/// A row from the `workflow_conditions` table.
#[derive(Debug, Clone, FromRow)]
pub struct WorkflowConditionRow {
    pub id: DbId,
    pub step_id: DbId,
    pub position: i32,
    pub kind: String,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub allowed_values: Option<Vec<String>>,
}

/// A row from the `workflow_actions` table.
#[derive(Debug, Clone, FromRow)]
pub struct WorkflowActionRow {
    pub id: DbId,
    pub step_id: DbId,
    pub position: i32,
    pub kind: String,
    pub approver_role: Option<String>,
    pub member_id: Option<DbId>,
    pub approval_mode: String,
}

/// A row from the `workflow_transitions` table.
#[derive(Debug, Clone, FromRow)]
pub struct WorkflowTransitionRow {
    pub id: DbId,
    pub step_id: DbId,
    pub on_outcome: String,
    pub to_step: Option<String>,
    pub terminal_status: Option<String>,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Request body for creating a template (or a new version of one).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflowTemplate {
    pub organization_id: DbId,
    pub department_id: Option<DbId>,
    #[serde(flatten)]
    pub definition: TemplateDefinition,
}

/// Query parameters for template listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateListQuery {
    pub organization_id: DbId,
    pub department_id: Option<DbId>,
}

/// A template record together with its reassembled definition.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateWithDefinition {
    #[serde(flatten)]
    pub record: WorkflowTemplateRecord,
    pub definition: TemplateDefinition,
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Reassemble a [`TemplateDefinition`] from its normalized rows.
///
/// Condition/action/transition rows must be pre-sorted by `position` (the
/// repository queries order them); steps are grouped by `step_id`.
pub fn assemble_definition(
    record: &WorkflowTemplateRecord,
    steps: &[WorkflowStepRow],
    conditions: &[WorkflowConditionRow],
    actions: &[WorkflowActionRow],
    transitions: &[WorkflowTransitionRow],
) -> Result<TemplateDefinition, String> {
    let trigger_type = TriggerType::parse(&record.trigger_type)
        .ok_or_else(|| format!("unknown trigger_type '{}'", record.trigger_type))?;

    let mut step_defs = Vec::with_capacity(steps.len());
    for step in steps {
        let step_conditions = conditions
            .iter()
            .filter(|row| row.step_id == step.id)
            .map(decode_condition)
            .collect::<Result<Vec<_>, _>>()?;
        let step_actions = actions
            .iter()
            .filter(|row| row.step_id == step.id)
            .map(decode_action)
            .collect::<Result<Vec<_>, _>>()?;
        let step_transitions = transitions
            .iter()
            .filter(|row| row.step_id == step.id)
            .map(decode_transition)
            .collect::<Result<Vec<_>, _>>()?;

        step_defs.push(StepDefinition {
            step_name: step.step_name.clone(),
            display_order: step.display_order,
            description: step.description.clone(),
            all_conditions_must_match: step.all_conditions_must_match,
            conditions: step_conditions,
            actions: step_actions,
            transitions: step_transitions,
        });
    }

    Ok(TemplateDefinition {
        name: record.name.clone(),
        description: record.description.clone(),
        trigger_type,
        initial_step: record.initial_step.clone(),
        steps: step_defs,
    })
}

fn decode_condition(row: &WorkflowConditionRow) -> Result<Condition, String> {
    match row.kind.as_str() {
        "amount_range" => Ok(Condition::AmountRange {
            min_amount: row.min_amount,
            max_amount: row.max_amount,
        }),
        "category" => Ok(Condition::Category {
            values: row.allowed_values.clone().unwrap_or_default(),
        }),
        other => Err(format!("unknown condition kind '{other}'")),
    }
}

fn decode_action(row: &WorkflowActionRow) -> Result<ActionDefinition, String> {
    let approval_mode = ApprovalMode::parse(&row.approval_mode)
        .ok_or_else(|| format!("unknown approval_mode '{}'", row.approval_mode))?;
    match row.kind.as_str() {
        "role" => Ok(ActionDefinition::Role {
            approver_role: row
                .approver_role
                .clone()
                .ok_or("role action without approver_role")?,
            approval_mode,
        }),
        "specific_member" => Ok(ActionDefinition::SpecificMember {
            member_id: row.member_id.ok_or("specific_member action without member_id")?,
            approval_mode,
        }),
        other => Err(format!("unknown action kind '{other}'")),
    }
}

fn decode_transition(row: &WorkflowTransitionRow) -> Result<TransitionRule, String> {
    let on = Outcome::parse(&row.on_outcome)
        .ok_or_else(|| format!("unknown outcome '{}'", row.on_outcome))?;
    let target = match (&row.to_step, &row.terminal_status) {
        (Some(step), None) => TransitionTarget::Step(step.clone()),
        (None, Some(status)) => TransitionTarget::Terminal(
            TerminalStatus::parse(status)
                .ok_or_else(|| format!("unknown terminal status '{status}'"))?,
        ),
        _ => return Err("transition must set exactly one of to_step/terminal_status".into()),
    };
    Ok(TransitionRule { on, target })
}
