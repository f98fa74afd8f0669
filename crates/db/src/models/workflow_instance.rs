//! Workflow instance, step execution, and decision models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tally_core::types::{ActorId, DbId, Timestamp};
use tally_core::workflow::conditions::Attributes;

/// A row from the `workflow_instances` table.
///
/// `attributes` is the flat attribute map snapshotted at submission; every
/// later condition evaluation for this instance reads from it, so attribute
/// changes on the underlying business object never shift an in-flight run.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowInstance {
    pub id: DbId,
    pub template_id: DbId,
    pub organization_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub attributes: serde_json::Value,
    pub current_step: Option<String>,
    pub status_id: i16,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `step_executions` table.
///
/// Append-only: created on step entry with the actor snapshot, closed once
/// with an outcome, never deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StepExecution {
    pub id: DbId,
    pub instance_id: DbId,
    pub step_name: String,
    pub required_actor_ids: Vec<ActorId>,
    pub approval_mode: String,
    pub outcome: Option<String>,
    pub entered_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

/// A row from the `workflow_decisions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowDecision {
    pub id: DbId,
    pub execution_id: DbId,
    pub actor_id: ActorId,
    pub decision: String,
    pub note: Option<String>,
    pub decided_at: Timestamp,
}

/// Request body for starting an instance.
///
/// The caller resolves tenant context and extracts the attribute map from
/// the submitted object before calling the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflowInstance {
    pub organization_id: DbId,
    pub template_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub attributes: Attributes,
}

/// Request body for recording a decision.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionRequest {
    pub actor_id: ActorId,
    pub decision: String,
    pub note: Option<String>,
}

/// Query parameters for instance listing.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceListQuery {
    pub organization_id: DbId,
    pub status: Option<String>,
}

/// One step execution with its recorded decisions.
#[derive(Debug, Clone, Serialize)]
pub struct StepExecutionDetail {
    #[serde(flatten)]
    pub execution: StepExecution,
    pub decisions: Vec<WorkflowDecision>,
}

/// Full instance view: the instance row plus its ordered execution history.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceDetail {
    #[serde(flatten)]
    pub instance: WorkflowInstance,
    pub executions: Vec<StepExecutionDetail>,
}
