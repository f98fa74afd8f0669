//! Repository for workflow instances, step executions, and decisions.
//!
//! Methods that participate in the engine's decision transaction take a
//! `&mut PgConnection` so the engine can compose them under one
//! `pool.begin()`; plain reads take `&PgPool`.

use sqlx::{PgConnection, PgPool};
use tally_core::types::{ActorId, DbId};

use crate::models::status::InstanceStatus;
use crate::models::workflow_instance::{
    StepExecution, WorkflowDecision, WorkflowInstance,
};

/// Column list for workflow_instances queries.
const INSTANCE_COLUMNS: &str = "id, template_id, organization_id, entity_type, entity_id, \
    attributes, current_step, status_id, created_at, updated_at";

/// Column list for step_executions queries.
const EXECUTION_COLUMNS: &str = "id, instance_id, step_name, required_actor_ids, approval_mode, \
    outcome, entered_at, resolved_at";

/// Column list for workflow_decisions queries.
const DECISION_COLUMNS: &str = "id, execution_id, actor_id, decision, note, decided_at";

/// Provides persistence for workflow instances and their execution history.
pub struct WorkflowInstanceRepo;

impl WorkflowInstanceRepo {
    /// Insert a new instance row.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_instance(
        conn: &mut PgConnection,
        template_id: DbId,
        organization_id: DbId,
        entity_type: &str,
        entity_id: DbId,
        attributes: &serde_json::Value,
        current_step: Option<&str>,
        status: InstanceStatus,
    ) -> Result<WorkflowInstance, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_instances
                (template_id, organization_id, entity_type, entity_id, attributes,
                 current_step, status_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {INSTANCE_COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(template_id)
            .bind(organization_id)
            .bind(entity_type)
            .bind(entity_id)
            .bind(attributes)
            .bind(current_step)
            .bind(status.id())
            .fetch_one(conn)
            .await
    }

    /// Find an instance by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WorkflowInstance>, sqlx::Error> {
        let query = format!("SELECT {INSTANCE_COLUMNS} FROM workflow_instances WHERE id = $1");
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lock and load an instance row for the duration of a transaction.
    ///
    /// Serializes concurrent decisions on the same instance: the second
    /// writer blocks here until the first commits, then observes its writes.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<WorkflowInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {INSTANCE_COLUMNS} FROM workflow_instances WHERE id = $1 FOR UPDATE"
        );
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// List instances for an organization, optionally filtered by status.
    pub async fn list_by_org(
        pool: &PgPool,
        organization_id: DbId,
        status: Option<InstanceStatus>,
    ) -> Result<Vec<WorkflowInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {INSTANCE_COLUMNS} FROM workflow_instances
             WHERE organization_id = $1
               AND ($2::SMALLINT IS NULL OR status_id = $2)
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(organization_id)
            .bind(status.map(|s| s.id()))
            .fetch_all(pool)
            .await
    }

    /// Move an in-progress instance to a new current step.
    pub async fn update_current_step(
        conn: &mut PgConnection,
        id: DbId,
        current_step: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE workflow_instances SET current_step = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(current_step)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Finalize an instance with a terminal status.
    pub async fn finalize(
        conn: &mut PgConnection,
        id: DbId,
        status: InstanceStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE workflow_instances
             SET status_id = $2, current_step = NULL, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.id())
        .execute(conn)
        .await?;
        Ok(())
    }

    // -- Step executions ----------------------------------------------------

    /// Open a step execution with the resolved actor snapshot.
    pub async fn insert_execution(
        conn: &mut PgConnection,
        instance_id: DbId,
        step_name: &str,
        required_actor_ids: &[ActorId],
        approval_mode: &str,
    ) -> Result<StepExecution, sqlx::Error> {
        let query = format!(
            "INSERT INTO step_executions (instance_id, step_name, required_actor_ids, approval_mode)
             VALUES ($1, $2, $3, $4)
             RETURNING {EXECUTION_COLUMNS}"
        );
        sqlx::query_as::<_, StepExecution>(&query)
            .bind(instance_id)
            .bind(step_name)
            .bind(required_actor_ids)
            .bind(approval_mode)
            .fetch_one(conn)
            .await
    }

    /// Load the unresolved execution for an instance, if any.
    ///
    /// The partial unique index on `(instance_id) WHERE resolved_at IS NULL`
    /// guarantees at most one.
    pub async fn open_execution(
        conn: &mut PgConnection,
        instance_id: DbId,
    ) -> Result<Option<StepExecution>, sqlx::Error> {
        let query = format!(
            "SELECT {EXECUTION_COLUMNS} FROM step_executions
             WHERE instance_id = $1 AND resolved_at IS NULL"
        );
        sqlx::query_as::<_, StepExecution>(&query)
            .bind(instance_id)
            .fetch_optional(conn)
            .await
    }

    /// Close an execution with its outcome.
    pub async fn close_execution(
        conn: &mut PgConnection,
        execution_id: DbId,
        outcome: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE step_executions SET outcome = $2, resolved_at = NOW() WHERE id = $1",
        )
        .bind(execution_id)
        .bind(outcome)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// List all executions for an instance in entry order.
    pub async fn executions_for_instance(
        pool: &PgPool,
        instance_id: DbId,
    ) -> Result<Vec<StepExecution>, sqlx::Error> {
        let query = format!(
            "SELECT {EXECUTION_COLUMNS} FROM step_executions
             WHERE instance_id = $1
             ORDER BY entered_at ASC, id ASC"
        );
        sqlx::query_as::<_, StepExecution>(&query)
            .bind(instance_id)
            .fetch_all(pool)
            .await
    }

    // -- Decisions ----------------------------------------------------------

    /// Record an actor's decision on an execution.
    pub async fn insert_decision(
        conn: &mut PgConnection,
        execution_id: DbId,
        actor_id: ActorId,
        decision: &str,
        note: Option<&str>,
    ) -> Result<WorkflowDecision, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_decisions (execution_id, actor_id, decision, note)
             VALUES ($1, $2, $3, $4)
             RETURNING {DECISION_COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowDecision>(&query)
            .bind(execution_id)
            .bind(actor_id)
            .bind(decision)
            .bind(note)
            .fetch_one(conn)
            .await
    }

    /// List decisions recorded for an execution, oldest first.
    pub async fn decisions_for_execution(
        conn: &mut PgConnection,
        execution_id: DbId,
    ) -> Result<Vec<WorkflowDecision>, sqlx::Error> {
        let query = format!(
            "SELECT {DECISION_COLUMNS} FROM workflow_decisions
             WHERE execution_id = $1
             ORDER BY decided_at ASC, id ASC"
        );
        sqlx::query_as::<_, WorkflowDecision>(&query)
            .bind(execution_id)
            .fetch_all(conn)
            .await
    }

    /// List all decisions across an instance's executions, oldest first.
    pub async fn decisions_for_instance(
        pool: &PgPool,
        instance_id: DbId,
    ) -> Result<Vec<WorkflowDecision>, sqlx::Error> {
        let query = format!(
            "SELECT d.id, d.execution_id, d.actor_id, d.decision, d.note, d.decided_at
             FROM workflow_decisions d
             JOIN step_executions e ON e.id = d.execution_id
             WHERE e.instance_id = $1
             ORDER BY d.decided_at ASC, d.id ASC"
        );
        sqlx::query_as::<_, WorkflowDecision>(&query)
            .bind(instance_id)
            .fetch_all(pool)
            .await
    }
}
