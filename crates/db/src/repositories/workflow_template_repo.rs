//! Repository for workflow template tables.
//!
//! Templates are immutable once written: `create` and `create_version`
//! insert the template row and all structural rows (steps, conditions,
//! actions, transitions) in a single transaction, and nothing ever updates
//! them afterwards except the `active` flag. Callers run
//! `tally_core::workflow::validation::validate_template` before inserting;
//! this layer only persists.

use sqlx::{PgConnection, PgPool};
use tally_core::types::DbId;
use tally_core::workflow::template::{
    ActionDefinition, Condition, TemplateDefinition, TransitionTarget,
};

use crate::models::workflow_template::{
    assemble_definition, CreateWorkflowTemplate, TemplateListQuery, TemplateWithDefinition,
    WorkflowActionRow, WorkflowConditionRow, WorkflowStepRow, WorkflowTemplateRecord,
    WorkflowTransitionRow,
};

/// Column list for workflow_templates queries.
const COLUMNS: &str = "id, organization_id, department_id, name, description, trigger_type, \
    active, initial_step, version, supersedes_id, created_at";

/// Provides persistence for workflow templates and their structure.
pub struct WorkflowTemplateRepo;

impl WorkflowTemplateRepo {
    /// Insert a new template (version 1) with its full structure.
    pub async fn create(
        pool: &PgPool,
        input: &CreateWorkflowTemplate,
    ) -> Result<WorkflowTemplateRecord, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO workflow_templates
                (organization_id, department_id, name, description, trigger_type, initial_step)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let record = sqlx::query_as::<_, WorkflowTemplateRecord>(&query)
            .bind(input.organization_id)
            .bind(input.department_id)
            .bind(&input.definition.name)
            .bind(&input.definition.description)
            .bind(input.definition.trigger_type.as_str())
            .bind(&input.definition.initial_step)
            .fetch_one(&mut *tx)
            .await?;

        Self::insert_structure(&mut tx, record.id, &input.definition).await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Insert a new version of an existing template and deactivate the
    /// predecessor, all in one transaction. The predecessor's rows are
    /// untouched -- in-flight instances keep executing against them.
    pub async fn create_version(
        pool: &PgPool,
        predecessor: &WorkflowTemplateRecord,
        definition: &TemplateDefinition,
    ) -> Result<WorkflowTemplateRecord, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE workflow_templates SET active = FALSE WHERE id = $1")
            .bind(predecessor.id)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO workflow_templates
                (organization_id, department_id, name, description, trigger_type,
                 initial_step, version, supersedes_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        let record = sqlx::query_as::<_, WorkflowTemplateRecord>(&query)
            .bind(predecessor.organization_id)
            .bind(predecessor.department_id)
            .bind(&definition.name)
            .bind(&definition.description)
            .bind(definition.trigger_type.as_str())
            .bind(&definition.initial_step)
            .bind(predecessor.version + 1)
            .bind(predecessor.id)
            .fetch_one(&mut *tx)
            .await?;

        Self::insert_structure(&mut tx, record.id, definition).await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn insert_structure(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        template_id: DbId,
        definition: &TemplateDefinition,
    ) -> Result<(), sqlx::Error> {
        for step in &definition.steps {
            let (step_id,): (DbId,) = sqlx::query_as(
                "INSERT INTO workflow_steps
                    (template_id, step_name, display_order, description, all_conditions_must_match)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id",
            )
            .bind(template_id)
            .bind(&step.step_name)
            .bind(step.display_order)
            .bind(&step.description)
            .bind(step.all_conditions_must_match)
            .fetch_one(&mut **tx)
            .await?;

            for (position, condition) in step.conditions.iter().enumerate() {
                Self::insert_condition(&mut *tx, step_id, position as i32, condition).await?;
            }
            for (position, action) in step.actions.iter().enumerate() {
                Self::insert_action(&mut *tx, step_id, position as i32, action).await?;
            }
            for rule in &step.transitions {
                let (to_step, terminal) = match &rule.target {
                    TransitionTarget::Step(name) => (Some(name.as_str()), None),
                    TransitionTarget::Terminal(status) => (None, Some(status.as_str())),
                };
                sqlx::query(
                    "INSERT INTO workflow_transitions (step_id, on_outcome, to_step, terminal_status)
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(step_id)
                .bind(rule.on.as_str())
                .bind(to_step)
                .bind(terminal)
                .execute(&mut **tx)
                .await?;
            }
        }
        Ok(())
    }

    async fn insert_condition(
        conn: &mut PgConnection,
        step_id: DbId,
        position: i32,
        condition: &Condition,
    ) -> Result<(), sqlx::Error> {
        let (kind, min_amount, max_amount, allowed_values) = match condition {
            Condition::AmountRange {
                min_amount,
                max_amount,
            } => ("amount_range", *min_amount, *max_amount, None),
            Condition::Category { values } => ("category", None, None, Some(values.clone())),
        };
        sqlx::query(
            "INSERT INTO workflow_conditions
                (step_id, position, kind, min_amount, max_amount, allowed_values)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(step_id)
        .bind(position)
        .bind(kind)
        .bind(min_amount)
        .bind(max_amount)
        .bind(allowed_values)
        .execute(conn)
        .await?;
        Ok(())
    }

    async fn insert_action(
        conn: &mut PgConnection,
        step_id: DbId,
        position: i32,
        action: &ActionDefinition,
    ) -> Result<(), sqlx::Error> {
        let (kind, approver_role, member_id, mode) = match action {
            ActionDefinition::Role {
                approver_role,
                approval_mode,
            } => ("role", Some(approver_role.as_str()), None, approval_mode),
            ActionDefinition::SpecificMember {
                member_id,
                approval_mode,
            } => ("specific_member", None, Some(*member_id), approval_mode),
        };
        sqlx::query(
            "INSERT INTO workflow_actions
                (step_id, position, kind, approver_role, member_id, approval_mode)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(step_id)
        .bind(position)
        .bind(kind)
        .bind(approver_role)
        .bind(member_id)
        .bind(mode.as_str())
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Find a template record by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WorkflowTemplateRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflow_templates WHERE id = $1");
        sqlx::query_as::<_, WorkflowTemplateRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load a template record and reassemble its full definition.
    pub async fn find_definition(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TemplateWithDefinition>, sqlx::Error> {
        let Some(record) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let steps = sqlx::query_as::<_, WorkflowStepRow>(
            "SELECT id, template_id, step_name, display_order, description, all_conditions_must_match
             FROM workflow_steps WHERE template_id = $1
             ORDER BY display_order ASC, id ASC",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let conditions = sqlx::query_as::<_, WorkflowConditionRow>(
            "SELECT c.id, c.step_id, c.position, c.kind, c.min_amount, c.max_amount, c.allowed_values
             FROM workflow_conditions c
             JOIN workflow_steps s ON s.id = c.step_id
             WHERE s.template_id = $1
             ORDER BY c.step_id ASC, c.position ASC",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let actions = sqlx::query_as::<_, WorkflowActionRow>(
            "SELECT a.id, a.step_id, a.position, a.kind, a.approver_role, a.member_id, a.approval_mode
             FROM workflow_actions a
             JOIN workflow_steps s ON s.id = a.step_id
             WHERE s.template_id = $1
             ORDER BY a.step_id ASC, a.position ASC",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let transitions = sqlx::query_as::<_, WorkflowTransitionRow>(
            "SELECT t.id, t.step_id, t.on_outcome, t.to_step, t.terminal_status
             FROM workflow_transitions t
             JOIN workflow_steps s ON s.id = t.step_id
             WHERE s.template_id = $1
             ORDER BY t.step_id ASC, t.id ASC",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let definition = assemble_definition(&record, &steps, &conditions, &actions, &transitions)
            .map_err(|msg| sqlx::Error::Decode(msg.into()))?;

        Ok(Some(TemplateWithDefinition { record, definition }))
    }

    /// List template records for an organization, newest versions first.
    pub async fn list_by_org(
        pool: &PgPool,
        params: &TemplateListQuery,
    ) -> Result<Vec<WorkflowTemplateRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflow_templates
             WHERE organization_id = $1
               AND ($2::BIGINT IS NULL OR department_id = $2)
             ORDER BY name ASC, version DESC"
        );
        sqlx::query_as::<_, WorkflowTemplateRecord>(&query)
            .bind(params.organization_id)
            .bind(params.department_id)
            .fetch_all(pool)
            .await
    }

    /// Deactivate a template so no new instances can be started from it.
    ///
    /// Returns `false` if the template was already inactive or missing.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workflow_templates SET active = FALSE WHERE id = $1 AND active",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
