//! The workflow instance runtime.
//!
//! Invoked synchronously by request handlers; every public method leaves the
//! instance in a consistent, durable state before returning. The decision
//! path runs as a single transaction that locks the instance row
//! (`SELECT ... FOR UPDATE`), so two decisions racing on the same step
//! serialize: the loser observes the winner's committed writes and either
//! no-ops (identical resubmission) or fails with a conflict -- the instance
//! can never advance twice for one step.

use std::sync::Arc;

use sqlx::PgConnection;
use tally_core::error::CoreError;
use tally_core::types::{ActorId, DbId};
use tally_core::workflow::conditions::{step_matches, Attributes};
use tally_core::workflow::resolution::{resolve_step, Decision};
use tally_core::workflow::template::{
    ApprovalMode, Outcome, StepDefinition, TemplateDefinition, TerminalStatus, TransitionTarget,
};
use tally_core::workflow::transitions;
use tally_db::models::status::InstanceStatus;
use tally_db::models::workflow_instance::{
    CreateWorkflowInstance, DecisionRequest, InstanceDetail, StepExecutionDetail,
    WorkflowInstance,
};
use tally_db::repositories::{WorkflowInstanceRepo, WorkflowTemplateRepo};
use tally_db::DbPool;

use crate::resolver::{ActorResolver, MembershipDirectory, StepActors};

/// Error type for runtime operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A domain-level error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for runtime return values.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Where the entry walk of a template lands for a given attribute map.
enum EntryPoint<'a> {
    /// First step whose conditions match: open it.
    Open(&'a StepDefinition),
    /// Every candidate step skipped through to a terminal target.
    Terminal(TerminalStatus),
}

/// Drives workflow instances against immutable template versions.
pub struct WorkflowRuntime {
    pool: DbPool,
    directory: Arc<dyn MembershipDirectory>,
}

impl WorkflowRuntime {
    pub fn new(pool: DbPool, directory: Arc<dyn MembershipDirectory>) -> Self {
        Self { pool, directory }
    }

    /// Create an instance for a submitted object and drive it to its first
    /// open step (or straight to a terminal status when every gated step
    /// skips through).
    ///
    /// Nothing is persisted when actor resolution fails -- a missing
    /// approver rejects the submission instead of parking a blocked
    /// instance.
    pub async fn start_instance(
        &self,
        input: &CreateWorkflowInstance,
    ) -> RuntimeResult<WorkflowInstance> {
        let template = WorkflowTemplateRepo::find_definition(&self.pool, input.template_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "WorkflowTemplate",
                id: input.template_id,
            })?;

        if template.record.organization_id != input.organization_id {
            return Err(CoreError::Validation(
                "template belongs to a different organization".into(),
            )
            .into());
        }
        if !template.record.active {
            return Err(CoreError::Validation(format!(
                "template {} is inactive; start instances from its active version",
                template.record.id
            ))
            .into());
        }

        let attributes = serde_json::to_value(&input.attributes)
            .map_err(|e| CoreError::Internal(format!("attribute serialization failed: {e}")))?;

        let entry = entry_walk(
            &template.definition,
            &template.definition.initial_step,
            &input.attributes,
        )?;

        let instance = match entry {
            EntryPoint::Terminal(status) => {
                let mut tx = self.pool.begin().await?;
                let instance = WorkflowInstanceRepo::insert_instance(
                    &mut tx,
                    template.record.id,
                    input.organization_id,
                    &input.entity_type,
                    input.entity_id,
                    &attributes,
                    None,
                    terminal_status(status),
                )
                .await?;
                tx.commit().await?;

                tracing::info!(
                    instance_id = instance.id,
                    template_id = template.record.id,
                    status = status.as_str(),
                    "Workflow instance resolved at submission; no step matched",
                );
                instance
            }
            EntryPoint::Open(step) => {
                // Resolve before opening the transaction; a failure here
                // must leave nothing behind.
                let actors = ActorResolver::resolve(
                    self.directory.as_ref(),
                    template.record.organization_id,
                    template.record.department_id,
                    step,
                )
                .await?;

                let mut tx = self.pool.begin().await?;
                let instance = WorkflowInstanceRepo::insert_instance(
                    &mut tx,
                    template.record.id,
                    input.organization_id,
                    &input.entity_type,
                    input.entity_id,
                    &attributes,
                    Some(&step.step_name),
                    InstanceStatus::InProgress,
                )
                .await?;
                WorkflowInstanceRepo::insert_execution(
                    &mut tx,
                    instance.id,
                    &step.step_name,
                    &actors.actor_ids,
                    actors.approval_mode.as_str(),
                )
                .await?;
                tx.commit().await?;

                tracing::info!(
                    instance_id = instance.id,
                    template_id = template.record.id,
                    step = %step.step_name,
                    approver_count = actors.actor_ids.len(),
                    "Workflow instance started",
                );
                instance
            }
        };

        Ok(instance)
    }

    /// Record an approver's decision and advance the instance if the step
    /// is now satisfied.
    ///
    /// Resubmitting the identical (actor, decision) pair for the open step
    /// is a no-op returning the current state, so network retries are safe.
    pub async fn record_decision(
        &self,
        instance_id: DbId,
        request: &DecisionRequest,
    ) -> RuntimeResult<WorkflowInstance> {
        let decision = Decision::parse(&request.decision)?;

        let mut tx = self.pool.begin().await?;

        let instance = WorkflowInstanceRepo::find_for_update(&mut tx, instance_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "WorkflowInstance",
                id: instance_id,
            })?;

        let status = instance_status(&instance)?;
        if status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "instance {instance_id} is already {}",
                status.name()
            ))
            .into());
        }

        let execution = WorkflowInstanceRepo::open_execution(&mut tx, instance_id)
            .await?
            .ok_or_else(|| {
                consistency(format!(
                    "in-progress instance {instance_id} has no open step execution"
                ))
            })?;

        if !execution.required_actor_ids.contains(&request.actor_id) {
            return Err(CoreError::Forbidden(format!(
                "actor {} is not in the approver set for step '{}'",
                request.actor_id, execution.step_name
            ))
            .into());
        }

        let recorded =
            WorkflowInstanceRepo::decisions_for_execution(&mut tx, execution.id).await?;
        if let Some(existing) = recorded.iter().find(|d| d.actor_id == request.actor_id) {
            if existing.decision == request.decision {
                // Idempotent resubmission; nothing to change.
                tx.rollback().await?;
                return self.require_instance(instance_id).await;
            }
            return Err(CoreError::Conflict(format!(
                "actor {} already decided step '{}'",
                request.actor_id, execution.step_name
            ))
            .into());
        }

        WorkflowInstanceRepo::insert_decision(
            &mut tx,
            execution.id,
            request.actor_id,
            decision.as_str(),
            request.note.as_deref(),
        )
        .await?;

        let mut pairs: Vec<(ActorId, Decision)> = recorded
            .iter()
            .map(|d| Ok((d.actor_id, Decision::parse(&d.decision)?)))
            .collect::<Result<_, CoreError>>()?;
        pairs.push((request.actor_id, decision));

        let mode = ApprovalMode::parse(&execution.approval_mode).ok_or_else(|| {
            consistency(format!(
                "execution {} has unknown approval mode '{}'",
                execution.id, execution.approval_mode
            ))
        })?;

        let Some(outcome) = resolve_step(mode, &execution.required_actor_ids, &pairs) else {
            // Step still waiting on other approvers.
            tx.commit().await?;
            tracing::info!(
                instance_id,
                step = %execution.step_name,
                actor_id = request.actor_id,
                decision = decision.as_str(),
                "Decision recorded; step still open",
            );
            return self.require_instance(instance_id).await;
        };

        WorkflowInstanceRepo::close_execution(&mut tx, execution.id, outcome.as_str()).await?;

        tracing::info!(
            instance_id,
            step = %execution.step_name,
            outcome = outcome.as_str(),
            "Step resolved",
        );

        // Templates are immutable, so reading the definition outside the
        // lock is safe.
        let template = WorkflowTemplateRepo::find_definition(&self.pool, instance.template_id)
            .await?
            .ok_or_else(|| {
                consistency(format!(
                    "template {} for instance {instance_id} not found",
                    instance.template_id
                ))
            })?;

        let attributes = instance_attributes(&instance)?;
        self.advance(
            &mut tx,
            &instance,
            &template.definition,
            template.record.department_id,
            &execution.step_name,
            outcome,
            &attributes,
        )
        .await?;

        tx.commit().await?;
        self.require_instance(instance_id).await
    }

    /// Follow transitions from a just-resolved (or skipped) step until the
    /// instance opens a new step or finalizes.
    #[allow(clippy::too_many_arguments)]
    async fn advance(
        &self,
        conn: &mut PgConnection,
        instance: &WorkflowInstance,
        definition: &TemplateDefinition,
        department_id: Option<DbId>,
        from_step: &str,
        first_outcome: Outcome,
        attributes: &Attributes,
    ) -> RuntimeResult<()> {
        let mut step = definition.step(from_step).ok_or_else(|| {
            consistency(format!(
                "instance {} references unknown step '{from_step}'",
                instance.id
            ))
        })?;
        let mut outcome = first_outcome;
        // Bounded by step count: validation makes longer skip chains
        // impossible, so exceeding this is a defect.
        let mut hops = 0usize;

        loop {
            let target = transitions::next(step, outcome).ok_or_else(|| {
                consistency(format!(
                    "step '{}' has no transition for outcome '{}'",
                    step.step_name,
                    outcome.as_str()
                ))
            })?;

            match target {
                TransitionTarget::Terminal(status) => {
                    WorkflowInstanceRepo::finalize(conn, instance.id, terminal_status(*status))
                        .await?;
                    tracing::info!(
                        instance_id = instance.id,
                        status = status.as_str(),
                        "Workflow instance finalized",
                    );
                    return Ok(());
                }
                TransitionTarget::Step(next_name) => {
                    let next = definition.step(next_name).ok_or_else(|| {
                        consistency(format!("transition targets unknown step '{next_name}'"))
                    })?;

                    if step_matches(next, attributes) {
                        let actors = self
                            .open_step(conn, instance, department_id, next)
                            .await?;
                        tracing::info!(
                            instance_id = instance.id,
                            step = %next.step_name,
                            approver_count = actors.actor_ids.len(),
                            "Advanced to next step",
                        );
                        return Ok(());
                    }

                    hops += 1;
                    if hops > definition.steps.len() {
                        return Err(consistency(format!(
                            "skip chain exceeded step count in instance {}",
                            instance.id
                        ))
                        .into());
                    }
                    step = next;
                    outcome = Outcome::Skipped;
                }
            }
        }
    }

    /// Resolve actors for a step and open its execution.
    ///
    /// A resolution failure propagates out and rolls back the caller's
    /// transaction -- the triggering decision is not half-applied.
    async fn open_step(
        &self,
        conn: &mut PgConnection,
        instance: &WorkflowInstance,
        department_id: Option<DbId>,
        step: &StepDefinition,
    ) -> RuntimeResult<StepActors> {
        let actors = ActorResolver::resolve(
            self.directory.as_ref(),
            instance.organization_id,
            department_id,
            step,
        )
        .await?;

        WorkflowInstanceRepo::insert_execution(
            conn,
            instance.id,
            &step.step_name,
            &actors.actor_ids,
            actors.approval_mode.as_str(),
        )
        .await?;
        WorkflowInstanceRepo::update_current_step(conn, instance.id, &step.step_name).await?;
        Ok(actors)
    }

    /// Cancel an in-progress instance. External trigger (org admin);
    /// guarded the same way as a decision.
    pub async fn cancel_instance(&self, instance_id: DbId) -> RuntimeResult<WorkflowInstance> {
        let mut tx = self.pool.begin().await?;

        let instance = WorkflowInstanceRepo::find_for_update(&mut tx, instance_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "WorkflowInstance",
                id: instance_id,
            })?;

        let status = instance_status(&instance)?;
        if status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "instance {instance_id} is already {}",
                status.name()
            ))
            .into());
        }

        if let Some(execution) = WorkflowInstanceRepo::open_execution(&mut tx, instance_id).await? {
            WorkflowInstanceRepo::close_execution(&mut tx, execution.id, "cancelled").await?;
        }
        WorkflowInstanceRepo::finalize(&mut tx, instance_id, InstanceStatus::Cancelled).await?;

        tx.commit().await?;

        tracing::info!(instance_id, "Workflow instance cancelled");
        self.require_instance(instance_id).await
    }

    /// Load an instance with its full execution and decision history.
    pub async fn get_instance(&self, instance_id: DbId) -> RuntimeResult<InstanceDetail> {
        let instance = self.require_instance(instance_id).await?;
        let executions =
            WorkflowInstanceRepo::executions_for_instance(&self.pool, instance_id).await?;
        let decisions =
            WorkflowInstanceRepo::decisions_for_instance(&self.pool, instance_id).await?;

        let executions = executions
            .into_iter()
            .map(|execution| {
                let own = decisions
                    .iter()
                    .filter(|d| d.execution_id == execution.id)
                    .cloned()
                    .collect();
                StepExecutionDetail {
                    execution,
                    decisions: own,
                }
            })
            .collect();

        Ok(InstanceDetail {
            instance,
            executions,
        })
    }

    async fn require_instance(&self, instance_id: DbId) -> RuntimeResult<WorkflowInstance> {
        WorkflowInstanceRepo::find_by_id(&self.pool, instance_id)
            .await?
            .ok_or(
                CoreError::NotFound {
                    entity: "WorkflowInstance",
                    id: instance_id,
                }
                .into(),
            )
    }
}

/// Walk from `start` through non-matching steps via their skip transitions.
fn entry_walk<'a>(
    definition: &'a TemplateDefinition,
    start: &str,
    attributes: &Attributes,
) -> Result<EntryPoint<'a>, CoreError> {
    let mut current = start.to_string();
    let mut hops = 0usize;

    loop {
        let step = definition.step(&current).ok_or_else(|| {
            consistency(format!("walk reached unknown step '{current}'"))
        })?;

        if step_matches(step, attributes) {
            return Ok(EntryPoint::Open(step));
        }

        hops += 1;
        if hops > definition.steps.len() {
            return Err(consistency(
                "skip chain exceeded step count during entry walk".into(),
            ));
        }

        match transitions::next(step, Outcome::Skipped).ok_or_else(|| {
            consistency(format!(
                "step '{}' skipped without a declared skipped transition",
                step.step_name
            ))
        })? {
            TransitionTarget::Step(next) => current = next.clone(),
            TransitionTarget::Terminal(status) => return Ok(EntryPoint::Terminal(*status)),
        }
    }
}

fn terminal_status(status: TerminalStatus) -> InstanceStatus {
    match status {
        TerminalStatus::Approved => InstanceStatus::Approved,
        TerminalStatus::Rejected => InstanceStatus::Rejected,
    }
}

fn instance_status(instance: &WorkflowInstance) -> Result<InstanceStatus, CoreError> {
    InstanceStatus::from_id(instance.status_id).ok_or_else(|| {
        consistency(format!(
            "instance {} has unknown status id {}",
            instance.id, instance.status_id
        ))
    })
}

fn instance_attributes(instance: &WorkflowInstance) -> Result<Attributes, CoreError> {
    serde_json::from_value(instance.attributes.clone()).map_err(|e| {
        consistency(format!(
            "instance {} has undecodable attributes: {e}",
            instance.id
        ))
    })
}

/// Fatal inconsistencies get logged at error level the moment they surface.
fn consistency(message: String) -> CoreError {
    tracing::error!(error = %message, "Workflow consistency error");
    CoreError::Consistency(message)
}
