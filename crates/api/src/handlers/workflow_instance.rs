//! Handlers for workflow instances and decisions.
//!
//! Thin shims over the engine runtime: the runtime owns all state
//! transitions and their transaction boundaries, the handlers translate
//! errors into status codes and log the outcome.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tally_core::error::CoreError;
use tally_core::types::DbId;
use tally_db::models::status::InstanceStatus;
use tally_db::models::workflow_instance::{
    CreateWorkflowInstance, DecisionRequest, InstanceListQuery,
};
use tally_db::repositories::WorkflowInstanceRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/workflow-instances
///
/// Start an instance for a submitted object. Returns 422 when a step's
/// action resolves to no eligible approver; nothing is persisted in that
/// case.
pub async fn create_instance(
    State(state): State<AppState>,
    Json(input): Json<CreateWorkflowInstance>,
) -> AppResult<impl IntoResponse> {
    let instance = state.runtime.start_instance(&input).await?;

    tracing::info!(
        instance_id = instance.id,
        template_id = input.template_id,
        entity_type = %input.entity_type,
        entity_id = input.entity_id,
        "Workflow instance created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: instance })))
}

/// GET /api/v1/workflow-instances/{id}
///
/// Return the instance with its full step execution history.
pub async fn get_instance(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = state.runtime.get_instance(id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// GET /api/v1/workflow-instances?organization_id=&status=
pub async fn list_instances(
    State(state): State<AppState>,
    Query(params): Query<InstanceListQuery>,
) -> AppResult<impl IntoResponse> {
    let status = match params.status.as_deref() {
        None => None,
        Some(name) => Some(InstanceStatus::from_name(name).ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!(
                "unknown instance status '{name}'"
            )))
        })?),
    };

    let instances =
        WorkflowInstanceRepo::list_by_org(&state.pool, params.organization_id, status).await?;
    Ok(Json(DataResponse { data: instances }))
}

/// POST /api/v1/workflow-instances/{id}/decisions
///
/// Record an approver's decision. Identical resubmission is a no-op (200);
/// an actor outside the step's snapshot gets 403; deciding twice with a
/// different verdict, or deciding a finalized instance, gets 409.
pub async fn record_decision(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<DecisionRequest>,
) -> AppResult<impl IntoResponse> {
    let instance = state.runtime.record_decision(id, &input).await?;

    tracing::info!(
        instance_id = id,
        actor_id = input.actor_id,
        decision = %input.decision,
        status_id = instance.status_id,
        "Decision recorded"
    );

    Ok(Json(DataResponse { data: instance }))
}

/// POST /api/v1/workflow-instances/{id}/cancel
///
/// Externally-triggered cancellation, guarded like any other state change.
pub async fn cancel_instance(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let instance = state.runtime.cancel_instance(id).await?;

    tracing::info!(instance_id = id, "Workflow instance cancelled via API");

    Ok(Json(DataResponse { data: instance }))
}
