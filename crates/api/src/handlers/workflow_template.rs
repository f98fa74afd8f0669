//! Handlers for workflow template management.
//!
//! Templates are validated structurally before anything is written and are
//! immutable once created; edits publish a new version.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tally_core::error::CoreError;
use tally_core::types::DbId;
use tally_core::workflow::template::TemplateDefinition;
use tally_core::workflow::validation::validate_template;
use tally_db::models::workflow_template::{CreateWorkflowTemplate, TemplateListQuery};
use tally_db::repositories::{OrganizationRepo, WorkflowTemplateRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/workflow-templates
///
/// Create a template (version 1). Structural validation failures reject the
/// whole definition with field-level messages; nothing partial persists.
pub async fn create_template(
    State(state): State<AppState>,
    Json(input): Json<CreateWorkflowTemplate>,
) -> AppResult<impl IntoResponse> {
    OrganizationRepo::find_by_id(&state.pool, input.organization_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Organization",
            id: input.organization_id,
        }))?;

    validate_template(&input.definition)?;

    let record = WorkflowTemplateRepo::create(&state.pool, &input).await?;

    tracing::info!(
        template_id = record.id,
        organization_id = record.organization_id,
        name = %record.name,
        "Workflow template created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

/// GET /api/v1/workflow-templates/{id}
///
/// Return the template record with its full reassembled definition.
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let template = WorkflowTemplateRepo::find_definition(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "WorkflowTemplate",
            id,
        }))?;

    Ok(Json(DataResponse { data: template }))
}

/// GET /api/v1/workflow-templates?organization_id=&department_id=
pub async fn list_templates(
    State(state): State<AppState>,
    Query(params): Query<TemplateListQuery>,
) -> AppResult<impl IntoResponse> {
    let templates = WorkflowTemplateRepo::list_by_org(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// POST /api/v1/workflow-templates/{id}/versions
///
/// Publish a new version of a template. The predecessor is deactivated but
/// untouched structurally; in-flight instances keep executing against it.
pub async fn create_template_version(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(definition): Json<TemplateDefinition>,
) -> AppResult<impl IntoResponse> {
    let predecessor = WorkflowTemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "WorkflowTemplate",
            id,
        }))?;

    if !predecessor.active {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "template {id} is inactive; publish new versions from the active one"
        ))));
    }

    validate_template(&definition)?;

    let record = WorkflowTemplateRepo::create_version(&state.pool, &predecessor, &definition).await?;

    tracing::info!(
        template_id = record.id,
        supersedes_id = id,
        version = record.version,
        "Workflow template version published"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: record })))
}

/// POST /api/v1/workflow-templates/{id}/deactivate
///
/// Stop new instances from starting on this template. In-flight instances
/// are unaffected.
pub async fn deactivate_template(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let record = WorkflowTemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "WorkflowTemplate",
            id,
        }))?;

    if !record.active {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "template {id} is already inactive"
        ))));
    }

    WorkflowTemplateRepo::deactivate(&state.pool, id).await?;

    tracing::info!(template_id = id, "Workflow template deactivated");

    Ok(Json(DataResponse { data: () }))
}
