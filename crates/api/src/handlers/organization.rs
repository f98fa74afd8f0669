//! Handlers for organizations, departments, and members.
//!
//! Tenant provisioning proper (billing, onboarding flows) lives elsewhere;
//! these endpoints carry the minimal membership data the approval engine
//! resolves actors from.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tally_core::error::CoreError;
use tally_core::types::DbId;
use tally_db::models::organization::{
    CreateDepartment, CreateOrgMember, CreateOrganization, MemberListQuery,
};
use tally_db::repositories::{DepartmentRepo, MemberRepo, OrganizationRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/organizations
pub async fn create_organization(
    State(state): State<AppState>,
    Json(input): Json<CreateOrganization>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "organization name must not be empty".into(),
        )));
    }

    let organization = OrganizationRepo::create(&state.pool, &input).await?;

    tracing::info!(organization_id = organization.id, "Organization created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: organization })))
}

/// POST /api/v1/organizations/{org_id}/departments
pub async fn create_department(
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
    Json(input): Json<CreateDepartment>,
) -> AppResult<impl IntoResponse> {
    ensure_organization_exists(&state, org_id).await?;

    let department = DepartmentRepo::create(&state.pool, org_id, &input.name).await?;

    tracing::info!(
        organization_id = org_id,
        department_id = department.id,
        "Department created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: department })))
}

/// GET /api/v1/organizations/{org_id}/departments
pub async fn list_departments(
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_organization_exists(&state, org_id).await?;
    let departments = DepartmentRepo::list_by_org(&state.pool, org_id).await?;
    Ok(Json(DataResponse { data: departments }))
}

/// POST /api/v1/organizations/{org_id}/members
pub async fn create_member(
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
    Json(input): Json<CreateOrgMember>,
) -> AppResult<impl IntoResponse> {
    ensure_organization_exists(&state, org_id).await?;

    if input.role.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "member role must not be empty".into(),
        )));
    }

    let member = MemberRepo::create(&state.pool, org_id, &input).await?;

    tracing::info!(
        organization_id = org_id,
        member_id = member.id,
        role = %member.role,
        "Member added"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: member })))
}

/// GET /api/v1/organizations/{org_id}/members?role=
pub async fn list_members(
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
    Query(params): Query<MemberListQuery>,
) -> AppResult<impl IntoResponse> {
    ensure_organization_exists(&state, org_id).await?;
    let members = MemberRepo::list_by_org(&state.pool, org_id, &params).await?;
    Ok(Json(DataResponse { data: members }))
}

async fn ensure_organization_exists(state: &AppState, org_id: DbId) -> AppResult<()> {
    OrganizationRepo::find_by_id(&state.pool, org_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Organization",
            id: org_id,
        }))?;
    Ok(())
}
