//! Route definitions for organizations, departments, and members.

use axum::routing::post;
use axum::Router;

use crate::handlers::organization;
use crate::state::AppState;

/// ```text
/// POST   /                            create_organization
/// POST   /{org_id}/departments        create_department
/// GET    /{org_id}/departments        list_departments
/// POST   /{org_id}/members            create_member
/// GET    /{org_id}/members            list_members (?role=)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(organization::create_organization))
        .route(
            "/{org_id}/departments",
            post(organization::create_department).get(organization::list_departments),
        )
        .route(
            "/{org_id}/members",
            post(organization::create_member).get(organization::list_members),
        )
}
