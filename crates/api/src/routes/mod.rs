//! Route definitions.

pub mod health;
pub mod organization;
pub mod workflow_instance;
pub mod workflow_template;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /organizations                                   create
/// /organizations/{org_id}/departments              list, create
/// /organizations/{org_id}/members                  list (?role=), create
///
/// /workflow-templates                              list, create
/// /workflow-templates/{id}                         get (record + definition)
/// /workflow-templates/{id}/versions                publish new version
/// /workflow-templates/{id}/deactivate              deactivate
///
/// /workflow-instances                              list, create
/// /workflow-instances/{id}                         get (with history)
/// /workflow-instances/{id}/decisions               record decision
/// /workflow-instances/{id}/cancel                  cancel
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/organizations", organization::router())
        .nest("/workflow-templates", workflow_template::router())
        .nest("/workflow-instances", workflow_instance::router())
}
