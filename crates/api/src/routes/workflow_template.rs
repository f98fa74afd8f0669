//! Route definitions for workflow template management.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::workflow_template;
use crate::state::AppState;

/// ```text
/// POST   /                    create_template
/// GET    /                    list_templates (?organization_id=&department_id=)
/// GET    /{id}                get_template
/// POST   /{id}/versions       create_template_version
/// POST   /{id}/deactivate     deactivate_template
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(workflow_template::create_template).get(workflow_template::list_templates),
        )
        .route("/{id}", get(workflow_template::get_template))
        .route(
            "/{id}/versions",
            post(workflow_template::create_template_version),
        )
        .route(
            "/{id}/deactivate",
            post(workflow_template::deactivate_template),
        )
}
