//! Route definitions for workflow instances and decisions.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::workflow_instance;
use crate::state::AppState;

/// ```text
/// POST   /                    create_instance
/// GET    /                    list_instances (?organization_id=&status=)
/// GET    /{id}                get_instance (with history)
/// POST   /{id}/decisions      record_decision
/// POST   /{id}/cancel         cancel_instance
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(workflow_instance::create_instance).get(workflow_instance::list_instances),
        )
        .route("/{id}", get(workflow_instance::get_instance))
        .route("/{id}/decisions", post(workflow_instance::record_decision))
        .route("/{id}/cancel", post(workflow_instance::cancel_instance))
}
