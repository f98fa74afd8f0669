//! Shared helpers for HTTP-level integration tests.
//!
//! Uses Axum's `tower::ServiceExt` to send requests directly to the router
//! without an actual TCP listener. The router is built through the same
//! [`build_app_router`] the production binary uses, so tests exercise the
//! full middleware stack.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use tally_api::config::ServerConfig;
use tally_api::router::build_app_router;
use tally_api::state::AppState;
use tally_engine::{PgMembershipDirectory, WorkflowRuntime};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let directory = Arc::new(PgMembershipDirectory::new(pool.clone()));
    let runtime = Arc::new(WorkflowRuntime::new(pool.clone(), directory));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        runtime,
    };

    build_app_router(state, &config)
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create an organization via the API, returning its id.
pub async fn seed_organization(pool: &PgPool, name: &str) -> i64 {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/organizations",
        serde_json::json!({ "name": name }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// Add a member via the API, returning its id.
pub async fn seed_member(pool: &PgPool, org_id: i64, display_name: &str, role: &str) -> i64 {
    let response = post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/organizations/{org_id}/members"),
        serde_json::json!({ "display_name": display_name, "role": role }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// A single-step threshold template body: amounts at or above `min` need
/// unanimous admin approval, anything below skips straight to approved.
pub fn threshold_template_json(org_id: i64, min: f64) -> serde_json::Value {
    serde_json::json!({
        "organization_id": org_id,
        "name": "expense threshold approval",
        "trigger_type": "automatic",
        "initial_step": "admin_review",
        "steps": [{
            "step_name": "admin_review",
            "all_conditions_must_match": true,
            "conditions": [
                { "type": "amount_range", "min_amount": min }
            ],
            "actions": [
                { "type": "role", "approver_role": "admin", "approval_mode": "all" }
            ],
            "transitions": [
                { "on": "approved", "terminal": "approved" },
                { "on": "rejected", "terminal": "rejected" },
                { "on": "skipped", "terminal": "approved" }
            ]
        }]
    })
}

/// Create a template via the API, returning its id.
pub async fn seed_template(pool: &PgPool, body: serde_json::Value) -> i64 {
    let response = post_json(build_test_app(pool.clone()), "/api/v1/workflow-templates", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// An instance creation body for an expense submission.
pub fn instance_json(org_id: i64, template_id: i64, amount: f64) -> serde_json::Value {
    serde_json::json!({
        "organization_id": org_id,
        "template_id": template_id,
        "entity_type": "expense",
        "entity_id": 9001,
        "attributes": { "amount": amount, "category": "travel" }
    })
}
