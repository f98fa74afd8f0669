//! HTTP-level integration tests for workflow instance endpoints.
//!
//! Status id assertions use the seeded `workflow_instance_statuses` values:
//! 1 in_progress, 2 approved, 3 rejected, 4 cancelled.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, get, instance_json, post_json, seed_member, seed_organization, seed_template,
    threshold_template_json,
};
use sqlx::PgPool;

async fn decide(
    pool: &PgPool,
    instance_id: i64,
    actor_id: i64,
    decision: &str,
) -> axum::response::Response {
    post_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/workflow-instances/{instance_id}/decisions"),
        serde_json::json!({ "actor_id": actor_id, "decision": decision }),
    )
    .await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn below_threshold_submission_is_approved_immediately(pool: PgPool) {
    let org = seed_organization(&pool, "Acme Retail").await;
    seed_member(&pool, org, "Ada", "admin").await;
    let template_id = seed_template(&pool, threshold_template_json(org, 1000.0)).await;

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/workflow-instances",
        instance_json(org, template_id, 500.0),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status_id"], 2);
    assert!(json["data"]["current_step"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn decision_flow_over_http(pool: PgPool) {
    let org = seed_organization(&pool, "Acme Retail").await;
    let ada = seed_member(&pool, org, "Ada", "admin").await;
    let grace = seed_member(&pool, org, "Grace", "admin").await;
    let template_id = seed_template(&pool, threshold_template_json(org, 1000.0)).await;

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/workflow-instances",
        instance_json(org, template_id, 1500.0),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let instance_id = json["data"]["id"].as_i64().unwrap();
    assert_eq!(json["data"]["status_id"], 1);
    assert_eq!(json["data"]["current_step"], "admin_review");

    // First of two ALL-mode approvers: still in progress.
    let response = decide(&pool, instance_id, ada, "approved").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status_id"], 1);

    // Second approver resolves the step and the instance.
    let response = decide(&pool, instance_id, grace, "approved").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status_id"], 2);

    // History shows one execution with both decisions.
    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/workflow-instances/{instance_id}"),
    )
    .await;
    let json = body_json(response).await;
    let executions = json["data"]["executions"].as_array().unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0]["step_name"], "admin_review");
    assert_eq!(executions[0]["outcome"], "approved");
    assert_eq!(executions[0]["decisions"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unauthorized_actor_gets_403_and_state_is_unchanged(pool: PgPool) {
    let org = seed_organization(&pool, "Acme Retail").await;
    seed_member(&pool, org, "Ada", "admin").await;
    let outsider = seed_member(&pool, org, "Oscar", "member").await;
    let template_id = seed_template(&pool, threshold_template_json(org, 1000.0)).await;

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/workflow-instances",
        instance_json(org, template_id, 1500.0),
    )
    .await;
    let instance_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = decide(&pool, instance_id, outsider, "approved").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");

    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/workflow-instances/{instance_id}"),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["status_id"], 1);
    assert_eq!(
        json["data"]["executions"][0]["decisions"].as_array().unwrap().len(),
        0
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn conflicting_and_late_decisions_get_409(pool: PgPool) {
    let org = seed_organization(&pool, "Acme Retail").await;
    let ada = seed_member(&pool, org, "Ada", "admin").await;
    let template_id = seed_template(&pool, threshold_template_json(org, 1000.0)).await;

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/workflow-instances",
        instance_json(org, template_id, 1500.0),
    )
    .await;
    let instance_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    // Sole admin approves: instance finalizes.
    let response = decide(&pool, instance_id, ada, "approved").await;
    assert_eq!(body_json(response).await["data"]["status_id"], 2);

    // Deciding a finalized instance conflicts.
    let response = decide(&pool, instance_id, ada, "rejected").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn identical_resubmission_returns_current_state(pool: PgPool) {
    let org = seed_organization(&pool, "Acme Retail").await;
    let ada = seed_member(&pool, org, "Ada", "admin").await;
    seed_member(&pool, org, "Grace", "admin").await;
    let template_id = seed_template(&pool, threshold_template_json(org, 1000.0)).await;

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/workflow-instances",
        instance_json(org, template_id, 1500.0),
    )
    .await;
    let instance_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let first = decide(&pool, instance_id, ada, "approved").await;
    assert_eq!(first.status(), StatusCode::OK);
    let retry = decide(&pool, instance_id, ada, "approved").await;
    assert_eq!(retry.status(), StatusCode::OK);
    assert_eq!(body_json(retry).await["data"]["status_id"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_approver_returns_422(pool: PgPool) {
    let org = seed_organization(&pool, "Acme Retail").await;
    // No admin members exist.
    let template_id = seed_template(&pool, threshold_template_json(org, 1000.0)).await;

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/workflow-instances",
        instance_json(org, template_id, 1500.0),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "NO_ELIGIBLE_APPROVER");

    // Nothing persisted.
    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/workflow-instances?organization_id={org}"),
    )
    .await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_endpoint_finalizes_once(pool: PgPool) {
    let org = seed_organization(&pool, "Acme Retail").await;
    seed_member(&pool, org, "Ada", "admin").await;
    let template_id = seed_template(&pool, threshold_template_json(org, 1000.0)).await;

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/workflow-instances",
        instance_json(org, template_id, 1500.0),
    )
    .await;
    let instance_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = post_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/workflow-instances/{instance_id}/cancel"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status_id"], 4);

    let response = post_json(
        common::build_test_app(pool),
        &format!("/api/v1/workflow-instances/{instance_id}/cancel"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_template_returns_404(pool: PgPool) {
    let org = seed_organization(&pool, "Acme Retail").await;

    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/workflow-instances",
        instance_json(org, 999_999, 1500.0),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn listing_filters_by_status(pool: PgPool) {
    let org = seed_organization(&pool, "Acme Retail").await;
    seed_member(&pool, org, "Ada", "admin").await;
    let template_id = seed_template(&pool, threshold_template_json(org, 1000.0)).await;

    // One auto-approved, one left in progress.
    post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/workflow-instances",
        instance_json(org, template_id, 500.0),
    )
    .await;
    post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/workflow-instances",
        instance_json(org, template_id, 1500.0),
    )
    .await;

    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/workflow-instances?organization_id={org}&status=in_progress"),
    )
    .await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);

    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/workflow-instances?organization_id={org}&status=approved"),
    )
    .await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);

    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/workflow-instances?organization_id={org}&status=snoozed"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
