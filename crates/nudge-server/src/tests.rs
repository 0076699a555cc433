//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use nudge_core::config::GuardConfig;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup_test_app() -> Router {
    let db = Database::in_memory().unwrap();
    let guard = Guard::new(GuardConfig::embedded().unwrap()).unwrap();
    let state = AppState::new(db, guard, ServerConfig::default()).unwrap();
    create_router(Arc::new(state))
}

async fn get_body_json(response: axum::response::Response) -> Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: &Router, uri: &str, body: Value) -> axum::response::Response {
    app.clone()
        .oneshot(
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

async fn post_empty(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn delete(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

fn night_purchase() -> Value {
    json!({
        "timestamp": "2024-03-15 02:00:00",
        "amount": 150.0,
        "description": "STEAM PURCHASE"
    })
}

/// Store a held purchase and return its confirmation id
async fn create_pending(app: &Router) -> i64 {
    let response = post_json(app, "/api/transactions", json!([night_purchase()])).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(app, "/api/pending").await;
    let json = get_body_json(response).await;
    let pending = json.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    pending[0]["id"].as_i64().unwrap()
}

// ========== Evaluate API Tests ==========

#[tokio::test]
async fn test_evaluate_night_purchase() {
    let app = setup_test_app();

    let response = post_json(&app, "/api/evaluate", night_purchase()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let flags: Vec<&str> = json["evaluation"]["flags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_str().unwrap())
        .collect();
    assert!(flags.contains(&"night_purchase"));
    assert!(flags.contains(&"impulse_suspected"));
    assert!(flags.contains(&"high_risk_confirmation_pending"));
    assert_eq!(json["evaluation"]["action"], "BLOCK_PENDING_CONFIRMATION");
    assert_eq!(json["evaluation"]["state"], "pending_confirmation");
    assert!(json["intervention"].is_object());
}

#[tokio::test]
async fn test_evaluate_daytime_purchase() {
    let app = setup_test_app();

    let response = post_json(
        &app,
        "/api/evaluate",
        json!({
            "timestamp": "2024-03-15T14:00:00",
            "amount": "50,00",
            "description": "PADARIA DO BAIRRO"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert!(json["evaluation"]["flags"].as_array().unwrap().is_empty());
    assert_eq!(json["evaluation"]["action"], "NONE");
    assert!(json["intervention"].is_null());
}

#[tokio::test]
async fn test_evaluate_does_not_store() {
    let app = setup_test_app();

    post_json(&app, "/api/evaluate", night_purchase()).await;

    let json = get_body_json(get(&app, "/api/transactions").await).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_evaluate_missing_timestamp() {
    let app = setup_test_app();

    let response = post_json(
        &app,
        "/api/evaluate",
        json!({ "amount": 150.0, "description": "Store" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let flags = json["evaluation"]["flags"].as_array().unwrap();
    assert!(flags.contains(&json!("unverified_timing")));
}

#[tokio::test]
async fn test_evaluate_invalid_record() {
    let app = setup_test_app();

    // Date without a time of day
    let response = post_json(
        &app,
        "/api/evaluate",
        json!({ "timestamp": "2024-03-15", "amount": 10.0, "description": "Store" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        "/api/evaluate",
        json!({ "timestamp": "2024-03-15 14:00", "amount": "abc", "description": "Store" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Intervention API Tests ==========

#[tokio::test]
async fn test_create_intervention_and_stats() {
    let app = setup_test_app();

    let mut body = night_purchase();
    body["risk_score"] = json!(85);
    body["goals"] = json!([{ "name": "Trip", "target_amount": 3000.0, "current_amount": 1000.0 }]);

    let response = post_json(&app, "/api/interventions", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["risk_score"], 85);
    assert_eq!(json["level"], "critical");

    let json = get_body_json(get(&app, "/api/interventions/stats").await).await;
    assert_eq!(json["total"], 1);
}

#[tokio::test]
async fn test_create_intervention_invalid_score() {
    let app = setup_test_app();

    let mut body = night_purchase();
    body["risk_score"] = json!(150);

    let response = post_json(&app, "/api/interventions", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Transaction API Tests ==========

#[tokio::test]
async fn test_create_and_list_transactions() {
    let app = setup_test_app();

    let response = post_json(
        &app,
        "/api/transactions",
        json!({
            "transactions": [
                night_purchase(),
                { "timestamp": "2024-03-15 14:00:00", "amount": 50.0, "description": "PADARIA" },
                { "timestamp": "2024-03-16", "amount": 30.0, "description": "POSTO" }
            ]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["inserted"], 2);
    assert_eq!(json["pending"], 1);
    assert_eq!(json["rejected"].as_array().unwrap().len(), 1);

    let json = get_body_json(get(&app, "/api/transactions").await).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let json = get_body_json(get(&app, "/api/transactions?flag=night_purchase").await).await;
    let night = json.as_array().unwrap();
    assert_eq!(night.len(), 1);
    assert_eq!(night[0]["description"], "STEAM PURCHASE");
    assert_eq!(night[0]["category"], "games");
}

#[tokio::test]
async fn test_create_transactions_duplicates() {
    let app = setup_test_app();
    let uri = "/api/transactions?source=import&sign=positive_is_debit";

    post_json(&app, uri, json!([night_purchase()])).await;
    let response = post_json(&app, uri, json!([night_purchase()])).await;

    let json = get_body_json(response).await;
    assert_eq!(json["inserted"], 0);
    assert_eq!(json["duplicates"], 1);
}

#[tokio::test]
async fn test_repeated_manual_entries_are_stored() {
    let app = setup_test_app();
    let ride = json!({"amount": 150.0, "description": "Uber ride"});

    for _ in 0..2 {
        let response = post_json(&app, "/api/transactions", json!([ride.clone()])).await;
        let json = get_body_json(response).await;
        assert_eq!(json["inserted"], 1);
        assert_eq!(json["duplicates"], 0);
        assert_eq!(json["pending"], 1);
    }

    let response = get(&app, "/api/pending").await;
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_transactions_invalid_source() {
    let app = setup_test_app();

    let response = post_json(
        &app,
        "/api/transactions?source=bank",
        json!([night_purchase()]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_transactions_invalid_flag() {
    let app = setup_test_app();

    let response = get(&app, "/api/transactions?flag=bogus").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_transaction_not_found() {
    let app = setup_test_app();

    let response = get(&app, "/api/transactions/99999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_correct_transaction() {
    let app = setup_test_app();

    post_json(
        &app,
        "/api/transactions",
        json!([{ "timestamp": "2024-03-15 14:00:00", "amount": 50.0, "description": "PADARIA" }]),
    )
    .await;
    let json = get_body_json(get(&app, "/api/transactions").await).await;
    let id = json[0]["id"].as_i64().unwrap();

    let uri = format!("/api/transactions/{}/correct", id);
    let response = post_json(&app, &uri, json!({ "amount": 45.0 })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["supersedes_id"], id);

    // Only the correction is listed
    let json = get_body_json(get(&app, "/api/transactions").await).await;
    let listed = json.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["amount"], 45.0);

    // A record is corrected at most once
    let response = post_json(&app, &uri, json!({ "amount": 40.0 })).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_correct_transaction_not_found() {
    let app = setup_test_app();

    let response = post_json(&app, "/api/transactions/404/correct", json!({ "amount": 1.0 })).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Confirmation API Tests ==========

#[tokio::test]
async fn test_confirm_pending() {
    let app = setup_test_app();
    let id = create_pending(&app).await;

    let response = get(&app, &format!("/api/pending/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["state"], "pending_confirmation");
    assert_eq!(json["can_proceed"], false);
    assert!(json["remaining_seconds"].as_i64().unwrap() > 0);

    let response = post_empty(&app, &format!("/api/pending/{}/confirm", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["state"], "finalized");
    assert_eq!(json["can_proceed"], true);

    // Already resolved
    let response = post_empty(&app, &format!("/api/pending/{}/cancel", id)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_pending() {
    let app = setup_test_app();
    let id = create_pending(&app).await;

    let response = post_empty(&app, &format!("/api/pending/{}/cancel", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["state"], "cancelled");

    let json = get_body_json(get(&app, "/api/pending").await).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_pending_not_found() {
    let app = setup_test_app();

    let response = get(&app, "/api/pending/99999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_empty(&app, "/api/pending/99999/confirm").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_release_pending_before_delay() {
    let app = setup_test_app();
    create_pending(&app).await;

    let response = post_empty(&app, "/api/pending/release").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());
}

// ========== Protection API Tests ==========

#[tokio::test]
async fn test_protection_disable_keeps_flags() {
    let app = setup_test_app();

    let response = post_empty(&app, "/api/protection/disable").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["enabled"], false);

    let json = get_body_json(post_json(&app, "/api/evaluate", night_purchase()).await).await;
    assert!(!json["evaluation"]["flags"].as_array().unwrap().is_empty());
    assert_eq!(json["evaluation"]["action"], "NONE");
    assert_eq!(json["evaluation"]["state"], "approved");

    let json = get_body_json(post_empty(&app, "/api/protection/enable").await).await;
    assert_eq!(json["enabled"], true);
}

#[tokio::test]
async fn test_protection_change_from_shared_database_applies() {
    let db = Database::in_memory().unwrap();
    let guard = Guard::new(GuardConfig::embedded().unwrap()).unwrap();
    let state = AppState::new(db.clone(), guard, ServerConfig::default()).unwrap();
    let app = create_router(Arc::new(state));

    // Another process (the CLI) turns protection off on the same database
    let mut protection = db.load_protection().unwrap();
    protection.disable();
    db.save_protection(&protection, "protection_disable").unwrap();

    let json = get_body_json(post_json(&app, "/api/evaluate", night_purchase()).await).await;
    assert_eq!(json["evaluation"]["action"], "NONE");
    let json = get_body_json(get(&app, "/api/protection").await).await;
    assert_eq!(json["enabled"], false);

    protection.enable();
    db.save_protection(&protection, "protection_enable").unwrap();
    let json = get_body_json(post_json(&app, "/api/evaluate", night_purchase()).await).await;
    assert_eq!(json["evaluation"]["action"], "BLOCK_PENDING_CONFIRMATION");
}

#[tokio::test]
async fn test_protection_bypass() {
    let app = setup_test_app();

    let response = post_json(&app, "/api/protection/bypass", json!({ "minutes": 15 })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["bypass_active"], true);
    assert!(json["bypass_until"].is_string());

    let json = get_body_json(get(&app, "/api/protection").await).await;
    assert_eq!(json["bypass_active"], true);
}

#[tokio::test]
async fn test_protection_bypass_default_and_limits() {
    let app = setup_test_app();

    let response = post_empty(&app, "/api/protection/bypass").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(&app, "/api/protection/bypass", json!({ "minutes": 0 })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(&app, "/api/protection/bypass", json!({ "minutes": 5000 })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Report API Tests ==========

#[tokio::test]
async fn test_decendio_report() {
    let app = setup_test_app();

    post_json(
        &app,
        "/api/transactions",
        json!([
            { "timestamp": "2024-03-05 09:00:00", "amount": 7200.0, "description": "SALARIO", "kind": "credit" },
            { "timestamp": "2024-03-15 14:00:00", "amount": 50.0, "description": "PADARIA" },
            { "timestamp": "2024-03-25 14:00:00", "amount": 80.0, "description": "MERCADO" }
        ]),
    )
    .await;

    let response = get(&app, "/api/reports/decendio?year=2024&month=3").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let periods = json["periods"].as_array().unwrap();
    assert_eq!(periods.len(), 3);
    assert_eq!(periods[0]["income"], 7200.0);
    assert_eq!(periods[1]["expenses"], 50.0);
    assert_eq!(periods[2]["expenses"], 80.0);

    let response = get(&app, "/api/reports/decendio?year=2024&month=13").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_flag_report() {
    let app = setup_test_app();
    create_pending(&app).await;

    let response = get(&app, "/api/reports/flags").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let night = json
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["flag"] == "night_purchase")
        .unwrap();
    assert_eq!(night["count"], 1);

    let response = get(&app, "/api/reports/flags?from=2024-03-20&to=2024-03-01").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_report() {
    let app = setup_test_app();
    let uri = "/api/transactions?source=import";
    let records = json!([
        { "timestamp": "2024-03-05 09:00", "amount": 2000.0, "description": "SALARIO EMPRESA" },
        { "timestamp": "2024-03-06 12:00", "amount": -50.0, "description": "PADARIA SOL" },
        { "timestamp": "2024-03-07 12:00", "amount": -150.0, "description": "STEAM PURCHASE" },
    ]);
    let response = post_json(&app, uri, records).await;
    assert_eq!(get_body_json(response).await["inserted"], 3);

    let response = get(&app, "/api/reports/summary").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["income"], 2000.0);
    assert_eq!(json["expenses"], 200.0);
    assert_eq!(json["savings_rate"], 90.0);
    let categories = json["categories"].as_array().unwrap();
    assert_eq!(categories[0]["category"], "games");
    assert_eq!(categories[0]["percentage"], 75.0);

    let response = get(&app, "/api/reports/summary?from=2024-03-07&to=2024-03-07").await;
    let json = get_body_json(response).await;
    assert_eq!(json["expenses"], 150.0);
    assert_eq!(json["income"], 0.0);

    let response = get(&app, "/api/reports/summary?from=2024-03-20&to=2024-03-01").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Goal API Tests ==========

#[tokio::test]
async fn test_goal_crud() {
    let app = setup_test_app();

    let response = post_json(
        &app,
        "/api/goals",
        json!({ "name": "Emergency fund", "target_amount": 5000.0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = get_body_json(response).await;
    let id = json["id"].as_i64().unwrap();
    assert_eq!(json["status"], "active");
    assert_eq!(json["current_amount"], 0.0);

    let response = post_json(
        &app,
        &format!("/api/goals/{}/progress", id),
        json!({ "current_amount": 5000.0 }),
    )
    .await;
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "completed");

    // Completed goals only show up with ?all=true
    let json = get_body_json(get(&app, "/api/goals").await).await;
    assert!(json.as_array().unwrap().is_empty());
    let json = get_body_json(get(&app, "/api/goals?all=true").await).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let response = post_json(
        &app,
        &format!("/api/goals/{}/status", id),
        json!({ "status": "paused" }),
    )
    .await;
    assert_eq!(get_body_json(response).await["status"], "paused");

    let response = delete(&app, &format!("/api/goals/{}", id)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = get(&app, &format!("/api/goals/{}", id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = delete(&app, &format!("/api/goals/{}", id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_goal_invalid_target() {
    let app = setup_test_app();

    let response = post_json(&app, "/api/goals", json!({ "name": "Trip", "target_amount": 0.0 })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        &app,
        "/api/goals/999/progress",
        json!({ "current_amount": 10.0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_evaluate_uses_stored_goals() {
    let app = setup_test_app();
    post_json(
        &app,
        "/api/goals",
        json!({ "name": "Emergency fund", "target_amount": 5000.0 }),
    )
    .await;

    let json = get_body_json(post_json(&app, "/api/evaluate", night_purchase()).await).await;
    let components = json["intervention"]["components"].as_array().unwrap();
    let comparison = components
        .iter()
        .find(|c| c["type"] == "comparison")
        .expect("stored goal is compared");
    assert_eq!(
        comparison["content"]["comparisons"][0]["goal_name"],
        "Emergency fund"
    );

    // Goals in the request replace the stored ones
    let mut body = night_purchase();
    body["goals"] = json!([]);
    let json = get_body_json(post_json(&app, "/api/evaluate", body).await).await;
    let components = json["intervention"]["components"].as_array().unwrap();
    assert!(!components.iter().any(|c| c["type"] == "comparison"));
}

// ========== Alert API Tests ==========

#[tokio::test]
async fn test_alerts_list_and_acknowledge() {
    let app = setup_test_app();
    create_pending(&app).await;

    let json = get_body_json(get(&app, "/api/alerts").await).await;
    let alerts = json.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0]["message"]
        .as_str()
        .unwrap()
        .contains("STEAM PURCHASE"));
    assert_eq!(alerts[0]["action"], "BLOCK_PENDING_CONFIRMATION");
    let id = alerts[0]["id"].as_i64().unwrap();

    let response = post_empty(&app, &format!("/api/alerts/{}/acknowledge", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(!json["acknowledged_at"].is_null());

    let json = get_body_json(get(&app, "/api/alerts").await).await;
    assert!(json.as_array().unwrap().is_empty());
    let json = get_body_json(get(&app, "/api/alerts?include_acknowledged=true").await).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let response = post_empty(&app, "/api/alerts/999/acknowledge").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unflagged_purchase_raises_no_alert() {
    let app = setup_test_app();
    let lunch = json!({ "timestamp": "2024-03-15 12:00", "amount": 20.0, "description": "PADARIA SOL" });
    post_json(&app, "/api/transactions", json!([lunch])).await;

    let json = get_body_json(get(&app, "/api/alerts").await).await;
    assert!(json.as_array().unwrap().is_empty());
}

// ========== Status API Tests ==========

#[tokio::test]
async fn test_status() {
    let app = setup_test_app();
    create_pending(&app).await;

    let response = get(&app, "/api/status").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total_transactions"], 1);
    assert_eq!(json["pending_confirmations"], 1);
    assert_eq!(json["protection"]["enabled"], true);
}

#[tokio::test]
async fn test_config() {
    let app = setup_test_app();

    let json = get_body_json(get(&app, "/api/config").await).await;
    assert_eq!(json["night"]["start"], "00:00");
    assert_eq!(json["impulse"]["threshold"], 100.0);
    assert_eq!(json["confirmation"]["delay_minutes"], 5);
}

#[tokio::test]
async fn test_audit_log_records_protection_changes() {
    let app = setup_test_app();
    post_empty(&app, "/api/protection/disable").await;

    let json = get_body_json(get(&app, "/api/audit?limit=10").await).await;
    let entries = json.as_array().unwrap();
    assert!(entries.iter().any(|e| e["action"] == "protection_disable"));
}

#[tokio::test]
async fn test_security_headers() {
    let app = setup_test_app();

    let response = get(&app, "/api/status").await;
    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("cache-control").unwrap(), "no-store");
}
