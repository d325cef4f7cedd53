//! Integration tests for the Pulsemark HTTP API.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use pulsemark::api::{AppState, router};
use pulsemark_core::{HistoryStore, decode_canonical};
use serde_json::{Value, json};
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Spin up a test server over a fresh history database.
fn test_server(api_key: Option<&str>) -> (TempDir, TestServer) {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = HistoryStore::open(&temp.path().join("history.redb")).expect("open store");
    let state = AppState::new(store, api_key.map(String::from));
    let server = TestServer::new(router(state)).expect("test server");
    (temp, server)
}

/// A consistent snapshot body for POST /snapshot.
fn snapshot_body(generated_at: &str) -> Value {
    json!({
        "generated_at": generated_at,
        "total_posts": 60,
        "posts_with_sentiment": 50,
        "posts_pending": 10,
        "platform_counts": {"facebook": 21, "linkedin": 17, "twitter": 22},
        "sentiment_counts": {"negative": 12, "neutral": 28, "positive": 10},
        "model_confidences": {"synthetic": 8500},
        "validation_checks": [
            {"description": "CSV upload processed", "passed": true}
        ]
    })
}

// =============================================================================
// READ ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_reports_ok() {
    let (_temp, server) = test_server(None);

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_report_is_404_when_history_empty() {
    let (_temp, server) = test_server(None);

    let response = server.get("/report").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_post_then_get_report() {
    let (_temp, server) = test_server(None);

    let response = server
        .post("/snapshot")
        .json(&snapshot_body("2025-05-05T14:30:00Z"))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let report = server.get("/report").await;
    assert_eq!(report.status_code(), StatusCode::OK);
    let text = report.text();
    assert!(text.starts_with("# Social Media Sentiment Pipeline Status Report"));
    assert!(text.contains("Generated on: 2025-05-05 14:30:00"));
    assert!(text.contains("- ✅ CSV upload processed"));
}

#[tokio::test]
async fn test_get_snapshot_returns_latest_json() {
    let (_temp, server) = test_server(None);

    server
        .post("/snapshot")
        .json(&snapshot_body("2025-05-05T14:30:00Z"))
        .await;
    server
        .post("/snapshot")
        .json(&snapshot_body("2025-05-06T14:30:00Z"))
        .await;

    let response = server.get("/snapshot").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["total_posts"], 60);
    assert_eq!(body["generated_at"], "2025-05-06T14:30:00Z");
}

#[tokio::test]
async fn test_canonical_endpoint_round_trips() {
    let (_temp, server) = test_server(None);

    server
        .post("/snapshot")
        .json(&snapshot_body("2025-05-05T14:30:00Z"))
        .await;

    let response = server.get("/snapshot/canonical").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["encoding"], "base64");
    let bytes = BASE64
        .decode(body["data"].as_str().expect("base64 payload"))
        .expect("valid base64");
    let snapshot = decode_canonical(&bytes).expect("canonical bytes decode");
    assert_eq!(snapshot.total_posts, 60);
}

#[tokio::test]
async fn test_history_lists_timestamps_in_order() {
    let (_temp, server) = test_server(None);

    server
        .post("/snapshot")
        .json(&snapshot_body("2025-05-06T14:30:00Z"))
        .await;
    server
        .post("/snapshot")
        .json(&snapshot_body("2025-05-05T14:30:00Z"))
        .await;

    let response = server.get("/history").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let timestamps: Vec<i64> = response.json();
    assert_eq!(timestamps.len(), 2);
    assert!(timestamps[0] < timestamps[1]);
}

// =============================================================================
// WRITE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_post_rejects_inconsistent_snapshot() {
    let (_temp, server) = test_server(None);

    let mut body = snapshot_body("2025-05-05T14:30:00Z");
    body["posts_pending"] = json!(25);

    let response = server.post("/snapshot").json(&body).await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let report = server.get("/report").await;
    assert_eq!(report.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_post_rejects_out_of_range_confidence() {
    let (_temp, server) = test_server(None);

    let mut body = snapshot_body("2025-05-05T14:30:00Z");
    body["model_confidences"] = json!({"synthetic": 20000});

    let response = server.post("/snapshot").json(&body).await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_post_duplicate_timestamp_conflicts() {
    let (_temp, server) = test_server(None);

    let first = server
        .post("/snapshot")
        .json(&snapshot_body("2025-05-05T14:30:00Z"))
        .await;
    assert_eq!(first.status_code(), StatusCode::CREATED);

    let second = server
        .post("/snapshot")
        .json(&snapshot_body("2025-05-05T14:30:00Z"))
        .await;
    assert_eq!(second.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_post_requires_api_key_when_configured() {
    let (_temp, server) = test_server(Some("sekrit"));

    let denied = server
        .post("/snapshot")
        .json(&snapshot_body("2025-05-05T14:30:00Z"))
        .await;
    assert_eq!(denied.status_code(), StatusCode::UNAUTHORIZED);

    let wrong = server
        .post("/snapshot")
        .add_header(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static("guess"),
        )
        .json(&snapshot_body("2025-05-05T14:30:00Z"))
        .await;
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);

    let allowed = server
        .post("/snapshot")
        .add_header(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static("sekrit"),
        )
        .json(&snapshot_body("2025-05-05T14:30:00Z"))
        .await;
    assert_eq!(allowed.status_code(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_reads_do_not_require_api_key() {
    let (_temp, server) = test_server(Some("sekrit"));

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}
