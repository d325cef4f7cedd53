//! # HTTP API
//!
//! Axum server over the snapshot history.
//!
//! Read endpoints serve the newest published snapshot in three shapes
//! (rendered Markdown, JSON, canonical bytes as base64). The single write
//! endpoint accepts a snapshot, audits it, and appends it to the history.
//! Publication is guarded by an optional API key (constant-time compare)
//! and a per-process rate limit.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use pulsemark_core::{
    HistoryStore, StatusSnapshot, StoreError, audit_snapshot, encode_canonical, render_report,
};

/// Header carrying the publish credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Publish attempts allowed per minute, per process.
const PUBLISH_PER_MINUTE: u32 = 60;

/// Failures bringing the server up.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// =============================================================================
// STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    store: Arc<HistoryStore>,
    api_key: Option<Arc<str>>,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl AppState {
    /// Build server state around an open history store.
    #[must_use]
    pub fn new(store: HistoryStore, api_key: Option<String>) -> Self {
        let per_minute = NonZeroU32::new(PUBLISH_PER_MINUTE).unwrap_or(NonZeroU32::MIN);
        Self {
            store: Arc::new(store),
            api_key: api_key.map(Into::into),
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
        }
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the API router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/report", get(get_report))
        .route("/snapshot", get(get_snapshot).post(post_snapshot))
        .route("/snapshot/canonical", get(get_canonical))
        .route("/history", get(get_history))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Open the history database and serve the API on `addr`.
pub async fn serve(
    db_path: &Path,
    addr: SocketAddr,
    api_key: Option<String>,
) -> Result<(), ServeError> {
    let store = HistoryStore::open(db_path)?;
    let state = AppState::new(store, api_key);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, auth = state.api_key.is_some(), "pulsemark API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// =============================================================================
// HANDLERS
// =============================================================================

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn store_failure(err: &StoreError) -> Response {
    tracing::error!("history store failure: {err}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "history store failure")
}

async fn get_health() -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

async fn get_report(State(state): State<AppState>) -> Response {
    match state.store.latest() {
        Err(err) => store_failure(&err),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "no snapshots published"),
        Ok(Some(snapshot)) => (
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            render_report(&snapshot),
        )
            .into_response(),
    }
}

async fn get_snapshot(State(state): State<AppState>) -> Response {
    match state.store.latest() {
        Err(err) => store_failure(&err),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "no snapshots published"),
        Ok(Some(snapshot)) => Json(snapshot).into_response(),
    }
}

async fn get_canonical(State(state): State<AppState>) -> Response {
    let snapshot = match state.store.latest() {
        Err(err) => return store_failure(&err),
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "no snapshots published"),
        Ok(Some(snapshot)) => snapshot,
    };
    match encode_canonical(&snapshot) {
        Err(err) => {
            tracing::error!("canonical encoding failure: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "encoding failure")
        }
        Ok(bytes) => Json(serde_json::json!({
            "encoding": "base64",
            "data": BASE64.encode(bytes),
        }))
        .into_response(),
    }
}

async fn get_history(State(state): State<AppState>) -> Response {
    match state.store.timestamps() {
        Err(err) => store_failure(&err),
        Ok(timestamps) => Json(timestamps).into_response(),
    }
}

async fn post_snapshot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(snapshot): Json<StatusSnapshot>,
) -> Response {
    if state.limiter.check().is_err() {
        return error_response(StatusCode::TOO_MANY_REQUESTS, "publish rate limit exceeded");
    }

    if let Some(expected) = &state.api_key {
        let provided = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let matches: bool = provided
            .as_bytes()
            .ct_eq(expected.as_bytes())
            .into();
        if !matches {
            return error_response(StatusCode::UNAUTHORIZED, "missing or invalid API key");
        }
    }

    let audit = audit_snapshot(&snapshot);
    if !audit.is_consistent() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "error": "snapshot rejected by audit",
                "findings": audit,
            })),
        )
            .into_response();
    }

    match state.store.append(&snapshot) {
        Ok(stored) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "stored": stored })),
        )
            .into_response(),
        Err(StoreError::DuplicateTimestamp(ts)) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "snapshot for this generation time already stored",
                "stored": ts,
            })),
        )
            .into_response(),
        Err(err) => store_failure(&err),
    }
}
