//! Ringdesk server library logic.

pub mod api_calls;
pub mod api_webhook;
pub mod background;
pub mod config;
pub mod middleware;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ringdesk_db::DbPool;
use ringdesk_engine::{EngineError, Orchestrator};

use middleware::RateLimiter;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// The call orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// Per-call speech-turn rate limiter.
    pub rate_limiter: RateLimiter,
}

/// Maximum request body size (16 MiB). Speech webhooks carry base64 audio.
const MAX_REQUEST_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Maps an orchestrator error to an HTTP response.
///
/// Upstream speech/dialogue faults never reach here; the orchestrator folds
/// them into scripted responses. What remains is the validation-class
/// taxonomy plus internal faults.
pub fn error_response(err: EngineError) -> Response {
    let (status, body) = match &err {
        EngineError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
        EngineError::NotFound(call_id) => (
            StatusCode::NOT_FOUND,
            json!({ "error": format!("call session not found: {call_id}") }),
        ),
        EngineError::InvalidTransition { state, event } => (
            StatusCode::CONFLICT,
            json!({
                "error": format!("event {event} is not valid in state {state}"),
                "state": state.as_str(),
            }),
        ),
        EngineError::RateLimited { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "error": "rate limited", "retryAfter": retry_after_secs }),
        ),
        EngineError::Internal(msg) => {
            tracing::error!(error = %msg, "internal error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "internal error" }),
            )
        }
    };

    let mut response = (status, Json(body)).into_response();
    if let EngineError::RateLimited { retry_after_secs } = err {
        if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after_secs.to_string()) {
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, value);
        }
    }
    response
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook/call-start", post(api_webhook::call_start_handler))
        .route("/webhook/call-input", post(api_webhook::call_input_handler))
        .route("/webhook/call-end", post(api_webhook::call_end_handler))
        .route("/api/calls/{callId}", get(api_calls::get_call_handler))
        .route(
            "/api/calls/{callId}/events",
            get(api_calls::get_call_events_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
