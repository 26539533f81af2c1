//! Webhook handlers for the telephony provider.

use std::sync::Arc;

use axum::{response::Response, Extension, Json};
use serde_json::Value;

use ringdesk_engine::{CallEndRequest, CallInputRequest, CallStartRequest, EngineError};

use crate::{error_response, AppState};

/// `POST /webhook/call-start`
pub async fn call_start_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<CallStartRequest>,
) -> Result<Json<Value>, Response> {
    let response = state
        .orchestrator
        .handle_call_start(request)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::json!(response)))
}

/// `POST /webhook/call-input`
///
/// Speech turns are rate limited per call before any processing; DTMF input
/// is not. The limiter is in-memory and fails open by construction.
pub async fn call_input_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<CallInputRequest>,
) -> Result<Json<Value>, Response> {
    if request.input_type.as_deref() == Some("speech") {
        if let Some(call_id) = request.call_id.as_deref() {
            let decision = state.rate_limiter.check_limit(call_id);
            if !decision.allowed {
                tracing::warn!(call_id, "speech turn rate limited");
                return Err(error_response(EngineError::RateLimited {
                    retry_after_secs: decision.retry_after_secs.unwrap_or(60),
                }));
            }
        }
    }

    let action = state
        .orchestrator
        .handle_input(request)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::json!(action)))
}

/// `POST /webhook/call-end`
pub async fn call_end_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<CallEndRequest>,
) -> Result<Json<Value>, Response> {
    let response = state
        .orchestrator
        .handle_call_end(request)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::json!(response)))
}
