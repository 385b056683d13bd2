//! Route handlers for the webhook endpoint.

use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use oficina_storage::LogOutcome;
use serde_json::{json, Value};

use super::middleware::{client_address, ClientAddress};
use super::state::AppState;
use super::{json_error, MAX_BODY_SIZE, MAX_PAYLOAD_BYTES};
use crate::actions::{ActionKind, WebhookAction};
use crate::audit::AuditEntry;
use crate::relay::{error_payload, success_payload};
use crate::validation::validate_action;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /api/webhook
pub(crate) async fn handle_health() -> impl IntoResponse {
    let actions: Vec<&str> = ActionKind::ALL.iter().map(ActionKind::as_str).collect();
    let response = json!({
        "status": "ok",
        "message": "Webhook API is running",
        "timestamp": oficina_storage::now_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "actions": actions,
    });
    (StatusCode::OK, Json(response))
}

/// OPTIONS /api/webhook. CORS headers are added by the router layers.
pub(crate) async fn handle_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// POST /api/webhook
///
/// Rate limiting and authentication have already run. From here: body size,
/// JSON parse, `acao`, per-action validation, dispatch, then audit and relay.
pub(crate) async fn handle_webhook(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let client = request
        .extensions()
        .get::<ClientAddress>()
        .cloned()
        .unwrap_or_else(|| client_address(request.headers(), None));

    let bytes = match to_bytes(request.into_body(), MAX_BODY_SIZE).await {
        Ok(bytes) => bytes,
        Err(_) => return json_error(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large"),
    };

    let payload: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting non-JSON body");
            return json_error(StatusCode::BAD_REQUEST, "Invalid JSON payload");
        }
    };

    let serialized_len = serde_json::to_vec(&payload).map_or(usize::MAX, |v| v.len());
    if serialized_len > MAX_PAYLOAD_BYTES {
        return json_error(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large");
    }

    let Some(kind) = payload
        .get("acao")
        .and_then(Value::as_str)
        .and_then(ActionKind::parse)
    else {
        let known: Vec<&str> = ActionKind::ALL.iter().map(ActionKind::as_str).collect();
        return json_error(
            StatusCode::BAD_REQUEST,
            &format!("acao must be one of: {}", known.join(", ")),
        );
    };

    let action = match validate_action(kind, &payload) {
        Ok(action) => action,
        Err(errors) => {
            tracing::debug!(acao = %kind, ?errors, "payload failed validation");
            let body = json!({
                "success": false,
                "error": "Invalid payload",
                "errors": errors,
            });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    run_action(&state, &action, &payload, &client.0).await
}

async fn run_action(
    state: &AppState,
    action: &WebhookAction,
    payload: &Value,
    client: &str,
) -> Response {
    let acao = action.kind().as_str();

    let result = state
        .dispatcher
        .dispatch(action)
        .await
        .map_err(|e| e.to_string())
        .and_then(|output| {
            serde_json::to_value(&output).map_err(|e| format!("failed to encode result: {}", e))
        });

    match result {
        Ok(data) => {
            state
                .audit
                .record(AuditEntry {
                    action: acao,
                    payload,
                    outcome: LogOutcome::Success,
                    error_message: None,
                    source_address: client,
                })
                .await;
            let relay = state
                .relay
                .forward(&success_payload(acao, &data, client))
                .await;
            let body = json!({
                "success": true,
                "data": data,
                "n8n": relay,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(message) => {
            tracing::error!(acao, client, error = %message, "webhook action failed");
            state
                .audit
                .record(AuditEntry {
                    action: acao,
                    payload,
                    outcome: LogOutcome::Error,
                    error_message: Some(&message),
                    source_address: client,
                })
                .await;
            state
                .relay
                .forward(&error_payload(acao, &message, client))
                .await;
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &message)
        }
    }
}
