//! The webhook HTTP surface, built on `axum`.
//!
//! Endpoints:
//! - GET     /api/webhook  - Health payload
//! - OPTIONS /api/webhook  - CORS preflight (204, no body)
//! - POST    /api/webhook  - Run one action
//!
//! Every response carries the security and CORS headers. POSTs pass the
//! rate limiter, then authentication, before reaching the handler.

mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use self::handlers::{handle_health, handle_not_found, handle_preflight, handle_webhook};
use self::middleware::{auth_middleware, rate_limit_middleware};

pub use self::middleware::{client_address, ClientAddress};
pub use self::state::{storage_from_config, AppState};

pub const WEBHOOK_PATH: &str = "/api/webhook";

/// Largest accepted payload once re-serialized: 100 000 bytes.
pub const MAX_PAYLOAD_BYTES: usize = 100_000;

/// Raw body read limit: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-xss-protection", "1; mode=block"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "geolocation=(), microphone=(), camera=()"),
];

const CORS_HEADERS: &[(&str, &str)] = &[
    ("access-control-allow-methods", "GET, POST, OPTIONS"),
    ("access-control-allow-headers", "Content-Type, Authorization"),
    ("access-control-max-age", "86400"),
];

/// JSON error body: `{"success": false, "error": message}`.
pub(crate) fn json_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "success": false, "error": message })),
    )
        .into_response()
}

/// Build the router over shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route(
            WEBHOOK_PATH,
            get(handle_health)
                .post(handle_webhook)
                .options(handle_preflight),
        )
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    for &(name, value) in SECURITY_HEADERS.iter().chain(CORS_HEADERS) {
        router = router.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }

    router
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("access-control-allow-origin"),
            state.cors_origin.clone(),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
