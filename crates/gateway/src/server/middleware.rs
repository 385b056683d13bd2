//! HTTP middleware: rate limiting and shared-secret authentication.
//!
//! Both only act on POST requests; health checks and CORS preflights pass
//! straight through.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::state::AppState;
use crate::auth::is_authorized;
use crate::rate_limit::now_ms;

/// Address the request is attributed to, for rate limiting and audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddress(pub String);

/// First `X-Forwarded-For` entry, then `X-Real-IP`, then the socket peer.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientAddress {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let forwarded = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let address = forwarded
        .or_else(|| header("x-real-ip"))
        .map(str::to_string)
        .or_else(|| peer.map(|p| p.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string());
    ClientAddress(address)
}

fn resolve_client(request: &Request) -> ClientAddress {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    client_address(request.headers(), peer)
}

/// Count the request against its client's window. Rejections carry
/// `Retry-After` and the `X-RateLimit-*` headers.
pub(crate) async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::POST {
        return next.run(request).await;
    }

    let client = resolve_client(&request);
    let decision = state.rate_limiter.check(&client.0);
    if decision.allowed {
        request.extensions_mut().insert(client);
        return next.run(request).await;
    }

    let retry_after = decision.retry_after_secs(now_ms());
    tracing::warn!(client = %client.0, retry_after, "rate limit exceeded");

    let body = json!({
        "success": false,
        "error": "Too many requests",
        "retryAfter": retry_after,
    });
    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert("retry-after", HeaderValue::from(retry_after));
    headers.insert(
        "x-ratelimit-limit",
        HeaderValue::from(state.rate_limiter.max_requests()),
    );
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert(
        "x-ratelimit-reset",
        HeaderValue::from(decision.reset_at_ms.div_euclid(1000)),
    );
    response
}

/// Reject POSTs whose `Authorization` header does not carry the secret.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::POST {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok());

    if is_authorized(header, state.webhook_secret.as_deref()) {
        return next.run(request).await;
    }

    let client = request
        .extensions()
        .get::<ClientAddress>()
        .cloned()
        .unwrap_or_else(|| resolve_client(&request));
    tracing::warn!(
        client = %client.0,
        header_present = header.is_some(),
        "unauthorized webhook call"
    );
    super::json_error(StatusCode::UNAUTHORIZED, "Unauthorized")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn forwarded_for_takes_first_entry() {
        let h = headers(&[
            ("x-forwarded-for", " 203.0.113.9 , 10.0.0.1"),
            ("x-real-ip", "198.51.100.1"),
        ]);
        assert_eq!(client_address(&h, None).0, "203.0.113.9");
    }

    #[test]
    fn falls_back_to_real_ip_then_peer() {
        let h = headers(&[("x-real-ip", "198.51.100.1")]);
        assert_eq!(client_address(&h, None).0, "198.51.100.1");

        let peer: SocketAddr = "192.0.2.5:40000".parse().unwrap();
        assert_eq!(client_address(&HeaderMap::new(), Some(peer)).0, "192.0.2.5");
        assert_eq!(client_address(&HeaderMap::new(), None).0, "unknown");
    }
}
