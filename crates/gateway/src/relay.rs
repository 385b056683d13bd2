//! Best-effort forwarding of action outcomes to the downstream automation
//! endpoint.
//!
//! One POST attempt per call, no retries. Every failure is folded into
//! [`RelayOutcome`] so the caller's response is never affected.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

/// Result of one relay attempt, reported to callers under `n8n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayOutcome {
    #[serde(rename = "enviado")]
    pub success: bool,
    pub status: Option<u16>,
    #[serde(rename = "erro")]
    pub error: Option<String>,
}

impl RelayOutcome {
    pub fn delivered(status: u16) -> Self {
        Self {
            success: true,
            status: Some(status),
            error: None,
        }
    }

    pub fn failed(status: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            error: Some(error.into()),
        }
    }
}

/// Downstream receiver of action outcomes.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn forward(&self, payload: &Value) -> RelayOutcome;
}

/// Body sent after an action succeeded.
pub fn success_payload(action: &str, data: &Value, source_address: &str) -> Value {
    json!({
        "acao": action,
        "success": true,
        "data": data,
        "ip_origem": source_address,
        "timestamp": oficina_storage::now_rfc3339(),
    })
}

/// Body sent after an action failed.
pub fn error_payload(action: &str, error: &str, source_address: &str) -> Value {
    json!({
        "acao": action,
        "success": false,
        "error": error,
        "ip_origem": source_address,
        "timestamp": oficina_storage::now_rfc3339(),
    })
}

/// Relay over HTTP using `ureq` on the blocking pool.
pub struct HttpRelay {
    url: Option<String>,
    token: Option<String>,
    agent: ureq::Agent,
}

impl HttpRelay {
    /// A relay without a URL reports every attempt as not configured.
    pub fn new(url: Option<String>, token: Option<String>) -> Self {
        HttpRelay {
            url,
            token,
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn forward(&self, payload: &Value) -> RelayOutcome {
        let Some(url) = self.url.clone() else {
            return RelayOutcome::failed(None, "relay not configured");
        };
        let agent = self.agent.clone();
        let token = self.token.clone();
        let body = payload.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let mut request = agent.post(&url);
            if let Some(ref token) = token {
                request = request.header("Authorization", &format!("Bearer {}", token));
            }
            match request.send_json(&body) {
                Ok(response) => RelayOutcome::delivered(response.status().as_u16()),
                Err(ureq::Error::StatusCode(code)) => {
                    RelayOutcome::failed(Some(code), format!("relay responded with HTTP {}", code))
                }
                Err(e) => RelayOutcome::failed(None, e.to_string()),
            }
        })
        .await
        .unwrap_or_else(|e| RelayOutcome::failed(None, format!("task join error: {}", e)));

        if !outcome.success {
            tracing::warn!(
                status = ?outcome.status,
                error = outcome.error.as_deref().unwrap_or(""),
                "relay attempt failed"
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_with_wire_names() {
        let json = serde_json::to_value(RelayOutcome::failed(Some(502), "bad gateway")).unwrap();
        assert_eq!(json, json!({ "enviado": false, "status": 502, "erro": "bad gateway" }));

        let json = serde_json::to_value(RelayOutcome::delivered(200)).unwrap();
        assert_eq!(json, json!({ "enviado": true, "status": 200, "erro": null }));
    }

    #[test]
    fn payloads_carry_action_and_origin() {
        let ok = success_payload("criar_os", &json!({ "numero_os": 1 }), "10.0.0.1");
        assert_eq!(ok["acao"], "criar_os");
        assert_eq!(ok["success"], true);
        assert_eq!(ok["data"]["numero_os"], 1);
        assert_eq!(ok["ip_origem"], "10.0.0.1");
        assert!(ok["timestamp"].is_string());

        let err = error_payload("consultar_os", "order #9 not found", "unknown");
        assert_eq!(err["success"], false);
        assert_eq!(err["error"], "order #9 not found");
        assert!(err.get("data").is_none());
    }

    #[tokio::test]
    async fn unconfigured_relay_reports_failure() {
        let relay = HttpRelay::new(None, None);
        assert!(!relay.is_configured());
        let outcome = relay.forward(&json!({})).await;
        assert_eq!(outcome, RelayOutcome::failed(None, "relay not configured"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_folded_into_outcome() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let relay = HttpRelay::new(Some(format!("http://127.0.0.1:{port}/hook")), None);
        let outcome = relay.forward(&json!({ "acao": "criar_os" })).await;
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
    }
}
