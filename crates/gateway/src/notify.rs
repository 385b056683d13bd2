//! Outbound status-change notifications.
//!
//! When an operator changes an order's status outside the webhook flow, the
//! change is reported back through the gateway as an `atualizar_status` call
//! so the automation side sees the same event stream.

use oficina_storage::OrderStatus;
use serde::Serialize;
use serde_json::{json, Value};

use crate::actions::ActionKind;

/// Characters of a non-JSON response body kept in the report.
const RESPONSE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook secret is not configured")]
    NotConfigured,

    #[error("status notification failed: {0}")]
    Transport(String),
}

/// An order moved from one status to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChangeNotice {
    pub number: i64,
    pub previous: OrderStatus,
    pub current: OrderStatus,
}

impl StatusChangeNotice {
    pub fn observation(&self) -> String {
        format!(
            "Status changed from {} to {} via web interface",
            self.previous, self.current
        )
    }

    /// The `atualizar_status` request body for this change.
    pub fn payload(&self) -> Value {
        json!({
            "acao": ActionKind::UpdateStatus.as_str(),
            "numero_os": self.number,
            "status": self.current,
            "observacao": self.observation(),
        })
    }
}

/// HTTP status and body returned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotifyReport {
    pub status: u16,
    pub body: Value,
}

impl NotifyReport {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends notices to a gateway endpoint, authenticating with the bare secret.
pub struct StatusNotifier {
    url: String,
    secret: Option<String>,
    agent: ureq::Agent,
}

impl StatusNotifier {
    pub fn new(url: impl Into<String>, secret: Option<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        StatusNotifier {
            url: url.into(),
            secret: secret.filter(|s| !s.is_empty()),
            agent,
        }
    }

    pub async fn notify(&self, notice: &StatusChangeNotice) -> Result<NotifyReport, NotifyError> {
        let secret = self.secret.clone().ok_or(NotifyError::NotConfigured)?;
        let url = self.url.clone();
        let agent = self.agent.clone();
        let payload = notice.payload();

        tracing::info!(
            numero_os = notice.number,
            from = %notice.previous,
            to = %notice.current,
            url = %url,
            "sending status change notice"
        );

        let (status, text) = tokio::task::spawn_blocking(move || {
            let mut response = agent
                .post(&url)
                .header("Authorization", &secret)
                .send_json(&payload)
                .map_err(|e| NotifyError::Transport(e.to_string()))?;
            let status = response.status().as_u16();
            let text = response
                .body_mut()
                .read_to_string()
                .map_err(|e| NotifyError::Transport(format!("failed to read response: {}", e)))?;
            Ok::<_, NotifyError>((status, text))
        })
        .await
        .map_err(|e| NotifyError::Transport(format!("task join error: {}", e)))??;

        let report = NotifyReport {
            status,
            body: parse_body(&text),
        };
        if !report.is_success() {
            tracing::warn!(status, "gateway rejected status change notice");
        }
        Ok(report)
    }
}

/// JSON bodies pass through; anything else is wrapped with a short preview.
fn parse_body(text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => json!({
            "error": "Invalid response format",
            "responseText": text.chars().take(RESPONSE_PREVIEW_CHARS).collect::<String>(),
        }),
    }
}
