//! Audit trail of processed webhook calls.
//!
//! Every call that reaches an action is recorded with its masked payload.
//! Recording is best-effort: a storage failure is logged and reported as
//! [`AuditOutcome::Dropped`], never propagated.

use std::sync::Arc;

use oficina_storage::{LogOutcome, NewWebhookLog, WorkshopStorage};
use serde_json::{Map, Value};

/// Key fragments whose values are masked, matched case-insensitively as
/// substrings of the key.
pub const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "senha",
    "token",
    "secret",
    "authorization",
    "cpf",
    "cnpj",
    "cpf_cnpj",
];

const SHORT_MASK: &str = "***";

/// Copy of `value` with sensitive string fields redacted, at any depth.
///
/// Values of four characters or fewer become `***`; longer values keep their
/// first two and last two characters around `...`. Non-string values under a
/// sensitive key are left as they are.
pub fn mask_sensitive(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(mask_object(map)),
        Value::Array(items) => Value::Array(items.iter().map(mask_sensitive).collect()),
        other => other.clone(),
    }
}

fn mask_object(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let masked = match value {
                Value::String(s) if is_sensitive_key(key) && !s.is_empty() => {
                    Value::String(mask_text(s))
                }
                other => mask_sensitive(other),
            };
            (key.clone(), masked)
        })
        .collect()
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|k| lower.contains(k))
}

fn mask_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 4 {
        return SHORT_MASK.to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}...{tail}")
}

/// What happened to an audit write. Callers may ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    Recorded,
    Dropped(String),
}

/// One call to be recorded. The payload is masked by the logger.
#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub action: &'a str,
    pub payload: &'a Value,
    pub outcome: LogOutcome,
    pub error_message: Option<&'a str>,
    pub source_address: &'a str,
}

#[derive(Clone)]
pub struct AuditLogger {
    storage: Arc<dyn WorkshopStorage>,
}

impl AuditLogger {
    pub fn new(storage: Arc<dyn WorkshopStorage>) -> Self {
        Self { storage }
    }

    pub async fn record(&self, entry: AuditEntry<'_>) -> AuditOutcome {
        let row = NewWebhookLog {
            action: entry.action.to_string(),
            payload: mask_sensitive(entry.payload),
            outcome: entry.outcome,
            error_message: entry.error_message.map(str::to_string),
            source_address: Some(entry.source_address.to_string()),
        };
        match self.storage.insert_webhook_log(row).await {
            Ok(_) => {
                tracing::debug!(acao = entry.action, status = entry.outcome.as_str(), "audit recorded");
                AuditOutcome::Recorded
            }
            Err(e) => {
                tracing::warn!(acao = entry.action, error = %e, "failed to record webhook audit log");
                AuditOutcome::Dropped(e.to_string())
            }
        }
    }
}
