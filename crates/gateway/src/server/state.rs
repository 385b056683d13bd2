//! Application state shared across request handlers.

use std::sync::Arc;

use axum::http::HeaderValue;
use oficina_storage::{MemoryStorage, RestStorage, WorkshopStorage};

use crate::actions::ActionDispatcher;
use crate::audit::AuditLogger;
use crate::config::{GatewayConfig, StorageConfig, ANY_ORIGIN};
use crate::rate_limit::RateLimiter;
use crate::relay::{HttpRelay, Relay};

pub struct AppState {
    /// Per-client fixed-window limiter.
    pub(crate) rate_limiter: RateLimiter,
    /// None rejects every webhook call.
    pub(crate) webhook_secret: Option<String>,
    pub(crate) dispatcher: ActionDispatcher,
    pub(crate) audit: AuditLogger,
    pub(crate) relay: Arc<dyn Relay>,
    pub(crate) cors_origin: HeaderValue,
}

impl AppState {
    pub fn new(
        config: &GatewayConfig,
        storage: Arc<dyn WorkshopStorage>,
        relay: Arc<dyn Relay>,
    ) -> Self {
        let cors_origin = HeaderValue::from_str(config.cors_origin()).unwrap_or_else(|_| {
            tracing::warn!(app_url = config.cors_origin(), "invalid CORS origin, allowing any");
            HeaderValue::from_static(ANY_ORIGIN)
        });
        AppState {
            rate_limiter: RateLimiter::in_memory(
                config.rate_limit.max_requests,
                config.rate_limit.window_seconds,
            ),
            webhook_secret: config.webhook_secret.clone(),
            dispatcher: ActionDispatcher::new(storage.clone()),
            audit: AuditLogger::new(storage),
            relay,
            cors_origin,
        }
    }

    /// State with storage and relay built from `config`.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let storage = storage_from_config(&config.storage);
        let relay = Arc::new(HttpRelay::new(
            config.relay.url.clone(),
            config.relay.token.clone(),
        ));
        if !relay.is_configured() {
            tracing::warn!("N8N_WEBHOOK_URL not set; outcomes will not be relayed");
        }
        Self::new(config, storage, relay)
    }
}

/// Hosted storage when a URL and key are configured, otherwise in-memory.
pub fn storage_from_config(config: &StorageConfig) -> Arc<dyn WorkshopStorage> {
    match (&config.url, &config.service_key) {
        (Some(url), Some(key)) => {
            tracing::info!(url = %url, "using hosted storage");
            Arc::new(RestStorage::new(url, key))
        }
        _ => {
            tracing::warn!("no hosted storage configured; using in-memory storage");
            Arc::new(MemoryStorage::new())
        }
    }
}
