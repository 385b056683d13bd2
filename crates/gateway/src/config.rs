//! Gateway configuration.
//!
//! Values come from an optional TOML file, then environment overrides.
//! Anything left unset falls back to the defaults below.
//!
//! # Example
//!
//! ```toml
//! port = 3000
//! webhook_secret = "change-me"
//! app_url = "https://oficina.example.com"
//!
//! [relay]
//! url = "https://n8n.example.com/webhook/oficina"
//! token = "relay-token"
//!
//! [storage]
//! url = "https://xyz.supabase.co"
//! service_key = "service-role-key"
//!
//! [rate_limit]
//! max_requests = 60
//! window_seconds = 60
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_REQUESTS: u32 = 60;
pub const DEFAULT_WINDOW_SECONDS: u64 = 60;
pub const ANY_ORIGIN: &str = "*";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error("storage.url is set but storage.service_key is missing")]
    MissingServiceKey,

    #[error("rate_limit.window_seconds must be at least 1")]
    ZeroRateWindow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub url: Option<String>,
    pub token: Option<String>,
}

/// Hosted storage. Without a URL the gateway runs on in-memory storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub url: Option<String>,
    pub service_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_seconds: DEFAULT_WINDOW_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub port: u16,
    /// Shared secret callers must present. Unset rejects every POST.
    pub webhook_secret: Option<String>,
    /// Allowed CORS origin.
    pub app_url: Option<String>,
    pub relay: RelayConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            webhook_secret: None,
            app_url: None,
            relay: RelayConfig::default(),
            storage: StorageConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from `path` (if any) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.apply_env_with(|name| std::env::var(name).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Apply overrides from `lookup` and validate the result. Empty values
    /// count as unset.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OFICINA_PORT") {
            self.port = parse_env("OFICINA_PORT", &v)?;
        }
        if let Some(v) = get("WEBHOOK_SECRET") {
            self.webhook_secret = Some(v);
        }
        if let Some(v) = get("APP_URL") {
            self.app_url = Some(v);
        }
        if let Some(v) = get("N8N_WEBHOOK_URL") {
            self.relay.url = Some(v);
        }
        if let Some(v) = get("N8N_WEBHOOK_TOKEN") {
            self.relay.token = Some(v);
        }
        if let Some(v) = get("SUPABASE_URL") {
            self.storage.url = Some(v);
        }
        if let Some(v) = get("SUPABASE_SERVICE_ROLE_KEY") {
            self.storage.service_key = Some(v);
        }
        if let Some(v) = get("OFICINA_RATE_LIMIT") {
            self.rate_limit.max_requests = parse_env("OFICINA_RATE_LIMIT", &v)?;
        }
        if let Some(v) = get("OFICINA_RATE_WINDOW_SECS") {
            self.rate_limit.window_seconds = parse_env("OFICINA_RATE_WINDOW_SECS", &v)?;
        }

        self.normalize();
        self.validate()?;
        Ok(self)
    }

    /// Empty strings from the file count as unset too.
    fn normalize(&mut self) {
        for field in [
            &mut self.webhook_secret,
            &mut self.app_url,
            &mut self.relay.url,
            &mut self.relay.token,
            &mut self.storage.url,
            &mut self.storage.service_key,
        ] {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.url.is_some() && self.storage.service_key.is_none() {
            return Err(ConfigError::MissingServiceKey);
        }
        if self.rate_limit.window_seconds == 0 {
            return Err(ConfigError::ZeroRateWindow);
        }
        Ok(())
    }

    pub fn cors_origin(&self) -> &str {
        self.app_url.as_deref().unwrap_or(ANY_ORIGIN)
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let config = GatewayConfig::default().apply_env_with(env(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.rate_limit, RateLimitConfig::default());
        assert!(config.webhook_secret.is_none());
        assert_eq!(config.cors_origin(), "*");
    }

    #[test]
    fn toml_sections_parse() {
        let config = GatewayConfig::from_toml(
            r#"
            port = 8080
            webhook_secret = "abc"

            [relay]
            url = "https://n8n.example.com/hook"

            [rate_limit]
            max_requests = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.relay.url.as_deref(), Some("https://n8n.example.com/hook"));
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_seconds, 60);
    }

    #[test]
    fn env_overrides_file_values() {
        let file = GatewayConfig::from_toml("port = 8080\nwebhook_secret = \"from-file\"").unwrap();
        let config = file
            .apply_env_with(env(&[
                ("WEBHOOK_SECRET", "from-env"),
                ("OFICINA_RATE_WINDOW_SECS", "10"),
                ("APP_URL", "https://oficina.example.com"),
            ]))
            .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.webhook_secret.as_deref(), Some("from-env"));
        assert_eq!(config.rate_limit.window_seconds, 10);
        assert_eq!(config.cors_origin(), "https://oficina.example.com");
    }

    #[test]
    fn empty_values_count_as_unset() {
        let file = GatewayConfig::from_toml("webhook_secret = \"\"").unwrap();
        let config = file.apply_env_with(env(&[("N8N_WEBHOOK_URL", "  ")])).unwrap();
        assert!(config.webhook_secret.is_none());
        assert!(config.relay.url.is_none());
    }

    #[test]
    fn bad_numeric_env_is_rejected() {
        let err = GatewayConfig::default()
            .apply_env_with(env(&[("OFICINA_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: "OFICINA_PORT", .. }));
    }

    #[test]
    fn storage_url_requires_key() {
        let err = GatewayConfig::default()
            .apply_env_with(env(&[("SUPABASE_URL", "https://xyz.supabase.co")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingServiceKey));
    }

    #[test]
    fn zero_rate_window_is_rejected() {
        let err = GatewayConfig::default()
            .apply_env_with(env(&[("OFICINA_RATE_WINDOW_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroRateWindow));

        let file = GatewayConfig::from_toml("[rate_limit]\nwindow_seconds = 0").unwrap();
        assert!(matches!(
            file.apply_env_with(env(&[])),
            Err(ConfigError::ZeroRateWindow)
        ));
    }

    #[test]
    fn huge_rate_window_is_accepted() {
        let config = GatewayConfig::default()
            .apply_env_with(env(&[("OFICINA_RATE_WINDOW_SECS", "18446744073709551615")]))
            .unwrap();
        assert_eq!(config.rate_limit.window_seconds, u64::MAX);
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let err = GatewayConfig::from_file(Path::new("/nonexistent/oficina.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/oficina.toml"));
    }
}
