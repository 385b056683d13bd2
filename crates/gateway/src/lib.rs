//! Inbound webhook gateway for the workshop manager.
//!
//! A single endpoint receives automation calls, authenticates them, validates
//! a tagged action payload, runs one business action against storage, records
//! an audit row, and relays the outcome downstream.

pub mod actions;
pub mod audit;
pub mod auth;
pub mod config;
pub mod notify;
pub mod rate_limit;
pub mod relay;
pub mod server;
pub mod validation;

pub use actions::{ActionDispatcher, ActionError, ActionKind, ActionOutput, WebhookAction};
pub use config::{ConfigError, GatewayConfig};
pub use server::{build_router, AppState, WEBHOOK_PATH};
