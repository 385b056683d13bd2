//! The four business actions a webhook call may request.
//!
//! Every request carries an `acao` tag selecting exactly one action. The
//! validator turns the raw payload into a [`WebhookAction`]; the
//! [`ActionDispatcher`] executes it against a [`WorkshopStorage`].
//!
//! No status transition graph is enforced: any [`OrderStatus`] may follow any
//! other. Multi-step actions are not transactional; a failure after some
//! writes leaves those writes in place.

mod create_order;
mod query_order;
mod register_photo;
mod update_status;

use std::fmt;
use std::sync::Arc;

use oficina_storage::{OrderDetails, OrderStatus, StorageError, WorkshopStorage};
use rust_decimal::Decimal;
use serde::Serialize;

pub use create_order::CreatedOrder;
pub use register_photo::RegisteredPhoto;
pub use update_status::StatusChange;

/// Actor name recorded on history rows written by the gateway.
pub const WEBHOOK_ACTOR: &str = "webhook";

/// The `acao` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    CreateOrder,
    UpdateStatus,
    RegisterPhoto,
    QueryOrder,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::CreateOrder,
        ActionKind::UpdateStatus,
        ActionKind::RegisterPhoto,
        ActionKind::QueryOrder,
    ];

    /// The wire literal carried in `acao`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CreateOrder => "criar_os",
            ActionKind::UpdateStatus => "atualizar_status",
            ActionKind::RegisterPhoto => "registrar_foto",
            ActionKind::QueryOrder => "consultar_os",
        }
    }

    /// Parse a wire literal. Unknown literals yield `None`.
    pub fn parse(literal: &str) -> Option<ActionKind> {
        ActionKind::ALL.into_iter().find(|k| k.as_str() == literal)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Validated inputs ─────────────────────────────────────────────────────────

/// Client and (optional) vehicle fields of a `criar_os` call, sanitized.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientInput {
    pub name: String,
    /// Digits only.
    pub phone: String,
    pub email: Option<String>,
    /// CPF/CNPJ, digits only.
    pub document: Option<String>,
    /// Combined "brand model" free text, used when brand/model are absent.
    pub car: Option<String>,
    /// Upper-case alphanumeric.
    pub plate: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureInput {
    pub description: String,
    pub notes: Option<String>,
    pub value: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateOrderInput {
    pub client: ClientInput,
    pub procedure: ProcedureInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatusInput {
    pub number: i64,
    pub status: OrderStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegisterPhotoInput {
    pub number: i64,
    pub photo_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOrderInput {
    pub number: i64,
}

/// A validated webhook request.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookAction {
    CreateOrder(CreateOrderInput),
    UpdateStatus(UpdateStatusInput),
    RegisterPhoto(RegisterPhotoInput),
    QueryOrder(QueryOrderInput),
}

impl WebhookAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            WebhookAction::CreateOrder(_) => ActionKind::CreateOrder,
            WebhookAction::UpdateStatus(_) => ActionKind::UpdateStatus,
            WebhookAction::RegisterPhoto(_) => ActionKind::RegisterPhoto,
            WebhookAction::QueryOrder(_) => ActionKind::QueryOrder,
        }
    }
}

// ── Results and errors ───────────────────────────────────────────────────────

/// What a successful action returns, serialized as the response `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionOutput {
    Created(CreatedOrder),
    StatusChanged(StatusChange),
    PhotoRegistered(RegisteredPhoto),
    Order(Box<OrderDetails>),
}

/// Business-level failures. All of them surface as HTTP 500 with the
/// display text as the error message.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("order #{0} not found")]
    OrderNotFound(i64),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ── Dispatcher ───────────────────────────────────────────────────────────────

/// Executes validated actions against storage.
#[derive(Clone)]
pub struct ActionDispatcher {
    storage: Arc<dyn WorkshopStorage>,
}

impl ActionDispatcher {
    pub fn new(storage: Arc<dyn WorkshopStorage>) -> Self {
        Self { storage }
    }

    /// Run exactly one action. Storage errors abort the action; writes that
    /// already happened are not rolled back.
    pub async fn dispatch(&self, action: &WebhookAction) -> Result<ActionOutput, ActionError> {
        let storage = self.storage.as_ref();
        match action {
            WebhookAction::CreateOrder(input) => create_order::run(storage, input)
                .await
                .map(ActionOutput::Created),
            WebhookAction::UpdateStatus(input) => update_status::run(storage, input)
                .await
                .map(ActionOutput::StatusChanged),
            WebhookAction::RegisterPhoto(input) => register_photo::run(storage, input)
                .await
                .map(ActionOutput::PhotoRegistered),
            WebhookAction::QueryOrder(input) => query_order::run(storage, input)
                .await
                .map(|details| ActionOutput::Order(Box::new(details))),
        }
    }
}

/// Resolve an order by its sequential number or fail with a named error.
async fn require_order(
    storage: &dyn WorkshopStorage,
    number: i64,
) -> Result<oficina_storage::ServiceOrderRecord, ActionError> {
    storage
        .find_order_by_number(number)
        .await?
        .ok_or(ActionError::OrderNotFound(number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_literals_parse_back() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ActionKind::parse("apagar_os"), None);
        assert_eq!(ActionKind::parse("CRIAR_OS"), None);
    }

    #[test]
    fn not_found_message_names_the_order() {
        assert_eq!(ActionError::OrderNotFound(42).to_string(), "order #42 not found");
    }
}
