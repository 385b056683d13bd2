use oficina_storage::{NewHistoryEntry, OrderStatus, WorkshopStorage};
use serde::Serialize;

use super::{require_order, ActionError, UpdateStatusInput, WEBHOOK_ACTOR};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    #[serde(rename = "ordem_servico_id")]
    pub order_id: String,
    #[serde(rename = "numero_os")]
    pub number: i64,
    #[serde(rename = "status_anterior")]
    pub previous: OrderStatus,
    #[serde(rename = "status_novo")]
    pub current: OrderStatus,
}

/// History is appended only when the caller supplied a note.
pub(super) async fn run(
    storage: &dyn WorkshopStorage,
    input: &UpdateStatusInput,
) -> Result<StatusChange, ActionError> {
    let order = require_order(storage, input.number).await?;
    let previous = order.status;

    storage.update_order_status(&order.id, input.status).await?;

    if let Some(note) = input.note.as_deref().filter(|n| !n.is_empty()) {
        storage
            .insert_history(NewHistoryEntry {
                order_id: order.id.clone(),
                previous_status: Some(previous),
                new_status: input.status,
                note: Some(note.to_string()),
                actor: WEBHOOK_ACTOR.to_string(),
            })
            .await?;
    }

    tracing::info!(
        numero_os = input.number,
        from = %previous,
        to = %input.status,
        "order status updated"
    );

    Ok(StatusChange {
        order_id: order.id,
        number: input.number,
        previous,
        current: input.status,
    })
}
