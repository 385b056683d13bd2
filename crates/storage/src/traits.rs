use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{
    ClientRecord, HistoryRecord, NewClient, NewHistoryEntry, NewProcedure, NewServiceOrder,
    NewVehicle, NewWebhookLog, OrderDetails, OrderStatus, ProcedureRecord, ServiceOrderRecord,
    VehicleRecord, WebhookLogRecord,
};

/// The storage trait for the workshop data the webhook gateway touches.
///
/// A `WorkshopStorage` implementation reads and writes clients, vehicles,
/// service orders, procedures, status history, and the webhook audit trail.
///
/// ## No cross-call transactions
///
/// Every method is an independent round trip. Callers that chain several
/// writes (lookup-then-insert of a client, then a vehicle, then an order)
/// get no atomicity across them, and concurrent identical calls may each
/// miss the lookup and insert duplicates. Backends do not paper over this.
///
/// ## Lookups
///
/// `find_*` and `load_*` return `Ok(None)` when nothing matches. Errors are
/// reserved for backend failures. Updates that target a missing order id
/// return `Err(StorageError::OrderNotFound)`.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be held as
/// `Arc<dyn WorkshopStorage>` in axum application state.
#[async_trait]
pub trait WorkshopStorage: Send + Sync + 'static {
    // ── Clients ──────────────────────────────────────────────────────────────

    /// Find a client by normalized (digits only) phone number.
    async fn find_client_by_phone(&self, phone: &str)
        -> Result<Option<ClientRecord>, StorageError>;

    async fn insert_client(&self, client: NewClient) -> Result<ClientRecord, StorageError>;

    // ── Vehicles ─────────────────────────────────────────────────────────────

    /// Find a vehicle by normalized (upper-case alphanumeric) plate.
    async fn find_vehicle_by_plate(
        &self,
        plate: &str,
    ) -> Result<Option<VehicleRecord>, StorageError>;

    async fn insert_vehicle(&self, vehicle: NewVehicle) -> Result<VehicleRecord, StorageError>;

    // ── Service orders ───────────────────────────────────────────────────────

    /// Insert a new order. The backend assigns `id`, the next sequential
    /// `numero_os`, an empty photo list, and timestamps.
    async fn insert_order(&self, order: NewServiceOrder)
        -> Result<ServiceOrderRecord, StorageError>;

    /// Find an order by its sequential number.
    async fn find_order_by_number(
        &self,
        number: i64,
    ) -> Result<Option<ServiceOrderRecord>, StorageError>;

    /// Overwrite an order's status and return the updated record.
    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<ServiceOrderRecord, StorageError>;

    /// Replace an order's photo list wholesale.
    async fn update_order_photos(
        &self,
        order_id: &str,
        photo_urls: Vec<String>,
    ) -> Result<(), StorageError>;

    async fn insert_procedure(
        &self,
        procedure: NewProcedure,
    ) -> Result<ProcedureRecord, StorageError>;

    async fn insert_history(&self, entry: NewHistoryEntry) -> Result<HistoryRecord, StorageError>;

    /// Read an order together with its client, vehicle, procedures, history
    /// and notifications.
    async fn load_order_details(&self, number: i64)
        -> Result<Option<OrderDetails>, StorageError>;

    // ── Audit trail ──────────────────────────────────────────────────────────

    async fn insert_webhook_log(
        &self,
        log: NewWebhookLog,
    ) -> Result<WebhookLogRecord, StorageError>;

    /// List audit rows, newest first. `limit` of 0 means no limit.
    async fn list_webhook_logs(&self, limit: usize)
        -> Result<Vec<WebhookLogRecord>, StorageError>;
}
