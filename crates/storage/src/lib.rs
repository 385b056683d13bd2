pub mod conformance;
mod error;
mod memory;
mod record;
mod rest;
mod traits;

pub use error::StorageError;
pub use memory::MemoryStorage;
pub use record::{
    ClientRecord, HistoryRecord, LogOutcome, NewClient, NewHistoryEntry, NewProcedure,
    NewServiceOrder, NewVehicle, NewWebhookLog, NotificationChannel, NotificationRecord,
    NotificationStatus, OrderDetails, OrderStatus, ProcedureRecord, ProcedureStatus,
    ServiceOrderRecord, VehicleRecord, WebhookLogRecord,
};
pub use rest::RestStorage;
pub use traits::WorkshopStorage;

/// Current UTC time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}
