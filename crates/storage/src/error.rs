/// All errors that can be returned by a WorkshopStorage implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An update targeted a service order id that does not exist.
    #[error("service order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// A backend-specific storage error (HTTP failure, rejected write, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The backend answered, but the payload could not be decoded into records.
    #[error("storage decode error: {0}")]
    Decode(String),
}
