//! In-process `WorkshopStorage` backend.
//!
//! Used when no hosted backend is configured and by the test suites. Tables
//! live behind one `tokio::sync::RwLock`; each trait call takes the lock once,
//! so calls are individually atomic but never grouped.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{
    ClientRecord, HistoryRecord, NewClient, NewHistoryEntry, NewProcedure, NewServiceOrder,
    NewVehicle, NewWebhookLog, NotificationRecord, OrderDetails, OrderStatus, ProcedureRecord,
    ServiceOrderRecord, VehicleRecord, WebhookLogRecord,
};
use crate::traits::WorkshopStorage;
use crate::now_rfc3339;

#[derive(Default)]
struct Tables {
    clients: Vec<ClientRecord>,
    vehicles: Vec<VehicleRecord>,
    /// Orders keyed by primary key.
    orders: HashMap<String, ServiceOrderRecord>,
    procedures: Vec<ProcedureRecord>,
    history: Vec<HistoryRecord>,
    notifications: Vec<NotificationRecord>,
    /// Append order is creation order.
    webhook_logs: Vec<WebhookLogRecord>,
    last_order_number: i64,
}

/// In-memory storage backend.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a notification to an order. The gateway never writes these;
    /// this exists so fixtures can populate the order aggregate.
    pub async fn insert_notification(&self, notification: NotificationRecord) {
        self.tables.write().await.notifications.push(notification);
    }

    /// Number of stored clients.
    pub async fn client_count(&self) -> usize {
        self.tables.read().await.clients.len()
    }

    /// Number of stored vehicles.
    pub async fn vehicle_count(&self) -> usize {
        self.tables.read().await.vehicles.len()
    }

    /// Number of stored service orders.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// History entries recorded for the given order id, oldest first.
    pub async fn history_for(&self, order_id: &str) -> Vec<HistoryRecord> {
        self.tables
            .read()
            .await
            .history
            .iter()
            .filter(|h| h.order_id == order_id)
            .cloned()
            .collect()
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl WorkshopStorage for MemoryStorage {
    async fn find_client_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<ClientRecord>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.clients.iter().find(|c| c.phone == phone).cloned())
    }

    async fn insert_client(&self, client: NewClient) -> Result<ClientRecord, StorageError> {
        let record = ClientRecord {
            id: new_id(),
            name: client.name,
            phone: client.phone,
            email: client.email,
            document: client.document,
            address: None,
            created_at: now_rfc3339(),
            updated_at: None,
        };
        self.tables.write().await.clients.push(record.clone());
        Ok(record)
    }

    async fn find_vehicle_by_plate(
        &self,
        plate: &str,
    ) -> Result<Option<VehicleRecord>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.vehicles.iter().find(|v| v.plate == plate).cloned())
    }

    async fn insert_vehicle(&self, vehicle: NewVehicle) -> Result<VehicleRecord, StorageError> {
        let record = VehicleRecord {
            id: new_id(),
            client_id: vehicle.client_id,
            brand: vehicle.brand,
            model: vehicle.model,
            plate: vehicle.plate,
            year: vehicle.year,
            color: vehicle.color,
            mileage: None,
            notes: None,
            created_at: now_rfc3339(),
            updated_at: None,
        };
        self.tables.write().await.vehicles.push(record.clone());
        Ok(record)
    }

    async fn insert_order(
        &self,
        order: NewServiceOrder,
    ) -> Result<ServiceOrderRecord, StorageError> {
        let mut tables = self.tables.write().await;
        tables.last_order_number += 1;
        let now = now_rfc3339();
        let record = ServiceOrderRecord {
            id: new_id(),
            number: tables.last_order_number,
            client_id: order.client_id,
            vehicle_id: order.vehicle_id,
            status: order.status,
            description: order.description,
            notes: order.notes,
            total_value: order.total_value,
            paid_value: Decimal::ZERO,
            photo_urls: Vec::new(),
            entered_at: Some(now.clone()),
            created_at: now,
            updated_at: None,
        };
        tables.orders.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find_order_by_number(
        &self,
        number: i64,
    ) -> Result<Option<ServiceOrderRecord>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.orders.values().find(|o| o.number == number).cloned())
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<ServiceOrderRecord, StorageError> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(order_id)
            .ok_or_else(|| StorageError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        order.status = status;
        order.updated_at = Some(now_rfc3339());
        Ok(order.clone())
    }

    async fn update_order_photos(
        &self,
        order_id: &str,
        photo_urls: Vec<String>,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(order_id)
            .ok_or_else(|| StorageError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        order.photo_urls = photo_urls;
        order.updated_at = Some(now_rfc3339());
        Ok(())
    }

    async fn insert_procedure(
        &self,
        procedure: NewProcedure,
    ) -> Result<ProcedureRecord, StorageError> {
        let record = ProcedureRecord {
            id: new_id(),
            order_id: procedure.order_id,
            description: procedure.description,
            value: procedure.value,
            status: procedure.status,
            created_at: now_rfc3339(),
        };
        self.tables.write().await.procedures.push(record.clone());
        Ok(record)
    }

    async fn insert_history(&self, entry: NewHistoryEntry) -> Result<HistoryRecord, StorageError> {
        let record = HistoryRecord {
            id: new_id(),
            order_id: entry.order_id,
            previous_status: entry.previous_status,
            new_status: entry.new_status,
            note: entry.note,
            actor: Some(entry.actor),
            created_at: now_rfc3339(),
        };
        self.tables.write().await.history.push(record.clone());
        Ok(record)
    }

    async fn load_order_details(
        &self,
        number: i64,
    ) -> Result<Option<OrderDetails>, StorageError> {
        let tables = self.tables.read().await;
        let Some(order) = tables.orders.values().find(|o| o.number == number) else {
            return Ok(None);
        };

        let client = tables
            .clients
            .iter()
            .find(|c| c.id == order.client_id)
            .cloned();
        let vehicle = order
            .vehicle_id
            .as_ref()
            .and_then(|vid| tables.vehicles.iter().find(|v| &v.id == vid))
            .cloned();
        let procedures = tables
            .procedures
            .iter()
            .filter(|p| p.order_id == order.id)
            .cloned()
            .collect();
        let history = tables
            .history
            .iter()
            .filter(|h| h.order_id == order.id)
            .cloned()
            .collect();
        let notifications = tables
            .notifications
            .iter()
            .filter(|n| n.order_id == order.id)
            .cloned()
            .collect();

        Ok(Some(OrderDetails {
            order: order.clone(),
            client,
            vehicle,
            procedures,
            history,
            notifications,
        }))
    }

    async fn insert_webhook_log(
        &self,
        log: NewWebhookLog,
    ) -> Result<WebhookLogRecord, StorageError> {
        let record = WebhookLogRecord {
            id: new_id(),
            action: log.action,
            payload: log.payload,
            outcome: log.outcome,
            error_message: log.error_message,
            source_address: log.source_address,
            created_at: now_rfc3339(),
        };
        self.tables.write().await.webhook_logs.push(record.clone());
        Ok(record)
    }

    async fn list_webhook_logs(
        &self,
        limit: usize,
    ) -> Result<Vec<WebhookLogRecord>, StorageError> {
        let tables = self.tables.read().await;
        let newest_first = tables.webhook_logs.iter().rev().cloned();
        Ok(if limit == 0 {
            newest_first.collect()
        } else {
            newest_first.take(limit).collect()
        })
    }
}
