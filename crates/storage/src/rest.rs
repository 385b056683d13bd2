//! Hosted backend: PostgREST (Supabase REST) implementation of `WorkshopStorage`.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` to avoid
//! blocking the async runtime. Every call authenticates with the service key
//! in both the `apikey` and `Authorization: Bearer` headers, and writes ask
//! for `Prefer: return=representation` so inserted rows come back with their
//! storage-assigned ids and sequence numbers.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;
use crate::record::{
    ClientRecord, HistoryRecord, NewClient, NewHistoryEntry, NewProcedure, NewServiceOrder,
    NewVehicle, NewWebhookLog, OrderDetails, OrderStatus, ProcedureRecord, ServiceOrderRecord,
    VehicleRecord, WebhookLogRecord,
};
use crate::traits::WorkshopStorage;

const CLIENTS: &str = "clientes";
const VEHICLES: &str = "veiculos";
const ORDERS: &str = "ordens_servico";
const PROCEDURES: &str = "procedimentos";
const HISTORY: &str = "historico_os";
const WEBHOOK_LOGS: &str = "webhook_logs";

/// Embedded-resource select that reads an order and all related rows at once.
const ORDER_DETAILS_SELECT: &str = "*,cliente:clientes(*),veiculo:veiculos(*),procedimentos(*),historico:historico_os(*),notificacoes(*)";

#[derive(Debug, Clone, Copy)]
enum WriteVerb {
    Post,
    Patch,
}

/// PostgREST-backed storage.
pub struct RestStorage {
    base_url: String,
    service_key: String,
    agent: ureq::Agent,
}

impl RestStorage {
    /// `base_url` is the project URL (e.g. `https://xyz.supabase.co`); the
    /// `/rest/v1` prefix is added here.
    pub fn new(base_url: &str, service_key: &str) -> Self {
        RestStorage {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// GET rows from `table` filtered by PostgREST query parameters.
    async fn select<T>(
        &self,
        table: &'static str,
        query: Vec<(&'static str, String)>,
    ) -> Result<Vec<T>, StorageError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = self.table_url(table);
        let agent = self.agent.clone();
        let key = self.service_key.clone();

        tokio::task::spawn_blocking(move || {
            let mut request = agent
                .get(&url)
                .header("apikey", &key)
                .header("Authorization", &format!("Bearer {}", key));
            for (name, value) in &query {
                request = request.query(*name, value);
            }

            let response = request
                .call()
                .map_err(|e| StorageError::Backend(format!("GET {}: {}", table, e)))?;

            response
                .into_body()
                .read_json::<Vec<T>>()
                .map_err(|e| StorageError::Decode(format!("{}: {}", table, e)))
        })
        .await
        .map_err(|e| StorageError::Backend(format!("task join error: {}", e)))?
    }

    /// POST or PATCH `body` and return the affected rows.
    async fn write<T, B>(
        &self,
        verb: WriteVerb,
        table: &'static str,
        query: Vec<(&'static str, String)>,
        body: &B,
    ) -> Result<Vec<T>, StorageError>
    where
        T: DeserializeOwned + Send + 'static,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| StorageError::Backend(format!("failed to encode {} row: {}", table, e)))?;
        let url = self.table_url(table);
        let agent = self.agent.clone();
        let key = self.service_key.clone();

        tokio::task::spawn_blocking(move || {
            let mut request = match verb {
                WriteVerb::Post => agent.post(&url),
                WriteVerb::Patch => agent.patch(&url),
            }
            .header("apikey", &key)
            .header("Authorization", &format!("Bearer {}", key))
            .header("Prefer", "return=representation");
            for (name, value) in &query {
                request = request.query(*name, value);
            }

            let response = request
                .send_json(&body)
                .map_err(|e| StorageError::Backend(format!("{:?} {}: {}", verb, table, e)))?;

            response
                .into_body()
                .read_json::<Vec<T>>()
                .map_err(|e| StorageError::Decode(format!("{}: {}", table, e)))
        })
        .await
        .map_err(|e| StorageError::Backend(format!("task join error: {}", e)))?
    }

    async fn insert_one<T, B>(&self, table: &'static str, body: &B) -> Result<T, StorageError>
    where
        T: DeserializeOwned + Send + 'static,
        B: Serialize,
    {
        self.write::<T, B>(WriteVerb::Post, table, Vec::new(), body)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::Decode(format!("{}: insert returned no row", table)))
    }

    async fn patch_order<B>(
        &self,
        order_id: &str,
        body: &B,
    ) -> Result<ServiceOrderRecord, StorageError>
    where
        B: Serialize,
    {
        self.write::<ServiceOrderRecord, B>(
            WriteVerb::Patch,
            ORDERS,
            vec![("id", format!("eq.{}", order_id))],
            body,
        )
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| StorageError::OrderNotFound {
            order_id: order_id.to_string(),
        })
    }
}

#[async_trait]
impl WorkshopStorage for RestStorage {
    async fn find_client_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<ClientRecord>, StorageError> {
        let rows = self
            .select(
                CLIENTS,
                vec![
                    ("select", "*".to_string()),
                    ("telefone", format!("eq.{}", phone)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_client(&self, client: NewClient) -> Result<ClientRecord, StorageError> {
        self.insert_one(CLIENTS, &client).await
    }

    async fn find_vehicle_by_plate(
        &self,
        plate: &str,
    ) -> Result<Option<VehicleRecord>, StorageError> {
        let rows = self
            .select(
                VEHICLES,
                vec![
                    ("select", "*".to_string()),
                    ("placa", format!("eq.{}", plate)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_vehicle(&self, vehicle: NewVehicle) -> Result<VehicleRecord, StorageError> {
        self.insert_one(VEHICLES, &vehicle).await
    }

    async fn insert_order(
        &self,
        order: NewServiceOrder,
    ) -> Result<ServiceOrderRecord, StorageError> {
        self.insert_one(ORDERS, &order).await
    }

    async fn find_order_by_number(
        &self,
        number: i64,
    ) -> Result<Option<ServiceOrderRecord>, StorageError> {
        let rows = self
            .select(
                ORDERS,
                vec![
                    ("select", "*".to_string()),
                    ("numero_os", format!("eq.{}", number)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<ServiceOrderRecord, StorageError> {
        self.patch_order(order_id, &serde_json::json!({ "status": status }))
            .await
    }

    async fn update_order_photos(
        &self,
        order_id: &str,
        photo_urls: Vec<String>,
    ) -> Result<(), StorageError> {
        self.patch_order(order_id, &serde_json::json!({ "fotos": photo_urls }))
            .await
            .map(|_| ())
    }

    async fn insert_procedure(
        &self,
        procedure: NewProcedure,
    ) -> Result<ProcedureRecord, StorageError> {
        self.insert_one(PROCEDURES, &procedure).await
    }

    async fn insert_history(&self, entry: NewHistoryEntry) -> Result<HistoryRecord, StorageError> {
        self.insert_one(HISTORY, &entry).await
    }

    async fn load_order_details(
        &self,
        number: i64,
    ) -> Result<Option<OrderDetails>, StorageError> {
        let rows = self
            .select(
                ORDERS,
                vec![
                    ("select", ORDER_DETAILS_SELECT.to_string()),
                    ("numero_os", format!("eq.{}", number)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_webhook_log(
        &self,
        log: NewWebhookLog,
    ) -> Result<WebhookLogRecord, StorageError> {
        self.insert_one(WEBHOOK_LOGS, &log).await
    }

    async fn list_webhook_logs(
        &self,
        limit: usize,
    ) -> Result<Vec<WebhookLogRecord>, StorageError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if limit > 0 {
            query.push(("limit", limit.to_string()));
        }
        self.select(WEBHOOK_LOGS, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;

    /// Serve exactly one HTTP response and report the raw request head.
    fn one_shot_server(status: u16, body: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let text = String::from_utf8_lossy(&head).to_string();
            let header_end = head
                .windows(4)
                .position(|w| w == b"\r\n\r\n")
                .map(|i| i + 4)
                .unwrap_or(head.len());
            let content_length = text
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let mut received = head.len() - header_end;
            while received < content_length {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                received += n;
            }
            tx.send(text).unwrap();

            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        });

        (format!("http://{}", addr), rx)
    }

    #[test]
    fn table_url_strips_trailing_slash() {
        let storage = RestStorage::new("https://demo.supabase.co/", "key");
        assert_eq!(
            storage.table_url(ORDERS),
            "https://demo.supabase.co/rest/v1/ordens_servico"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn find_client_sends_filter_and_service_key() {
        let (url, requests) = one_shot_server(
            200,
            r#"[{"id":"c-1","nome":"João Silva","telefone":"11999999999","created_at":"2025-01-01T00:00:00Z"}]"#,
        );
        let storage = RestStorage::new(&url, "service-key");

        let client = storage
            .find_client_by_phone("11999999999")
            .await
            .unwrap()
            .expect("client row");
        assert_eq!(client.id, "c-1");
        assert_eq!(client.name, "João Silva");

        let head = requests.recv().unwrap();
        assert!(head.starts_with("GET /rest/v1/clientes?"), "{head}");
        assert!(head.contains("telefone=eq.11999999999"), "{head}");
        assert!(head.to_lowercase().contains("apikey: service-key"), "{head}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_patch_result_is_order_not_found() {
        let (url, _requests) = one_shot_server(200, "[]");
        let storage = RestStorage::new(&url, "service-key");

        let result = storage
            .update_order_status("missing", OrderStatus::Done)
            .await;
        assert!(matches!(result, Err(StorageError::OrderNotFound { .. })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn backend_error_status_maps_to_backend_error() {
        let (url, _requests) = one_shot_server(500, r#"{"message":"boom"}"#);
        let storage = RestStorage::new(&url, "service-key");

        let result = storage.list_webhook_logs(10).await;
        assert!(matches!(result, Err(StorageError::Backend(_))));
    }
}
