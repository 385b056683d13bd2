use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ── Enumerations ─────────────────────────────────────────────────────────────

/// Lifecycle status of a service order.
///
/// Any status may follow any other; no transition graph is enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "aguardando_pecas")]
    AwaitingParts,
    #[serde(rename = "em_andamento")]
    InProgress,
    #[serde(rename = "pronto_retirada")]
    ReadyForPickup,
    #[serde(rename = "finalizado")]
    Done,
    #[serde(rename = "cancelado")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::AwaitingParts,
        OrderStatus::InProgress,
        OrderStatus::ReadyForPickup,
        OrderStatus::Done,
        OrderStatus::Cancelled,
    ];

    /// Wire literal, as stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pendente",
            OrderStatus::AwaitingParts => "aguardando_pecas",
            OrderStatus::InProgress => "em_andamento",
            OrderStatus::ReadyForPickup => "pronto_retirada",
            OrderStatus::Done => "finalizado",
            OrderStatus::Cancelled => "cancelado",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status '{}'", s))
    }
}

/// Status of a single billable procedure line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcedureStatus {
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "em_andamento")]
    InProgress,
    #[serde(rename = "concluido")]
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Whatsapp,
    Sms,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationStatus {
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "enviado")]
    Sent,
    #[serde(rename = "erro")]
    Failed,
}

/// Outcome column of the webhook audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogOutcome {
    #[serde(rename = "sucesso")]
    Success,
    #[serde(rename = "erro")]
    Error,
}

impl LogOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogOutcome::Success => "sucesso",
            LogOutcome::Error => "erro",
        }
    }
}

/// Nullable array columns decode to an empty list.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Clients and vehicles ─────────────────────────────────────────────────────

/// A workshop client. Deduplicated by phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "cpf_cnpj", default)]
    pub document: Option<String>,
    #[serde(rename = "endereco", default)]
    pub address: Option<String>,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "cpf_cnpj", skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

/// A vehicle owned by a client. Deduplicated by plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: String,
    #[serde(rename = "cliente_id")]
    pub client_id: String,
    #[serde(rename = "marca")]
    pub brand: String,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "placa")]
    pub plate: String,
    #[serde(rename = "ano", default)]
    pub year: Option<i32>,
    #[serde(rename = "cor", default)]
    pub color: Option<String>,
    #[serde(rename = "km_atual", default)]
    pub mileage: Option<i64>,
    #[serde(rename = "observacoes", default)]
    pub notes: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVehicle {
    #[serde(rename = "cliente_id")]
    pub client_id: String,
    #[serde(rename = "marca")]
    pub brand: String,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "placa")]
    pub plate: String,
    #[serde(rename = "ano", skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(rename = "cor", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

// ── Service orders ───────────────────────────────────────────────────────────

/// The central work-tracking record for a repair job.
///
/// `number` is the human-facing sequential identifier, assigned by storage
/// and never changed afterwards; `id` is the storage primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOrderRecord {
    pub id: String,
    #[serde(rename = "numero_os")]
    pub number: i64,
    #[serde(rename = "cliente_id")]
    pub client_id: String,
    #[serde(rename = "veiculo_id", default)]
    pub vehicle_id: Option<String>,
    pub status: OrderStatus,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "observacoes", default)]
    pub notes: Option<String>,
    #[serde(rename = "valor_total", with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    #[serde(rename = "valor_pago", with = "rust_decimal::serde::float", default)]
    pub paid_value: Decimal,
    #[serde(rename = "fotos", default, deserialize_with = "null_as_empty")]
    pub photo_urls: Vec<String>,
    #[serde(rename = "data_entrada", default)]
    pub entered_at: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewServiceOrder {
    #[serde(rename = "cliente_id")]
    pub client_id: String,
    #[serde(rename = "veiculo_id")]
    pub vehicle_id: Option<String>,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "observacoes", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "valor_total", with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
    pub status: OrderStatus,
}

/// One billable line item of a service order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureRecord {
    pub id: String,
    #[serde(rename = "ordem_servico_id")]
    pub order_id: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "valor", with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub status: ProcedureStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProcedure {
    #[serde(rename = "ordem_servico_id")]
    pub order_id: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "valor", with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub status: ProcedureStatus,
}

/// A manual status-change annotation on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    #[serde(rename = "ordem_servico_id")]
    pub order_id: String,
    #[serde(rename = "status_anterior", default)]
    pub previous_status: Option<OrderStatus>,
    #[serde(rename = "status_novo")]
    pub new_status: OrderStatus,
    #[serde(rename = "observacao", default)]
    pub note: Option<String>,
    #[serde(rename = "usuario", default)]
    pub actor: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    #[serde(rename = "ordem_servico_id")]
    pub order_id: String,
    #[serde(rename = "status_anterior")]
    pub previous_status: Option<OrderStatus>,
    #[serde(rename = "status_novo")]
    pub new_status: OrderStatus,
    #[serde(rename = "observacao")]
    pub note: Option<String>,
    #[serde(rename = "usuario")]
    pub actor: String,
}

/// A customer notification attached to an order. Read-only for the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    #[serde(rename = "ordem_servico_id")]
    pub order_id: String,
    #[serde(rename = "tipo")]
    pub channel: NotificationChannel,
    #[serde(rename = "destinatario")]
    pub recipient: String,
    #[serde(rename = "mensagem")]
    pub message: String,
    pub status: NotificationStatus,
    #[serde(rename = "erro_mensagem", default)]
    pub error_message: Option<String>,
    #[serde(rename = "enviado_em", default)]
    pub sent_at: Option<String>,
    pub created_at: String,
}

/// An order with every related record, as returned by a single aggregate read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: ServiceOrderRecord,
    #[serde(rename = "cliente", default)]
    pub client: Option<ClientRecord>,
    #[serde(rename = "veiculo", default)]
    pub vehicle: Option<VehicleRecord>,
    #[serde(rename = "procedimentos", default)]
    pub procedures: Vec<ProcedureRecord>,
    #[serde(rename = "historico", default)]
    pub history: Vec<HistoryRecord>,
    #[serde(rename = "notificacoes", default)]
    pub notifications: Vec<NotificationRecord>,
}

// ── Audit trail ──────────────────────────────────────────────────────────────

/// One append-only audit row per processed webhook call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookLogRecord {
    pub id: String,
    #[serde(rename = "acao")]
    pub action: String,
    /// Already masked by the caller.
    pub payload: serde_json::Value,
    #[serde(rename = "status")]
    pub outcome: LogOutcome,
    #[serde(rename = "erro_mensagem", default)]
    pub error_message: Option<String>,
    #[serde(rename = "ip_origem", default)]
    pub source_address: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWebhookLog {
    #[serde(rename = "acao")]
    pub action: String,
    pub payload: serde_json::Value,
    #[serde(rename = "status")]
    pub outcome: LogOutcome,
    #[serde(rename = "erro_mensagem", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "ip_origem", skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_round_trips_wire_literals() {
        for status in OrderStatus::ALL {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::json!(status.as_str()));
        }
        assert!("concluido".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn order_details_flattens_order_columns() {
        let details = OrderDetails {
            order: ServiceOrderRecord {
                id: "o-1".to_string(),
                number: 7,
                client_id: "c-1".to_string(),
                vehicle_id: None,
                status: OrderStatus::InProgress,
                description: "Alinhamento".to_string(),
                notes: None,
                total_value: Decimal::new(12050, 2),
                paid_value: Decimal::ZERO,
                photo_urls: vec![],
                entered_at: None,
                created_at: "2025-01-01T00:00:00Z".to_string(),
                updated_at: None,
            },
            client: None,
            vehicle: None,
            procedures: vec![],
            history: vec![],
            notifications: vec![],
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["numero_os"], 7);
        assert_eq!(json["status"], "em_andamento");
        assert_eq!(json["valor_total"], 120.5);
        assert!(json["procedimentos"].as_array().unwrap().is_empty());
    }

    #[test]
    fn service_order_decodes_integer_money() {
        let raw = serde_json::json!({
            "id": "o-1",
            "numero_os": 3,
            "cliente_id": "c-1",
            "veiculo_id": null,
            "status": "pendente",
            "descricao": "Troca de óleo",
            "valor_total": 250,
            "valor_pago": 0,
            "fotos": null,
            "created_at": "2025-01-01T00:00:00Z"
        });
        let order: ServiceOrderRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(order.total_value, Decimal::from(250));
        assert!(order.photo_urls.is_empty());
        assert!(order.notes.is_none());
    }
}
