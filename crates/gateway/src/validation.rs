//! Field validators and per-action payload validation.
//!
//! Validators are pure. Composite validation collects every failure instead
//! of stopping at the first one, and on success returns sanitized data.

use std::str::FromStr;
use std::sync::LazyLock;

use oficina_storage::OrderStatus;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::actions::{
    ActionKind, ClientInput, CreateOrderInput, ProcedureInput, QueryOrderInput,
    RegisterPhotoInput, UpdateStatusInput, WebhookAction,
};

pub const MAX_ORDER_NUMBER: i64 = 9_999_999;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_URL_LEN: usize = 2048;

pub const NAME_LEN: (usize, usize) = (2, 200);
pub const DESCRIPTION_LEN: (usize, usize) = (3, 500);
pub const MAX_NOTES_LEN: usize = 1000;
pub const MAX_TEXT_LEN: usize = 200;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

// Pre-2018 (ABC1234) and Mercosul (ABC1D23) layouts.
static PLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}[0-9][A-Z0-9][0-9]{2}$").expect("valid plate regex"));

/// Validation failure list, in the order the checks ran.
pub type ValidationErrors = Vec<String>;

// ── Field validators ─────────────────────────────────────────────────────────

/// Trim, strip `<` and `>`, cap at `max_chars` characters.
pub fn sanitize_string(input: &str, max_chars: usize) -> String {
    input
        .trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .take(max_chars)
        .collect()
}

pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Keep ASCII letters and digits, upper-cased.
pub fn normalize_plate(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

/// Brazilian phone: 10 or 11 digits once formatting is removed.
pub fn is_valid_phone(phone: &str) -> bool {
    matches!(digits_only(phone).len(), 10 | 11)
}

/// CPF (11 digits) or CNPJ (14 digits). Format only, no check digits.
pub fn is_valid_document(document: &str) -> bool {
    matches!(digits_only(document).len(), 11 | 14)
}

pub fn is_valid_plate(plate: &str) -> bool {
    PLATE_RE.is_match(&normalize_plate(plate))
}

pub fn is_valid_year(year: i64) -> bool {
    let latest = i64::from(time::OffsetDateTime::now_utc().year()) + 1;
    (1900..=latest).contains(&year)
}

pub fn is_valid_status(status: &str) -> bool {
    OrderStatus::from_str(status).is_ok()
}

pub fn is_valid_order_number(number: i64) -> bool {
    (1..=MAX_ORDER_NUMBER).contains(&number)
}

/// Absolute URL with an http or https scheme.
pub fn is_valid_url(candidate: &str) -> bool {
    match url::Url::parse(candidate) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

// ── JSON helpers ─────────────────────────────────────────────────────────────

/// A field counts as supplied unless it is missing, `null`, or `""`.
fn supplied<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    match object.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(v) => Some(v),
    }
}

/// Accept JSON integers and integral floats (`12.0`).
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(f as i64)
    } else {
        None
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

/// Optional free-text field: absent is fine, a non-string is an error.
fn optional_text(
    object: &Map<String, Value>,
    key: &str,
    label: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    match supplied(object, key)? {
        Value::String(s) => Some(sanitize_string(s, MAX_TEXT_LEN)),
        _ => {
            errors.push(format!("{label} must be text"));
            None
        }
    }
}

/// Text whose sanitized length must fall in `bounds`.
fn bounded_text(
    object: &Map<String, Value>,
    key: &str,
    label: &str,
    bounds: (usize, usize),
    errors: &mut ValidationErrors,
) -> Option<String> {
    let Some(Value::String(raw)) = supplied(object, key) else {
        errors.push(format!("{label} is required"));
        return None;
    };
    let clean = sanitize_string(raw, usize::MAX);
    let len = clean.chars().count();
    if len < bounds.0 || len > bounds.1 {
        errors.push(format!(
            "{label} must be between {} and {} characters",
            bounds.0, bounds.1
        ));
        return None;
    }
    Some(clean)
}

fn order_number(object: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<i64> {
    let Some(raw) = supplied(object, "numero_os") else {
        errors.push("numero_os is required".to_string());
        return None;
    };
    match as_integer(raw).filter(|n| is_valid_order_number(*n)) {
        Some(n) => Some(n),
        None => {
            errors.push(format!(
                "numero_os must be an integer between 1 and {MAX_ORDER_NUMBER}"
            ));
            None
        }
    }
}

fn status_list() -> String {
    OrderStatus::ALL
        .iter()
        .map(OrderStatus::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Per-action validation ────────────────────────────────────────────────────

/// Validate `payload` for the action selected by `kind`.
pub fn validate_action(kind: ActionKind, payload: &Value) -> Result<WebhookAction, ValidationErrors> {
    let empty = Map::new();
    let object = payload.as_object().unwrap_or(&empty);
    match kind {
        ActionKind::CreateOrder => validate_create_order(object).map(WebhookAction::CreateOrder),
        ActionKind::UpdateStatus => validate_update_status(object).map(WebhookAction::UpdateStatus),
        ActionKind::RegisterPhoto => {
            validate_register_photo(object).map(WebhookAction::RegisterPhoto)
        }
        ActionKind::QueryOrder => validate_query_order(object).map(WebhookAction::QueryOrder),
    }
}

pub fn validate_create_order(
    payload: &Map<String, Value>,
) -> Result<CreateOrderInput, ValidationErrors> {
    let mut errors = Vec::new();

    let client = match payload.get("cliente") {
        Some(Value::Object(client)) => validate_client(client, &mut errors),
        _ => {
            errors.push("client is required".to_string());
            None
        }
    };

    let procedure = match payload.get("procedimento") {
        Some(Value::Object(procedure)) => validate_procedure(procedure, &mut errors),
        _ => {
            errors.push("procedure is required".to_string());
            None
        }
    };

    match (client, procedure) {
        (Some(client), Some(procedure)) if errors.is_empty() => {
            Ok(CreateOrderInput { client, procedure })
        }
        _ => Err(errors),
    }
}

fn validate_client(client: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<ClientInput> {
    let before = errors.len();

    let name = bounded_text(client, "nome", "client name", NAME_LEN, errors);

    let phone = match supplied(client, "telefone") {
        Some(Value::String(raw)) if is_valid_phone(raw) => Some(digits_only(raw)),
        Some(Value::String(_)) => {
            errors.push("client phone is invalid".to_string());
            None
        }
        _ => {
            errors.push("client phone is required".to_string());
            None
        }
    };

    let email = match supplied(client, "email") {
        None => None,
        Some(Value::String(raw)) if is_valid_email(raw.trim()) => {
            Some(sanitize_string(raw, MAX_EMAIL_LEN))
        }
        Some(_) => {
            errors.push("client email is invalid".to_string());
            None
        }
    };

    let document = match supplied(client, "cpf_cnpj") {
        None => None,
        Some(Value::String(raw)) if is_valid_document(raw) => Some(digits_only(raw)),
        Some(_) => {
            errors.push("client document (CPF/CNPJ) is invalid".to_string());
            None
        }
    };

    let plate = match supplied(client, "placa") {
        None => None,
        Some(Value::String(raw)) if is_valid_plate(raw) => Some(normalize_plate(raw)),
        Some(_) => {
            errors.push("vehicle plate is invalid".to_string());
            None
        }
    };

    let year = match supplied(client, "ano") {
        None => None,
        Some(raw) => match as_integer(raw).filter(|y| is_valid_year(*y)) {
            Some(y) => i32::try_from(y).ok(),
            None => {
                errors.push("vehicle year is invalid".to_string());
                None
            }
        },
    };

    let car = optional_text(client, "carro", "client.carro", errors);
    let brand = optional_text(client, "marca", "client.marca", errors);
    let model = optional_text(client, "modelo", "client.modelo", errors);
    let color = optional_text(client, "cor", "client.cor", errors);

    if errors.len() != before {
        return None;
    }
    Some(ClientInput {
        name: name?,
        phone: phone?,
        email,
        document,
        car,
        plate,
        brand,
        model,
        year,
        color,
    })
}

fn validate_procedure(
    procedure: &Map<String, Value>,
    errors: &mut ValidationErrors,
) -> Option<ProcedureInput> {
    let before = errors.len();

    let description = bounded_text(
        procedure,
        "descricao",
        "procedure description",
        DESCRIPTION_LEN,
        errors,
    );

    let value = match procedure.get("valor") {
        None | Some(Value::Null) => None,
        Some(raw) => match as_decimal(raw).filter(|v| !v.is_sign_negative()) {
            Some(v) => Some(v),
            None => {
                errors.push("procedure value must be a non-negative number".to_string());
                None
            }
        },
    };

    let notes = match supplied(procedure, "observacoes") {
        None => None,
        Some(Value::String(raw)) => {
            let clean = sanitize_string(raw, usize::MAX);
            if clean.chars().count() > MAX_NOTES_LEN {
                errors.push(format!(
                    "procedure notes are too long (max {MAX_NOTES_LEN} characters)"
                ));
                None
            } else {
                Some(clean)
            }
        }
        Some(_) => {
            errors.push("procedure notes must be text".to_string());
            None
        }
    };

    if errors.len() != before {
        return None;
    }
    Some(ProcedureInput {
        description: description?,
        notes,
        value,
    })
}

pub fn validate_update_status(
    payload: &Map<String, Value>,
) -> Result<UpdateStatusInput, ValidationErrors> {
    let mut errors = Vec::new();

    let number = order_number(payload, &mut errors);

    let status = match supplied(payload, "status") {
        None => {
            errors.push("status is required".to_string());
            None
        }
        Some(raw) => match raw.as_str().map(OrderStatus::from_str) {
            Some(Ok(status)) => Some(status),
            _ => {
                errors.push(format!("status must be one of: {}", status_list()));
                None
            }
        },
    };

    let note = match supplied(payload, "observacao") {
        None => None,
        Some(Value::String(raw)) => Some(sanitize_string(raw, MAX_NOTES_LEN)),
        Some(_) => {
            errors.push("observacao must be text".to_string());
            None
        }
    };

    match (number, status) {
        (Some(number), Some(status)) if errors.is_empty() => Ok(UpdateStatusInput {
            number,
            status,
            note: note.filter(|n| !n.is_empty()),
        }),
        _ => Err(errors),
    }
}

pub fn validate_register_photo(
    payload: &Map<String, Value>,
) -> Result<RegisterPhotoInput, ValidationErrors> {
    let mut errors = Vec::new();

    let number = order_number(payload, &mut errors);

    let photo_url = match supplied(payload, "foto_url") {
        None => {
            errors.push("foto_url is required".to_string());
            None
        }
        Some(Value::String(raw)) if raw.len() <= MAX_URL_LEN && is_valid_url(raw.trim()) => {
            Some(raw.trim().to_string())
        }
        Some(_) => {
            errors.push(format!(
                "foto_url must be a valid http(s) URL of at most {MAX_URL_LEN} characters"
            ));
            None
        }
    };

    match (number, photo_url) {
        (Some(number), Some(photo_url)) if errors.is_empty() => {
            Ok(RegisterPhotoInput { number, photo_url })
        }
        _ => Err(errors),
    }
}

pub fn validate_query_order(
    payload: &Map<String, Value>,
) -> Result<QueryOrderInput, ValidationErrors> {
    let mut errors = Vec::new();
    match order_number(payload, &mut errors) {
        Some(number) => Ok(QueryOrderInput { number }),
        None => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn sanitize_trims_strips_and_truncates() {
        assert_eq!(sanitize_string("  <b>Olá</b>  ", 100), "bOlá/b");
        assert_eq!(sanitize_string("abcdef", 3), "abc");
        assert_eq!(sanitize_string("çãõéí", 2), "çã");
    }

    #[test]
    fn phone_counts_digits_only() {
        assert!(is_valid_phone("(11) 99999-9999"));
        assert!(is_valid_phone("1133334444"));
        assert!(!is_valid_phone("999-9999"));
        assert!(!is_valid_phone("+55 11 99999-9999"));
    }

    #[test]
    fn plate_accepts_both_layouts() {
        assert!(is_valid_plate("ABC1234"));
        assert!(is_valid_plate("abc-1d23"));
        assert!(!is_valid_plate("AB1234"));
        assert!(!is_valid_plate("ABCD123"));
    }

    #[test]
    fn email_and_document_formats() {
        assert!(is_valid_email("joao@oficina.com.br"));
        assert!(!is_valid_email("joao@oficina"));
        assert!(!is_valid_email("jo ao@oficina.com"));
        assert!(is_valid_document("123.456.789-09"));
        assert!(is_valid_document("12.345.678/0001-90"));
        assert!(!is_valid_document("1234"));
    }

    #[test]
    fn year_and_order_number_bounds() {
        assert!(is_valid_year(1900));
        assert!(!is_valid_year(1899));
        let next = i64::from(time::OffsetDateTime::now_utc().year()) + 1;
        assert!(is_valid_year(next));
        assert!(!is_valid_year(next + 1));

        assert!(is_valid_order_number(1));
        assert!(is_valid_order_number(MAX_ORDER_NUMBER));
        assert!(!is_valid_order_number(0));
        assert!(!is_valid_order_number(MAX_ORDER_NUMBER + 1));
    }

    #[test]
    fn url_requires_http_scheme() {
        assert!(is_valid_url("https://cdn.example.com/foto.jpg"));
        assert!(is_valid_url("http://10.0.0.1/a.png"));
        assert!(!is_valid_url("ftp://example.com/a.png"));
        assert!(!is_valid_url("javascript:alert(1)"));
        assert!(!is_valid_url("not a url"));
    }

    #[test]
    fn create_order_sanitizes_fields() {
        let input = validate_create_order(&object(json!({
            "cliente": {
                "nome": "  João <Silva>  ",
                "telefone": "(11) 99999-9999",
                "cpf_cnpj": "123.456.789-09",
                "placa": "abc-1d23",
                "carro": "Fiat Uno",
                "ano": 2015
            },
            "procedimento": { "descricao": "Troca de óleo", "valor": 250.5 }
        })))
        .unwrap();

        assert_eq!(input.client.name, "João Silva");
        assert_eq!(input.client.phone, "11999999999");
        assert_eq!(input.client.document.as_deref(), Some("12345678909"));
        assert_eq!(input.client.plate.as_deref(), Some("ABC1D23"));
        assert_eq!(input.client.year, Some(2015));
        assert_eq!(input.procedure.value, Some(Decimal::new(2505, 1)));
    }

    #[test]
    fn create_order_collects_every_error() {
        let errors = validate_create_order(&object(json!({
            "cliente": { "nome": "J", "telefone": "123", "email": "bad", "placa": "X" },
            "procedimento": { "descricao": "ok", "valor": -1 }
        })))
        .unwrap_err();

        assert_eq!(
            errors,
            vec![
                "client name must be between 2 and 200 characters",
                "client phone is invalid",
                "client email is invalid",
                "vehicle plate is invalid",
                "procedure description must be between 3 and 500 characters",
                "procedure value must be a non-negative number",
            ]
        );
    }

    #[test]
    fn create_order_requires_both_sections() {
        let errors = validate_create_order(&object(json!({ "acao": "criar_os" }))).unwrap_err();
        assert_eq!(errors, vec!["client is required", "procedure is required"]);
    }

    #[test]
    fn empty_optional_fields_are_ignored() {
        let input = validate_create_order(&object(json!({
            "cliente": { "nome": "Ana", "telefone": "11988887777", "email": "", "placa": null },
            "procedimento": { "descricao": "Alinhamento" }
        })))
        .unwrap();
        assert!(input.client.email.is_none());
        assert!(input.client.plate.is_none());
        assert!(input.procedure.value.is_none());
    }

    #[test]
    fn update_status_checks_number_and_status() {
        let ok = validate_update_status(&object(json!({
            "numero_os": 12.0, "status": "finalizado", "observacao": " Entregue "
        })))
        .unwrap();
        assert_eq!(ok.number, 12);
        assert_eq!(ok.status, OrderStatus::Done);
        assert_eq!(ok.note.as_deref(), Some("Entregue"));

        let errors = validate_update_status(&object(json!({
            "numero_os": 1.5, "status": "concluido"
        })))
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[1].starts_with("status must be one of: pendente, aguardando_pecas"));
    }

    #[test]
    fn register_photo_rejects_bad_urls() {
        let errors = validate_register_photo(&object(json!({
            "numero_os": 3, "foto_url": "file:///etc/passwd"
        })))
        .unwrap_err();
        assert_eq!(errors.len(), 1);

        let long = format!("https://cdn.example.com/{}", "a".repeat(MAX_URL_LEN));
        assert!(validate_register_photo(&object(json!({ "numero_os": 3, "foto_url": long }))).is_err());
    }

    #[test]
    fn query_order_requires_number() {
        assert_eq!(
            validate_query_order(&Map::new()).unwrap_err(),
            vec!["numero_os is required"]
        );
        assert_eq!(
            validate_query_order(&object(json!({ "numero_os": "7" }))).unwrap_err().len(),
            1
        );
    }

    #[test]
    fn dispatches_on_kind() {
        let action =
            validate_action(ActionKind::QueryOrder, &json!({ "acao": "consultar_os", "numero_os": 9 }))
                .unwrap();
        assert_eq!(action, WebhookAction::QueryOrder(QueryOrderInput { number: 9 }));
    }
}
