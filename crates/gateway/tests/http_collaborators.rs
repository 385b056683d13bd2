//! Relay client and status notifier against real local HTTP servers.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use oficina_gateway::config::GatewayConfig;
use oficina_gateway::notify::{StatusChangeNotice, StatusNotifier};
use oficina_gateway::relay::{HttpRelay, Relay};
use oficina_gateway::{build_router, AppState, WEBHOOK_PATH};
use oficina_storage::{MemoryStorage, OrderStatus, WorkshopStorage};
use serde_json::{json, Value};

#[derive(Default)]
struct Captured {
    requests: Mutex<Vec<(Option<String>, Value)>>,
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

async fn capture(
    State(captured): State<Arc<Captured>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    captured.requests.lock().unwrap().push((auth, body));
    StatusCode::OK
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn relay_posts_json_with_bearer_token() {
    let captured = Arc::new(Captured::default());
    let addr = serve(
        Router::new()
            .route("/hook", post(capture))
            .with_state(captured.clone()),
    )
    .await;

    let relay = HttpRelay::new(
        Some(format!("http://{addr}/hook")),
        Some("relay-token".to_string()),
    );
    let outcome = relay.forward(&json!({ "acao": "criar_os", "success": true })).await;
    assert!(outcome.success);
    assert_eq!(outcome.status, Some(200));

    let requests = captured.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0.as_deref(), Some("Bearer relay-token"));
    assert_eq!(requests[0].1["acao"], "criar_os");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn relay_reports_downstream_status() {
    let addr = serve(Router::new().route(
        "/hook",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
    ))
    .await;

    let relay = HttpRelay::new(Some(format!("http://{addr}/hook")), None);
    let outcome = relay.forward(&json!({})).await;
    assert!(!outcome.success);
    assert_eq!(outcome.status, Some(502));
    assert!(outcome.error.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn notifier_round_trips_through_gateway() {
    let storage = Arc::new(MemoryStorage::new());
    let config = GatewayConfig {
        webhook_secret: Some("bare-secret".to_string()),
        ..GatewayConfig::default()
    };
    let state = AppState::new(
        &config,
        storage.clone(),
        Arc::new(HttpRelay::new(None, None)),
    );
    let addr = serve(build_router(Arc::new(state))).await;

    let order = storage
        .insert_order(oficina_storage::NewServiceOrder {
            client_id: "c-1".to_string(),
            vehicle_id: None,
            description: "Revisão".to_string(),
            notes: None,
            total_value: rust_decimal::Decimal::ZERO,
            status: OrderStatus::InProgress,
        })
        .await
        .unwrap();

    let notifier = StatusNotifier::new(
        format!("http://{addr}{WEBHOOK_PATH}"),
        Some("bare-secret".to_string()),
    );
    let report = notifier
        .notify(&StatusChangeNotice {
            number: order.number,
            previous: OrderStatus::InProgress,
            current: OrderStatus::ReadyForPickup,
        })
        .await
        .unwrap();

    assert!(report.is_success(), "report: {:?}", report);
    assert_eq!(report.body["data"]["status_novo"], "pronto_retirada");
    // Relay is unconfigured, so the gateway reports it as not sent.
    assert_eq!(report.body["n8n"]["enviado"], false);

    let history = storage.history_for(&order.id).await;
    assert_eq!(history.len(), 1);
    assert_eq!(
        history[0].note.as_deref(),
        Some("Status changed from em_andamento to pronto_retirada via web interface")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn notifier_wraps_non_json_error_pages() {
    let addr = serve(Router::new().route(
        WEBHOOK_PATH,
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "<html>boom</html>") }),
    ))
    .await;

    let notifier = StatusNotifier::new(
        format!("http://{addr}{WEBHOOK_PATH}"),
        Some("bare-secret".to_string()),
    );
    let report = notifier
        .notify(&StatusChangeNotice {
            number: 1,
            previous: OrderStatus::Pending,
            current: OrderStatus::Cancelled,
        })
        .await
        .unwrap();
    assert!(!report.is_success());
    assert_eq!(report.status, 500);
    assert_eq!(
        report.body,
        json!({ "error": "Invalid response format", "responseText": "<html>boom</html>" })
    );
}
