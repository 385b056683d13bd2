use std::future::Future;

use super::TestResult;
use crate::record::{LogOutcome, NewWebhookLog};
use crate::WorkshopStorage;

pub(super) async fn run_log_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "logs",
            "log_round_trips_fields",
            log_round_trips_fields(factory).await,
        ),
        TestResult::from_result(
            "logs",
            "logs_listed_newest_first",
            logs_listed_newest_first(factory).await,
        ),
        TestResult::from_result(
            "logs",
            "limit_zero_returns_everything",
            limit_zero_returns_everything(factory).await,
        ),
    ]
}

fn make_log(action: &str, outcome: LogOutcome) -> NewWebhookLog {
    NewWebhookLog {
        action: action.to_string(),
        payload: serde_json::json!({ "acao": action }),
        outcome,
        error_message: match outcome {
            LogOutcome::Success => None,
            LogOutcome::Error => Some("order #9 not found".to_string()),
        },
        source_address: Some("203.0.113.7".to_string()),
    }
}

async fn log_round_trips_fields<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_webhook_log(make_log("consultar_os", LogOutcome::Error))
        .await
        .map_err(|e| e.to_string())?;

    let logs = s.list_webhook_logs(10).await.map_err(|e| e.to_string())?;
    let log = logs.first().ok_or("no log rows")?;
    if log.action != "consultar_os" || log.outcome != LogOutcome::Error {
        return Err(format!("unexpected row: {:?}", log));
    }
    if log.error_message.as_deref() != Some("order #9 not found") {
        return Err(format!("error message lost: {:?}", log.error_message));
    }
    if log.source_address.as_deref() != Some("203.0.113.7") {
        return Err(format!("source address lost: {:?}", log.source_address));
    }
    Ok(())
}

async fn logs_listed_newest_first<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for action in ["criar_os", "atualizar_status", "registrar_foto"] {
        s.insert_webhook_log(make_log(action, LogOutcome::Success))
            .await
            .map_err(|e| e.to_string())?;
    }

    let logs = s.list_webhook_logs(2).await.map_err(|e| e.to_string())?;
    let actions: Vec<&str> = logs.iter().map(|l| l.action.as_str()).collect();
    if actions != ["registrar_foto", "atualizar_status"] {
        return Err(format!("expected newest two first, got {:?}", actions));
    }
    Ok(())
}

async fn limit_zero_returns_everything<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for _ in 0..5 {
        s.insert_webhook_log(make_log("criar_os", LogOutcome::Success))
            .await
            .map_err(|e| e.to_string())?;
    }
    let logs = s.list_webhook_logs(0).await.map_err(|e| e.to_string())?;
    if logs.len() != 5 {
        return Err(format!("expected 5 rows, got {}", logs.len()));
    }
    Ok(())
}
