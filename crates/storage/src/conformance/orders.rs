use std::future::Future;

use rust_decimal::Decimal;

use super::{make_client, make_order, make_vehicle, TestResult};
use crate::record::{NewHistoryEntry, NewProcedure, OrderStatus, ProcedureStatus};
use crate::{StorageError, WorkshopStorage};

pub(super) async fn run_order_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "orders",
        "order_numbers_are_sequential",
        order_numbers_are_sequential(factory).await,
    ));
    results.push(TestResult::from_result(
        "orders",
        "new_order_has_no_photos",
        new_order_has_no_photos(factory).await,
    ));
    results.push(TestResult::from_result(
        "orders",
        "unknown_number_is_none",
        unknown_number_is_none(factory).await,
    ));
    results.push(TestResult::from_result(
        "orders",
        "status_update_persists",
        status_update_persists(factory).await,
    ));
    results.push(TestResult::from_result(
        "orders",
        "status_update_unknown_id_is_order_not_found",
        status_update_unknown_id_is_order_not_found(factory).await,
    ));
    results.push(TestResult::from_result(
        "orders",
        "photo_update_replaces_list",
        photo_update_replaces_list(factory).await,
    ));
    results.push(TestResult::from_result(
        "orders",
        "details_include_related_rows",
        details_include_related_rows(factory).await,
    ));
    results.push(TestResult::from_result(
        "orders",
        "details_unknown_number_is_none",
        details_unknown_number_is_none(factory).await,
    ));

    results
}

/// Two inserts in a row get consecutive numbers.
async fn order_numbers_are_sequential<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let first = s
        .insert_order(make_order("c-1", None))
        .await
        .map_err(|e| e.to_string())?;
    let second = s
        .insert_order(make_order("c-1", None))
        .await
        .map_err(|e| e.to_string())?;
    if first.number <= 0 {
        return Err(format!("expected positive number, got {}", first.number));
    }
    if second.number != first.number + 1 {
        return Err(format!(
            "expected {} after {}, got {}",
            first.number + 1,
            first.number,
            second.number
        ));
    }
    if first.id == second.id {
        return Err("two orders share a primary key".to_string());
    }
    Ok(())
}

async fn new_order_has_no_photos<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let order = s
        .insert_order(make_order("c-1", None))
        .await
        .map_err(|e| e.to_string())?;
    if !order.photo_urls.is_empty() {
        return Err(format!("expected no photos, got {:?}", order.photo_urls));
    }
    if order.status != OrderStatus::Pending {
        return Err(format!("expected pendente, got {}", order.status));
    }
    if order.total_value != Decimal::new(18000, 2) {
        return Err(format!("expected 180.00, got {}", order.total_value));
    }
    Ok(())
}

async fn unknown_number_is_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.find_order_by_number(4242).await {
        Ok(None) => Ok(()),
        other => Err(format!("expected Ok(None), got {:?}", other)),
    }
}

async fn status_update_persists<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let order = s
        .insert_order(make_order("c-1", None))
        .await
        .map_err(|e| e.to_string())?;
    let updated = s
        .update_order_status(&order.id, OrderStatus::ReadyForPickup)
        .await
        .map_err(|e| e.to_string())?;
    if updated.status != OrderStatus::ReadyForPickup {
        return Err(format!("update returned {}", updated.status));
    }
    if updated.number != order.number {
        return Err("status update changed the order number".to_string());
    }

    let reread = s
        .find_order_by_number(order.number)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("order vanished after update")?;
    if reread.status != OrderStatus::ReadyForPickup {
        return Err(format!("expected pronto_retirada, got {}", reread.status));
    }
    Ok(())
}

async fn status_update_unknown_id_is_order_not_found<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.update_order_status("no-such-id", OrderStatus::Done).await {
        Err(StorageError::OrderNotFound { order_id }) if order_id == "no-such-id" => Ok(()),
        other => Err(format!("expected OrderNotFound, got {:?}", other)),
    }
}

async fn photo_update_replaces_list<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let order = s
        .insert_order(make_order("c-1", None))
        .await
        .map_err(|e| e.to_string())?;
    let photos = vec![
        "https://cdn.example.com/a.jpg".to_string(),
        "https://cdn.example.com/b.jpg".to_string(),
    ];
    s.update_order_photos(&order.id, photos.clone())
        .await
        .map_err(|e| e.to_string())?;

    let reread = s
        .find_order_by_number(order.number)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("order vanished after photo update")?;
    if reread.photo_urls != photos {
        return Err(format!("expected {:?}, got {:?}", photos, reread.photo_urls));
    }
    Ok(())
}

async fn details_include_related_rows<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let client = s
        .insert_client(make_client("11988887777"))
        .await
        .map_err(|e| e.to_string())?;
    let vehicle = s
        .insert_vehicle(make_vehicle(&client.id, "ABC1D23"))
        .await
        .map_err(|e| e.to_string())?;
    let order = s
        .insert_order(make_order(&client.id, Some(&vehicle.id)))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_procedure(NewProcedure {
        order_id: order.id.clone(),
        description: "Troca de pastilhas".to_string(),
        value: Decimal::new(18000, 2),
        status: ProcedureStatus::Pending,
    })
    .await
    .map_err(|e| e.to_string())?;
    s.insert_history(NewHistoryEntry {
        order_id: order.id.clone(),
        previous_status: Some(OrderStatus::Pending),
        new_status: OrderStatus::InProgress,
        note: Some("Peças chegaram".to_string()),
        actor: "webhook".to_string(),
    })
    .await
    .map_err(|e| e.to_string())?;

    let details = s
        .load_order_details(order.number)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("order details not found")?;
    if details.order.id != order.id {
        return Err(format!("expected order {}, got {}", order.id, details.order.id));
    }
    if details.client.as_ref().map(|c| c.id.as_str()) != Some(client.id.as_str()) {
        return Err(format!("client missing or wrong: {:?}", details.client));
    }
    if details.vehicle.as_ref().map(|v| v.id.as_str()) != Some(vehicle.id.as_str()) {
        return Err(format!("vehicle missing or wrong: {:?}", details.vehicle));
    }
    if details.procedures.len() != 1 {
        return Err(format!("expected 1 procedure, got {}", details.procedures.len()));
    }
    if details.history.len() != 1 || details.history[0].actor.as_deref() != Some("webhook") {
        return Err(format!("unexpected history: {:?}", details.history));
    }
    Ok(())
}

async fn details_unknown_number_is_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.load_order_details(31337).await {
        Ok(None) => Ok(()),
        other => Err(format!("expected Ok(None), got {:?}", other.map(|d| d.is_some()))),
    }
}
