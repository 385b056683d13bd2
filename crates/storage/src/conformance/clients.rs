use std::future::Future;

use super::{make_client, make_vehicle, TestResult};
use crate::WorkshopStorage;

pub(super) async fn run_client_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "clients",
            "inserted_client_found_by_phone",
            inserted_client_found_by_phone(factory).await,
        ),
        TestResult::from_result(
            "clients",
            "unknown_phone_is_none",
            unknown_phone_is_none(factory).await,
        ),
        TestResult::from_result(
            "clients",
            "inserted_vehicle_found_by_plate",
            inserted_vehicle_found_by_plate(factory).await,
        ),
        TestResult::from_result(
            "clients",
            "unknown_plate_is_none",
            unknown_plate_is_none(factory).await,
        ),
    ]
}

async fn inserted_client_found_by_phone<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let inserted = s
        .insert_client(make_client("11988887777"))
        .await
        .map_err(|e| e.to_string())?;
    if inserted.id.is_empty() {
        return Err("insert_client returned an empty id".to_string());
    }

    let found = s
        .find_client_by_phone("11988887777")
        .await
        .map_err(|e| e.to_string())?
        .ok_or("client not found after insert")?;
    if found.id != inserted.id {
        return Err(format!("expected id {}, got {}", inserted.id, found.id));
    }
    if found.email.as_deref() != Some("maria@example.com") {
        return Err(format!("email not persisted: {:?}", found.email));
    }
    Ok(())
}

async fn unknown_phone_is_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_client(make_client("11988887777"))
        .await
        .map_err(|e| e.to_string())?;
    match s.find_client_by_phone("21911112222").await {
        Ok(None) => Ok(()),
        other => Err(format!("expected Ok(None), got {:?}", other)),
    }
}

async fn inserted_vehicle_found_by_plate<S, F, Fut>(factory: &F) -> Result<(), String>
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

    let found = s
        .find_vehicle_by_plate("ABC1D23")
        .await
        .map_err(|e| e.to_string())?
        .ok_or("vehicle not found after insert")?;
    if found.id != vehicle.id || found.client_id != client.id {
        return Err(format!(
            "expected vehicle {} owned by {}, got {} owned by {}",
            vehicle.id, client.id, found.id, found.client_id
        ));
    }
    Ok(())
}

async fn unknown_plate_is_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.find_vehicle_by_plate("XYZ9999").await {
        Ok(None) => Ok(()),
        other => Err(format!("expected Ok(None), got {:?}", other)),
    }
}
