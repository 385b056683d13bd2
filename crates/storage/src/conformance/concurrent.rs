use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use super::{make_order, TestResult};
use crate::{StorageError, WorkshopStorage};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_inserts_get_unique_numbers",
            concurrent_inserts_get_unique_numbers(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_photo_writes_last_writer_wins",
            concurrent_photo_writes_last_writer_wins(factory).await,
        ),
    ]
}

// ── Parallel inserts ────────────────────────────────────────────────────────

/// N tasks insert orders at the same time. Every order must receive a
/// distinct sequential number.
async fn concurrent_inserts_get_unique_numbers<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            s.insert_order(make_order("c-1", None)).await
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let order = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if !numbers.insert(order.number) {
            return Err(format!("duplicate order number {}", order.number));
        }
    }

    if numbers.len() != N {
        return Err(format!("expected {N} distinct numbers, got {}", numbers.len()));
    }
    Ok(())
}

// ── Whole-list photo writes ─────────────────────────────────────────────────

/// Photo updates replace the whole list, so racing writers do not merge:
/// the stored list equals exactly one of the submitted lists.
async fn concurrent_photo_writes_last_writer_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let order = storage
        .insert_order(make_order("c-1", None))
        .await
        .map_err(|e| e.to_string())?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        let order_id = order.id.clone();
        handles.push(tokio::spawn(async move {
            s.update_order_photos(&order_id, vec![format!("https://cdn.example.com/{i}.jpg")])
                .await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
    }

    let stored = storage
        .find_order_by_number(order.number)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("order vanished")?;
    if stored.photo_urls.len() != 1 {
        return Err(format!(
            "expected exactly one surviving photo, got {:?}",
            stored.photo_urls
        ));
    }
    Ok(())
}
