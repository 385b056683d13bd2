//! Conformance test suite for `WorkshopStorage` implementations.
//!
//! This module provides a backend-agnostic test suite that any
//! `WorkshopStorage` implementation can run to verify correctness. The suite
//! covers:
//!
//! - **Clients and vehicles**: insert, lookup by phone / plate, misses
//! - **Orders**: sequential numbering, status and photo updates, aggregate reads
//! - **Audit trail**: append, newest-first listing, limits
//! - **Concurrency**: order numbers stay unique under parallel inserts
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty storage instance for each test:
//!
//! ```ignore
//! use oficina_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn rest_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_rest_storage().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod clients;
mod concurrent;
mod logs;
mod orders;

use std::fmt;
use std::future::Future;

use rust_decimal::Decimal;

use crate::record::{NewClient, NewServiceOrder, NewVehicle, OrderStatus};
use crate::WorkshopStorage;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "clients", "orders", "logs").
    pub category: String,
    /// Test name (e.g. "order_numbers_are_sequential").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: result.is_ok(),
            message: result.err(),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// storage instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: WorkshopStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(clients::run_client_tests(&factory).await);
    results.extend(orders::run_order_tests(&factory).await);
    results.extend(logs::run_log_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn make_client(phone: &str) -> NewClient {
    NewClient {
        name: "Maria Santos".to_string(),
        phone: phone.to_string(),
        email: Some("maria@example.com".to_string()),
        document: None,
    }
}

fn make_vehicle(client_id: &str, plate: &str) -> NewVehicle {
    NewVehicle {
        client_id: client_id.to_string(),
        brand: "Toyota".to_string(),
        model: "Corolla".to_string(),
        plate: plate.to_string(),
        year: Some(2019),
        color: None,
    }
}

fn make_order(client_id: &str, vehicle_id: Option<&str>) -> NewServiceOrder {
    NewServiceOrder {
        client_id: client_id.to_string(),
        vehicle_id: vehicle_id.map(str::to_string),
        description: "Troca de pastilhas".to_string(),
        notes: None,
        total_value: Decimal::new(18000, 2),
        status: OrderStatus::Pending,
    }
}
