//! # Mutation Orchestrator
//!
//! Runs every order mutation through one guarded lifecycle.
//!
//! ## Order Processing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      process_order(raw)                                 │
//! │                                                                         │
//! │  VALIDATE ──(invalid)──► { success: false, errors, warnings }           │
//! │     │                                                                   │
//! │  SANITIZE                                                               │
//! │     │                                                                   │
//! │  ACQUIRE_LOCK ──(held)──► { success: false, error, lockInfo }           │
//! │     │                                                                   │
//! │  ┌──┴───────────────── locked region (LockGuard) ──────────────────┐   │
//! │  │ version check vs working set ──(stale)──► VersionConflict       │   │
//! │  │ MUTATE: version + 1, processed_at = now, caller hook            │   │
//! │  │ STORE in working set                                            │   │
//! │  └──┬──────────────────────────────────────────────────────────────┘   │
//! │  RELEASE_LOCK (guard drop: success, error and panic paths alike)       │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  { success: true, order, warnings }                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Working Set
//! The processor keeps the orders it has accepted in memory so status
//! updates can be checked against the current version. The caller remains
//! responsible for persisting every returned order and may seed the working
//! set at startup with [`OrderProcessor::load_orders`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use orderline_core::{
    sanitize_order_at, validate_order_with, Order, OrderStatus, ValidationReport,
    ValidationRules,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, LockConflict};
use crate::lock::{LockGuard, LockManager};

// =============================================================================
// Boundary Result Shapes
// =============================================================================

/// Lock state reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,
}

impl From<&LockConflict> for LockInfo {
    fn from(conflict: &LockConflict) -> Self {
        LockInfo {
            success: false,
            lock_token: None,
            version: None,
            error: Some(conflict.to_string()),
            locked_by: Some(conflict.locked_by.clone()),
            locked_at: Some(conflict.locked_at),
        }
    }
}

/// Result of one orchestrated mutation. Never carries a panic or a raw
/// error across the boundary: every failure is rendered to data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_info: Option<LockInfo>,
}

impl ProcessOutcome {
    fn accepted(order: Order, warnings: Vec<String>) -> Self {
        ProcessOutcome {
            success: true,
            order: Some(order),
            errors: Vec::new(),
            warnings,
            error: None,
            lock_info: None,
        }
    }

    fn rejected(report: ValidationReport) -> Self {
        ProcessOutcome {
            success: false,
            order: None,
            errors: report.errors,
            warnings: report.warnings,
            error: None,
            lock_info: None,
        }
    }

    fn lock_conflict(conflict: &LockConflict) -> Self {
        ProcessOutcome {
            lock_info: Some(LockInfo::from(conflict)),
            ..Self::failed(&EngineError::from(conflict.clone()))
        }
    }

    fn failed(err: &EngineError) -> Self {
        ProcessOutcome {
            success: false,
            order: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            error: Some(err.to_string()),
            lock_info: None,
        }
    }
}

// =============================================================================
// Order Processor
// =============================================================================

/// Validates, locks and version-stamps order mutations.
#[derive(Debug)]
pub struct OrderProcessor {
    locks: Arc<LockManager>,
    rules: ValidationRules,
    orders: RwLock<HashMap<String, Order>>,
}

impl OrderProcessor {
    /// Creates a processor with the default validation rules.
    pub fn new(locks: Arc<LockManager>) -> Self {
        Self::with_rules(locks, ValidationRules::default())
    }

    /// Creates a processor with explicit validation rules.
    pub fn with_rules(locks: Arc<LockManager>, rules: ValidationRules) -> Self {
        OrderProcessor {
            locks,
            rules,
            orders: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a processor and its lock table from configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_rules(
            Arc::new(LockManager::from_settings(&config.locks)),
            config.validation,
        )
    }

    /// The lock table shared with other components (e.g. the menu catalog).
    pub fn locks(&self) -> &Arc<LockManager> {
        &self.locks
    }

    /// Seeds the working set with orders read from the caller's store.
    pub fn load_orders<I>(&self, orders: I)
    where
        I: IntoIterator<Item = Order>,
    {
        let mut book = self.orders.write().unwrap_or_else(PoisonError::into_inner);
        for order in orders {
            book.insert(order.id.clone(), order);
        }
    }

    /// Drops `order_id` from the working set, typically once the caller has
    /// persisted it. Returns the removed record.
    pub fn remove_order(&self, order_id: &str) -> Option<Order> {
        let removed = self
            .orders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(order_id);
        if removed.is_some() {
            debug!(order_id, "Order removed from working set");
        }
        removed
    }

    /// Number of orders currently held in the working set.
    pub fn order_count(&self) -> usize {
        self.orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns a copy of the current record for `order_id`.
    pub fn get_order(&self, order_id: &str) -> Option<Order> {
        self.orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(order_id)
            .cloned()
    }

    fn store(&self, order: Order) {
        self.orders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(order.id.clone(), order);
    }

    /// Admits a raw order.
    ///
    /// ## Example
    /// ```rust
    /// use std::sync::Arc;
    /// use orderline_engine::{LockManager, OrderProcessor};
    /// use orderline_core::OrderStatus;
    /// use serde_json::json;
    ///
    /// let processor = OrderProcessor::new(Arc::new(LockManager::new()));
    /// let outcome = processor.process_order(&json!({
    ///     "id": "o1",
    ///     "table_number": 1,
    ///     "items": [
    ///         { "id": "i1", "name": "Tea", "price": 10, "quantity": 2 },
    ///         { "id": "i2", "name": "Bun", "price": 5, "quantity": 1 }
    ///     ],
    ///     "total": 25
    /// }));
    ///
    /// assert!(outcome.success);
    /// let order = outcome.order.unwrap();
    /// assert_eq!(order.version, 1);
    /// assert_eq!(order.status, OrderStatus::Pending);
    /// ```
    pub fn process_order(&self, raw: &Value) -> ProcessOutcome {
        self.process_order_with(raw, |_| Ok(()))
    }

    /// Admits a raw order, running `mutate` inside the locked region after
    /// the version stamp and before the order is stored.
    ///
    /// An error from `mutate` discards the mutation and is reported as a
    /// processing failure. The lock is released either way, and also if
    /// `mutate` panics.
    pub fn process_order_with<F>(&self, raw: &Value, mutate: F) -> ProcessOutcome
    where
        F: FnOnce(&mut Order) -> EngineResult<()>,
    {
        let report = validate_order_with(raw, &self.rules);
        if !report.valid {
            info!(errors = report.errors.len(), "Order rejected by validation");
            return ProcessOutcome::rejected(report);
        }

        let now = self.locks.now();
        let order = sanitize_order_at(raw, now);

        let guard = match self.locks.acquire_guard(&order.id, Some(order.version)) {
            Ok(guard) => guard,
            Err(conflict) => return ProcessOutcome::lock_conflict(&conflict),
        };

        match self.mutate_locked(order, now, mutate) {
            Ok(order) => {
                release(guard);
                info!(order_id = %order.id, version = order.version, total = order.calculated_total(), "Order processed");
                ProcessOutcome::accepted(order, report.warnings)
            }
            Err(e) => ProcessOutcome::failed(&e),
        }
    }

    fn mutate_locked<F>(&self, mut order: Order, now: DateTime<Utc>, mutate: F) -> EngineResult<Order>
    where
        F: FnOnce(&mut Order) -> EngineResult<()>,
    {
        if let Some(current) = self.get_order(&order.id) {
            self.locks
                .validate_version(&order.id, order.version, current.version)?;
            if current.status.is_terminal() {
                return Err(EngineError::InvalidStatusTransition {
                    order_id: order.id,
                    from: current.status,
                    to: order.status,
                });
            }
        }

        order.version = next_version(&order)?;
        order.processed_at = Some(now);
        order.last_modified = now;

        mutate(&mut order).map_err(|e| {
            error!(order_id = %order.id, error = %e, "Order mutation failed");
            match e {
                EngineError::Processing(_) => e,
                other => EngineError::Processing(other.to_string()),
            }
        })?;

        self.store(order.clone());
        Ok(order)
    }

    /// Moves an order to `new_status` if the caller's `current_version` is
    /// still the stored one.
    ///
    /// Orders that are completed or cancelled accept no further changes.
    pub fn update_order_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
        current_version: u64,
    ) -> ProcessOutcome {
        let guard = match self.locks.acquire_guard(order_id, Some(current_version)) {
            Ok(guard) => guard,
            Err(conflict) => return ProcessOutcome::lock_conflict(&conflict),
        };

        match self.transition_locked(order_id, new_status, current_version) {
            Ok(order) => {
                release(guard);
                info!(order_id, status = %order.status, version = order.version, "Order status updated");
                ProcessOutcome::accepted(order, Vec::new())
            }
            Err(e) => ProcessOutcome::failed(&e),
        }
    }

    fn transition_locked(
        &self,
        order_id: &str,
        new_status: OrderStatus,
        expected_version: u64,
    ) -> EngineResult<Order> {
        let mut order = self
            .get_order(order_id)
            .ok_or_else(|| EngineError::OrderNotFound(order_id.to_string()))?;

        self.locks
            .validate_version(order_id, expected_version, order.version)?;

        if order.status.is_terminal() {
            return Err(EngineError::InvalidStatusTransition {
                order_id: order_id.to_string(),
                from: order.status,
                to: new_status,
            });
        }

        order.status = new_status;
        order.version = next_version(&order)?;
        order.last_modified = self.locks.now();

        self.store(order.clone());
        Ok(order)
    }
}

fn next_version(order: &Order) -> EngineResult<u64> {
    order.version.checked_add(1).ok_or_else(|| {
        EngineError::Processing(format!("version of order {} cannot be incremented", order.id))
    })
}

/// Explicit release on the success path so a lost lock gets logged.
fn release(guard: LockGuard<'_>) {
    let entity_id = guard.grant().entity_id.clone();
    if let Err(e) = guard.release() {
        warn!(%entity_id, error = %e, "Lock was lost before release");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::lock::DEFAULT_LOCK_TTL;
    use serde_json::json;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn processor() -> OrderProcessor {
        OrderProcessor::new(Arc::new(LockManager::new()))
    }

    fn tea_and_bun() -> Value {
        json!({
            "id": "o1",
            "table_number": 1,
            "items": [
                { "id": "i1", "name": "Tea", "price": 10, "quantity": 2 },
                { "id": "i2", "name": "Bun", "price": 5, "quantity": 1 }
            ],
            "total": 25
        })
    }

    #[test]
    fn test_end_to_end_order() {
        let processor = processor();
        let outcome = processor.process_order(&tea_and_bun());

        assert!(outcome.success, "{:?}", outcome);
        let order = outcome.order.unwrap();
        assert_eq!(order.version, 1);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.processed_at.is_some());
        assert_eq!(processor.get_order("o1").unwrap(), order);
        assert!(!processor.locks().is_locked("o1"));
    }

    #[test]
    fn test_processed_at_comes_from_lock_clock() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let locks = Arc::new(LockManager::with_clock(DEFAULT_LOCK_TTL, clock));
        let processor = OrderProcessor::new(locks);

        let order = processor.process_order(&tea_and_bun()).order.unwrap();
        assert_eq!(order.processed_at, Some(start));
        assert_eq!(order.created_at, start);
    }

    #[test]
    fn test_invalid_order_never_locks() {
        let processor = processor();
        let outcome = processor.process_order(&json!({ "id": "o1", "items": [] }));

        assert!(!outcome.success);
        assert!(outcome
            .errors
            .contains(&"Missing required field: table_number".to_string()));
        assert_eq!(outcome.warnings, vec!["Order has no items".to_string()]);
        assert!(outcome.order.is_none());
        assert!(processor.get_order("o1").is_none());
    }

    #[test]
    fn test_warnings_survive_acceptance() {
        let processor = processor();
        let outcome = processor.process_order(&json!({ "id": "o2", "table_number": 3, "items": [] }));
        assert!(outcome.success);
        assert_eq!(outcome.warnings, vec!["Order has no items".to_string()]);
    }

    #[test]
    fn test_locked_order_reports_lock_info() {
        let processor = processor();
        let held = processor.locks().acquire("o1", None).unwrap();

        let outcome = processor.process_order(&tea_and_bun());
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("currently being modified"));
        let info = outcome.lock_info.unwrap();
        assert!(!info.success);
        assert_eq!(info.locked_by, Some(held.token.to_string()));
        assert_eq!(info.locked_at, Some(held.acquired_at));
    }

    #[test]
    fn test_resubmission_requires_current_version() {
        let processor = processor();
        processor.process_order(&tea_and_bun());

        // Resending the original payload (version 0) is a lost update.
        let stale = processor.process_order(&tea_and_bun());
        assert!(!stale.success);
        assert!(stale.error.unwrap().contains("Version conflict"));

        let mut current = tea_and_bun();
        current["version"] = json!(1);
        let outcome = processor.process_order(&current);
        assert!(outcome.success);
        assert_eq!(outcome.order.unwrap().version, 2);
    }

    #[test]
    fn test_hook_error_releases_lock() {
        let processor = processor();
        let outcome = processor.process_order_with(&tea_and_bun(), |_| {
            Err(EngineError::Processing("kitchen printer offline".into()))
        });

        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Processing failed: kitchen printer offline")
        );
        assert!(processor.get_order("o1").is_none());
        assert!(processor.locks().acquire("o1", None).is_ok());
    }

    #[test]
    fn test_hook_panic_releases_lock() {
        let processor = processor();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            processor.process_order_with(&tea_and_bun(), |_| panic!("unexpected"))
        }));

        assert!(result.is_err());
        assert!(processor.locks().acquire("o1", None).is_ok());
    }

    #[test]
    fn test_hook_sees_stamped_order() {
        let processor = processor();
        let outcome = processor.process_order_with(&tea_and_bun(), |order| {
            assert_eq!(order.version, 1);
            order.items[0].notes = Some("less sugar".into());
            Ok(())
        });
        let stored = processor.get_order("o1").unwrap();
        assert_eq!(stored.items[0].notes.as_deref(), Some("less sugar"));
        assert_eq!(outcome.order.unwrap(), stored);
    }

    #[test]
    fn test_update_status() {
        let processor = processor();
        processor.process_order(&tea_and_bun());

        let outcome = processor.update_order_status("o1", OrderStatus::Preparing, 1);
        assert!(outcome.success, "{:?}", outcome);
        let order = outcome.order.unwrap();
        assert_eq!(order.status, OrderStatus::Preparing);
        assert_eq!(order.version, 2);
        assert!(!processor.locks().is_locked("o1"));
    }

    #[test]
    fn test_update_status_version_conflict_releases_lock() {
        let processor = processor();
        processor.process_order(&tea_and_bun());

        let outcome = processor.update_order_status("o1", OrderStatus::Ready, 5);
        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Version conflict for 'o1': provided 5, current 1")
        );
        assert!(!processor.locks().is_locked("o1"));
        assert_eq!(processor.get_order("o1").unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn test_update_status_unknown_order() {
        let processor = processor();
        let outcome = processor.update_order_status("ghost", OrderStatus::Ready, 0);
        assert_eq!(outcome.error.as_deref(), Some("Order not found: ghost"));
        assert!(!processor.locks().is_locked("ghost"));
    }

    #[test]
    fn test_terminal_orders_are_frozen() {
        let processor = processor();
        processor.process_order(&tea_and_bun());
        assert!(processor.update_order_status("o1", OrderStatus::Cancelled, 1).success);

        let outcome = processor.update_order_status("o1", OrderStatus::Pending, 2);
        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Order o1 is cancelled, cannot move to pending")
        );
    }

    #[test]
    fn test_resubmission_cannot_reopen_terminal_order() {
        let processor = processor();
        processor.process_order(&tea_and_bun());
        assert!(processor.update_order_status("o1", OrderStatus::Cancelled, 1).success);

        let mut reopened = tea_and_bun();
        reopened["version"] = json!(2);
        let outcome = processor.process_order(&reopened);
        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Order o1 is cancelled, cannot move to pending")
        );

        let stored = processor.get_order("o1").unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        assert_eq!(stored.version, 2);
        assert!(!processor.locks().is_locked("o1"));
    }

    #[test]
    fn test_exhausted_version_is_a_processing_failure() {
        let processor = processor();

        let mut raw = tea_and_bun();
        raw["version"] = json!(u64::MAX);
        let outcome = processor.process_order(&raw);
        assert!(!outcome.success);
        assert!(outcome
            .errors
            .contains(&"version must be a non-negative integer".to_string()));

        let mut order = sanitize_order_at(&tea_and_bun(), Utc::now());
        order.version = u64::MAX;
        processor.load_orders([order]);

        let outcome = processor.update_order_status("o1", OrderStatus::Ready, u64::MAX);
        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Processing failed: version of order o1 cannot be incremented")
        );
        assert_eq!(processor.get_order("o1").unwrap().status, OrderStatus::Pending);
        assert!(!processor.locks().is_locked("o1"));
    }

    #[test]
    fn test_remove_order_shrinks_working_set() {
        let processor = processor();
        processor.process_order(&tea_and_bun());
        assert_eq!(processor.order_count(), 1);

        let removed = processor.remove_order("o1").unwrap();
        assert_eq!(removed.version, 1);
        assert_eq!(processor.order_count(), 0);
        assert!(processor.get_order("o1").is_none());
        assert!(processor.remove_order("o1").is_none());

        // A forgotten order is admitted again as new.
        assert!(processor.process_order(&tea_and_bun()).success);
    }

    #[test]
    fn test_racing_status_updates_one_wins() {
        let processor = processor();
        processor.process_order(&tea_and_bun());
        let successes = AtomicUsize::new(0);

        thread::scope(|s| {
            for status in [OrderStatus::Preparing, OrderStatus::Cancelled] {
                let processor = &processor;
                let successes = &successes;
                s.spawn(move || {
                    if processor.update_order_status("o1", status, 1).success {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        // Either the loser hit the lock, or it found version 2 afterwards.
        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(processor.get_order("o1").unwrap().version, 2);
    }

    #[test]
    fn test_outcome_wire_shape() {
        let processor = processor();
        processor.locks().acquire("o1", None).unwrap();
        let value = serde_json::to_value(processor.process_order(&tea_and_bun())).unwrap();

        assert_eq!(value["success"], json!(false));
        assert!(value["lockInfo"]["lockedBy"].is_string());
        assert!(value.get("order").is_none());
        assert!(value.get("errors").is_none());
    }
}
