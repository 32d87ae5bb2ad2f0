//! # Menu Catalog
//!
//! Thread-safe menu catalog: the core [`IdentityIndex`] behind an `RwLock`,
//! with every mutation validated first and serialized per item through the
//! shared [`LockManager`].
//!
//! ## Create / Update Flow
//! ```text
//! raw item ──► validate_menu_item (read lock on index)
//!                  │
//!                  ├── invalid / duplicate id ──► errors + "Suggested id: x_1"
//!                  │
//!                  ▼
//!              sanitize_menu_item
//!                  │
//!              acquire "menu:<id>" ──(held)──► lockInfo
//!                  │
//!              index.add / index.update (write lock on index)
//!                  │
//!              release (guard drop)
//! ```
//!
//! The index re-checks uniqueness under its write lock, so two creators
//! racing on the same new id cannot both get in.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use orderline_core::{
    sanitize_menu_item, validate_menu_item_with, IdentityIndex, MenuItem, ValidationReport,
    ValidationRules,
};

use crate::error::{EngineError, EngineResult, LockConflict};
use crate::lock::LockManager;
use crate::orchestrator::LockInfo;

/// Lock-table key for a menu item.
fn menu_key(id: &str) -> String {
    format!("menu:{id}")
}

/// Result of a catalog mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<MenuItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_info: Option<LockInfo>,
}

impl CatalogOutcome {
    fn accepted(item: MenuItem, warnings: Vec<String>) -> Self {
        CatalogOutcome {
            success: true,
            item: Some(item),
            errors: Vec::new(),
            warnings,
            error: None,
            lock_info: None,
        }
    }

    fn rejected(report: ValidationReport) -> Self {
        CatalogOutcome {
            success: false,
            item: None,
            errors: report.errors,
            warnings: report.warnings,
            error: None,
            lock_info: None,
        }
    }

    fn failed(err: &EngineError) -> Self {
        CatalogOutcome {
            success: false,
            item: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            error: Some(err.to_string()),
            lock_info: None,
        }
    }

    fn lock_conflict(conflict: &LockConflict) -> Self {
        CatalogOutcome {
            lock_info: Some(LockInfo::from(conflict)),
            ..Self::failed(&EngineError::from(conflict.clone()))
        }
    }
}

/// Shared menu catalog.
#[derive(Debug)]
pub struct MenuCatalog {
    index: RwLock<IdentityIndex>,
    locks: Arc<LockManager>,
    rules: ValidationRules,
}

impl MenuCatalog {
    pub fn new(locks: Arc<LockManager>) -> Self {
        Self::with_rules(locks, ValidationRules::default())
    }

    pub fn with_rules(locks: Arc<LockManager>, rules: ValidationRules) -> Self {
        MenuCatalog {
            index: RwLock::new(IdentityIndex::new()),
            locks,
            rules,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, IdentityIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IdentityIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuilds the catalog from the caller's store.
    pub fn load_existing_items<I>(&self, items: I)
    where
        I: IntoIterator<Item = MenuItem>,
    {
        let mut index = self.write();
        index.load_existing_items(items);
        info!(items = index.len(), "Menu catalog loaded");
    }

    /// Validates a raw item against the current catalog without changing it.
    pub fn validate(&self, raw: &Value, original_id: Option<&str>) -> ValidationReport {
        validate_menu_item_with(
            raw,
            &self.read(),
            original_id.is_some(),
            original_id,
            &self.rules,
        )
    }

    /// Adds a new item.
    pub fn create_item(&self, raw: &Value) -> CatalogOutcome {
        let report = self.validate(raw, None);
        if !report.valid {
            return CatalogOutcome::rejected(report);
        }

        let item = sanitize_menu_item(raw);
        let _guard = match self.locks.acquire_guard(&menu_key(&item.id), None) {
            Ok(guard) => guard,
            Err(conflict) => return CatalogOutcome::lock_conflict(&conflict),
        };

        if let Err(e) = self.write().add(item.clone()) {
            return CatalogOutcome::failed(&e.into());
        }

        info!(item_id = %item.id, "Menu item created");
        CatalogOutcome::accepted(item, report.warnings)
    }

    /// Replaces the item currently known as `original_id`. The raw payload
    /// may carry a new id, in which case the item is renamed.
    pub fn update_item(&self, original_id: &str, raw: &Value) -> CatalogOutcome {
        let report = self.validate(raw, Some(original_id));
        if !report.valid {
            return CatalogOutcome::rejected(report);
        }

        let item = sanitize_menu_item(raw);
        let _original = match self.locks.acquire_guard(&menu_key(original_id), None) {
            Ok(guard) => guard,
            Err(conflict) => return CatalogOutcome::lock_conflict(&conflict),
        };
        let _renamed = if item.id != original_id {
            match self.locks.acquire_guard(&menu_key(&item.id), None) {
                Ok(guard) => Some(guard),
                Err(conflict) => return CatalogOutcome::lock_conflict(&conflict),
            }
        } else {
            None
        };

        if let Err(e) = self.write().update(original_id, item.clone()) {
            return CatalogOutcome::failed(&e.into());
        }

        info!(original_id, item_id = %item.id, "Menu item updated");
        CatalogOutcome::accepted(item, report.warnings)
    }

    /// Removes an item.
    pub fn remove_item(&self, id: &str) -> EngineResult<MenuItem> {
        let _guard = self.locks.acquire_guard(&menu_key(id), None)?;
        let removed = self
            .write()
            .remove(id)
            .ok_or_else(|| EngineError::from(orderline_core::CoreError::MenuItemNotFound(id.to_string())))?;
        info!(item_id = id, "Menu item removed");
        Ok(removed)
    }

    /// Proposes a free identifier derived from `base`.
    pub fn suggest_id(&self, base: &str) -> String {
        self.read().generate_unique_id(base)
    }

    pub fn get(&self, id: &str) -> Option<MenuItem> {
        self.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn catalog() -> MenuCatalog {
        let catalog = MenuCatalog::new(Arc::new(LockManager::new()));
        catalog.load_existing_items(vec![
            MenuItem::new("item1", "Tea", 10.0),
            MenuItem::new("item2", "Bun", 5.0),
        ]);
        catalog
    }

    #[test]
    fn test_create_new_item() {
        let catalog = catalog();
        let outcome = catalog.create_item(&json!({ "id": "item3", "name": "Samosa", "price": 4 }));
        assert!(outcome.success);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get("item3").unwrap().price, 4.0);
        assert!(!catalog.locks.is_locked("menu:item3"));
    }

    #[test]
    fn test_create_duplicate_suggests_id() {
        let catalog = catalog();
        let outcome = catalog.create_item(&json!({ "id": "item1", "name": "Coffee", "price": 12 }));
        assert!(!outcome.success);
        assert_eq!(outcome.errors, vec!["id 'item1' already exists".to_string()]);
        assert_eq!(outcome.warnings, vec!["Suggested id: item1_1".to_string()]);
        assert_eq!(catalog.get("item1").unwrap().name, "Tea");
    }

    #[test]
    fn test_self_update_is_not_a_collision() {
        let catalog = catalog();
        let outcome =
            catalog.update_item("item1", &json!({ "id": "item1", "name": "Chai", "price": 11 }));
        assert!(outcome.success, "{:?}", outcome);
        assert_eq!(catalog.get("item1").unwrap().name, "Chai");
    }

    #[test]
    fn test_rename_through_update() {
        let catalog = catalog();
        let outcome =
            catalog.update_item("item1", &json!({ "id": "chai", "name": "Chai", "price": 11 }));
        assert!(outcome.success);
        assert!(catalog.get("item1").is_none());
        assert!(catalog.get("chai").is_some());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_rename_onto_other_item_is_rejected() {
        let catalog = catalog();
        let outcome =
            catalog.update_item("item1", &json!({ "id": "item2", "name": "Tea", "price": 10 }));
        assert!(!outcome.success);
        assert_eq!(outcome.warnings, vec!["Suggested id: item2_1".to_string()]);
    }

    #[test]
    fn test_update_unknown_item_fails() {
        let catalog = catalog();
        let outcome =
            catalog.update_item("ghost", &json!({ "id": "ghost", "name": "Ghost", "price": 1 }));
        assert_eq!(outcome.error.as_deref(), Some("Menu item not found: ghost"));
    }

    #[test]
    fn test_locked_item_reports_conflict() {
        let catalog = catalog();
        catalog.locks.acquire("menu:item1", None).unwrap();
        let outcome =
            catalog.update_item("item1", &json!({ "id": "item1", "name": "Chai", "price": 11 }));
        assert!(!outcome.success);
        assert!(outcome.lock_info.is_some());
        assert_eq!(catalog.get("item1").unwrap().name, "Tea");
    }

    #[test]
    fn test_remove_item() {
        let catalog = catalog();
        assert_eq!(catalog.remove_item("item2").unwrap().name, "Bun");
        assert!(catalog.remove_item("item2").is_err());
        assert_eq!(catalog.suggest_id("item1"), "item1_1");
    }

    #[test]
    fn test_concurrent_creators_of_same_id() {
        let catalog = catalog();
        let created = AtomicUsize::new(0);

        thread::scope(|s| {
            for n in 0..8 {
                let catalog = &catalog;
                let created = &created;
                s.spawn(move || {
                    let raw = json!({ "id": "special", "name": format!("Special {n}"), "price": 9 });
                    if catalog.create_item(&raw).success {
                        created.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(catalog.len(), 3);
    }
}
