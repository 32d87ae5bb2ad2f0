//! # Identity Index
//!
//! Uniqueness index over menu-item identifiers.
//!
//! ## Invariant
//! At any instant the index holds at most one [`MenuItem`] per id. Every
//! mutating operation either preserves that or returns an error and leaves
//! the index untouched.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load_existing_items   rebuild wholesale from the caller's store       │
//! │  add                   insert, refusing a taken id                     │
//! │  remove                drop by id                                      │
//! │  update(old, new)      in-place edit, or rename: old key removed       │
//! │                        before the new key is inserted                  │
//! │  generate_unique_id    base_1, base_2, ... first free suffix           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The index is a plain value. Callers that share it across threads wrap it
//! in a lock (see `orderline-engine`'s `MenuCatalog`).

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::types::MenuItem;

/// Known menu items keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    items: HashMap<String, MenuItem>,
}

impl IdentityIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole index with `items`.
    ///
    /// When the source contains the same id twice, the last one wins.
    pub fn load_existing_items<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = MenuItem>,
    {
        self.items = items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
    }

    /// Checks whether `id` may be used by the item being created or updated.
    ///
    /// `id` is free when nobody holds it, or when this is an update of the
    /// item that already owns it (`original_id == id`).
    pub fn check_identifier(
        &self,
        id: &str,
        is_update: bool,
        original_id: Option<&str>,
    ) -> CoreResult<()> {
        if !self.contains(id) {
            return Ok(());
        }
        if is_update && original_id == Some(id) {
            return Ok(());
        }
        Err(CoreError::DuplicateIdentifier {
            id: id.to_string(),
            suggested: self.generate_unique_id(id),
        })
    }

    /// Returns the first `{base}_{n}` (n = 1, 2, ...) not present in the index.
    ///
    /// ## Example
    /// ```rust
    /// use orderline_core::{IdentityIndex, MenuItem};
    ///
    /// let mut index = IdentityIndex::new();
    /// index.load_existing_items(vec![
    ///     MenuItem::new("tea", "Tea", 2.0),
    ///     MenuItem::new("tea_1", "Tea (large)", 3.0),
    /// ]);
    /// assert_eq!(index.generate_unique_id("tea"), "tea_2");
    /// ```
    pub fn generate_unique_id(&self, base: &str) -> String {
        let mut n = 1u64;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Inserts a new item.
    pub fn add(&mut self, item: MenuItem) -> CoreResult<()> {
        self.check_identifier(&item.id, false, None)?;
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    /// Removes an item, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<MenuItem> {
        self.items.remove(id)
    }

    /// Replaces the item known as `old_id` with `new_item`.
    ///
    /// When the id changes this is a rename: `old_id` disappears from the
    /// index and only `new_item.id` remains. Renaming onto an id owned by a
    /// different item is refused.
    ///
    /// ## Returns
    /// The item previously stored under `old_id`.
    pub fn update(&mut self, old_id: &str, new_item: MenuItem) -> CoreResult<MenuItem> {
        if !self.contains(old_id) {
            return Err(CoreError::MenuItemNotFound(old_id.to_string()));
        }
        self.check_identifier(&new_item.id, true, Some(old_id))?;

        let previous = self
            .items
            .remove(old_id)
            .ok_or_else(|| CoreError::MenuItemNotFound(old_id.to_string()))?;
        self.items.insert(new_item.id.clone(), new_item);
        Ok(previous)
    }

    /// Checks if an id is taken.
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Looks up an item by id.
    pub fn get(&self, id: &str) -> Option<&MenuItem> {
        self.items.get(id)
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> IdentityIndex {
        let mut index = IdentityIndex::new();
        index.load_existing_items(vec![
            MenuItem::new("item1", "Tea", 10.0),
            MenuItem::new("item2", "Bun", 5.0),
        ]);
        index
    }

    fn sorted_ids(index: &IdentityIndex) -> Vec<&str> {
        let mut ids: Vec<&str> = index.items.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_load_replaces_previous_contents() {
        let mut index = seeded();
        index.load_existing_items(vec![MenuItem::new("item9", "Soup", 7.0)]);
        assert_eq!(sorted_ids(&index), vec!["item9"]);
    }

    #[test]
    fn test_collision_unless_self_update() {
        let index = seeded();
        assert!(index.check_identifier("item3", false, None).is_ok());
        assert!(matches!(
            index.check_identifier("item1", false, None),
            Err(CoreError::DuplicateIdentifier { .. })
        ));
        assert!(index.check_identifier("item1", true, Some("item2")).is_err());
        assert!(index.check_identifier("item1", true, None).is_err());
        assert!(index.check_identifier("item1", true, Some("item1")).is_ok());
    }

    #[test]
    fn test_generated_id_is_fresh_and_deterministic() {
        let mut index = seeded();
        index.add(MenuItem::new("item1_1", "Tea (large)", 12.0)).unwrap();

        let first = index.generate_unique_id("item1");
        assert_eq!(first, "item1_2");
        assert!(!index.contains(&first));
        assert_eq!(index.generate_unique_id("item1"), first);
        assert_eq!(index.generate_unique_id("item2"), "item2_1");
    }

    #[test]
    fn test_add_refuses_duplicates() {
        let mut index = seeded();
        let err = index.add(MenuItem::new("item2", "Other bun", 6.0)).unwrap_err();
        assert_eq!(
            err,
            CoreError::DuplicateIdentifier {
                id: "item2".to_string(),
                suggested: "item2_1".to_string(),
            }
        );
        assert_eq!(index.get("item2").unwrap().name, "Bun");
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_update_in_place() {
        let mut index = seeded();
        let previous = index
            .update("item1", MenuItem::new("item1", "Green tea", 11.0))
            .unwrap();
        assert_eq!(previous.name, "Tea");
        assert_eq!(index.get("item1").unwrap().name, "Green tea");
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_rename_leaves_single_entry() {
        let mut index = seeded();
        index
            .update("item1", MenuItem::new("chai", "Chai", 10.0))
            .unwrap();
        assert!(!index.contains("item1"));
        assert!(index.contains("chai"));
        assert_eq!(sorted_ids(&index), vec!["chai", "item2"]);
    }

    #[test]
    fn test_rename_onto_taken_id_is_refused() {
        let mut index = seeded();
        let err = index
            .update("item1", MenuItem::new("item2", "Tea", 10.0))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateIdentifier { .. }));
        assert_eq!(sorted_ids(&index), vec!["item1", "item2"]);
    }

    #[test]
    fn test_update_unknown_item() {
        let mut index = seeded();
        assert_eq!(
            index.update("ghost", MenuItem::new("ghost", "Ghost", 1.0)),
            Err(CoreError::MenuItemNotFound("ghost".to_string()))
        );
    }

    #[test]
    fn test_remove() {
        let mut index = seeded();
        assert!(index.remove("item1").is_some());
        assert!(index.remove("item1").is_none());
        assert!(index.check_identifier("item1", false, None).is_ok());
    }
}
