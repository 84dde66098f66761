//! Base registry trait and implementation.
//!
//! Provides the id-keyed storage used by `BrickRegistry` and by the
//! messenger's per-context method registry.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

use pixiebrix_protocols::error::RegistryError;

/// Trait for items that can be stored in a registry.
pub trait Registerable: Send + Sync {
    /// Returns the unique identifier for this item.
    fn registry_id(&self) -> &str;
}

/// Generic registry for managing items by ID.
///
/// Registration is check-and-insert under the entry lock, so two concurrent
/// registrations of the same id cannot both succeed.
pub struct BaseRegistry<T: ?Sized + Registerable> {
    items: DashMap<String, Arc<T>>,
}

impl<T: ?Sized + Registerable> BaseRegistry<T> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
        }
    }

    /// Register an item.
    ///
    /// Returns an error if an item with the same ID is already registered;
    /// the existing item stays in place.
    pub fn register(&self, item: Arc<T>) -> Result<(), RegistryError> {
        match self.items.entry(item.registry_id().to_string()) {
            Entry::Occupied(entry) => Err(RegistryError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(item);
                Ok(())
            }
        }
    }

    /// Insert or replace an item, returning the previous one.
    pub fn upsert(&self, item: Arc<T>) -> Option<Arc<T>> {
        self.items.insert(item.registry_id().to_string(), item)
    }

    /// Remove an item by ID.
    pub fn unregister(&self, id: &str) -> Result<Arc<T>, RegistryError> {
        self.items
            .remove(id)
            .map(|(_, item)| item)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Get an item by ID.
    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.items.get(id).map(|item| item.clone())
    }

    /// Check if an item with the given ID is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// List all registered item IDs, sorted.
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.items.iter().map(|item| item.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over all items.
    pub fn iter(&self) -> impl Iterator<Item = Arc<T>> + '_ {
        self.items.iter().map(|entry| entry.value().clone())
    }
}

impl<T: ?Sized + Registerable> Default for BaseRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "base_tests.rs"]
mod tests;
