//! Item persistence interface
//!
//! The core never owns storage. Hosts implement `ItemStore` over whatever
//! backs their data; `InMemoryItemStore` is the reference implementation and
//! can be snapshotted to JSON between runs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ResurfaceError;
use crate::types::StoredItem;

/// Keyed store of stored items
pub trait ItemStore {
    /// Owned snapshot of every item, in store order
    fn fetch_all(&self) -> Vec<StoredItem>;

    /// Insert an item, or replace the item with the same id
    fn upsert(&mut self, item: StoredItem);
}

/// Insertion-ordered in-memory store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryItemStore {
    items: Vec<StoredItem>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<&StoredItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Borrow the items without cloning
    pub fn items(&self) -> &[StoredItem] {
        &self.items
    }

    /// Load a store snapshot from JSON
    pub fn from_json(json: &str) -> Result<Self, ResurfaceError> {
        serde_json::from_str(json).map_err(|e| ResurfaceError::ParseError(e.to_string()))
    }

    /// Serialize the store to JSON
    pub fn to_json(&self) -> Result<String, ResurfaceError> {
        serde_json::to_string(self).map_err(|e| ResurfaceError::EncodingError(e.to_string()))
    }
}

impl ItemStore for InMemoryItemStore {
    fn fetch_all(&self) -> Vec<StoredItem> {
        self.items.clone()
    }

    fn upsert(&mut self, item: StoredItem) {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                tracing::trace!(item_id = %item.id, "replacing stored item");
                *existing = item;
            }
            None => {
                tracing::trace!(item_id = %item.id, "inserting stored item");
                self.items.push(item);
            }
        }
    }
}

impl From<Vec<StoredItem>> for InMemoryItemStore {
    fn from(items: Vec<StoredItem>) -> Self {
        let mut store = Self::new();
        for item in items {
            store.upsert(item);
        }
        store
    }
}
