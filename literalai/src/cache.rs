//! Client-owned cache of recently fetched or sent entities.

use dashmap::DashMap;

use crate::entities::Entity;

/// Concurrent id-keyed entity cache. Last write wins.
#[derive(Debug, Default)]
pub struct SharedCache {
    entries: DashMap<String, Entity>,
}

impl SharedCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `entity` under `id`, replacing any previous entry.
    pub fn put(&self, id: impl Into<String>, entity: impl Into<Entity>) {
        self.entries.insert(id.into(), entity.into());
    }

    /// Gets a copy of the entry for `id`.
    pub fn get(&self, id: &str) -> Option<Entity> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Removes and returns the entry for `id`.
    pub fn remove(&self, id: &str) -> Option<Entity> {
        self.entries.remove(id).map(|(_, entity)| entity)
    }

    /// Clears all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
