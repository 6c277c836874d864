//! Remembers which entity types contributed filters to a query shape.

use crate::query::QueryCacheKey;
use model::entity::EntityType;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Maps a query-shape key to the entity types whose filters were
/// consulted when the shape was first compiled. Entries only grow: a
/// type recorded once stays recorded, so later executions always gather
/// filters for every type the shape has ever touched.
#[derive(Default)]
pub struct FilterTypesCache {
    entries: Mutex<HashMap<QueryCacheKey, Vec<EntityType>>>,
}

impl FilterTypesCache {
    pub fn new() -> Self {
        FilterTypesCache::default()
    }

    pub fn is_cached(&self, key: &QueryCacheKey) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(key)
    }

    /// Appends `entity` to the type set of `key`, creating the set when
    /// absent. Recording the same type again is a no-op.
    pub fn add_type(&self, key: &QueryCacheKey, entity: EntityType) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let types = entries.entry(key.clone()).or_default();
        if !types.contains(&entity) {
            types.push(entity);
        }
    }

    /// Returns the recorded types for `key`, creating an empty entry
    /// when the key has never been seen. The created entry marks the
    /// shape as known even when no type carries filters.
    pub fn get_types(&self, key: &QueryCacheKey) -> Vec<EntityType> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key.clone()).or_default().clone()
    }
}
