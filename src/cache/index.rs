//! Bidirectional entity ↔ cache entry index.
//!
//! Tracks which cache entries depend on which entities and types, so a
//! changed entity can be traced to every result that mentioned it. The
//! index only ever holds keys; entry values live in the store.
//!
//! Each registration carries a generation number. Store-driven cleanup
//! (expiry, capacity eviction) removes a key only while the registration it
//! observed is still current, so a re-registered key is never dropped by the
//! eviction of its predecessor.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::key::CacheKey;
use crate::types::EntityKey;

/// Generation number of one registration.
pub type Generation = u64;

#[derive(Debug)]
struct Registration {
    generation: Generation,
    entities: HashSet<EntityKey>,
    types: HashSet<String>,
}

#[derive(Debug, Default)]
struct IndexState {
    /// entity → entries that mention it
    by_entity: HashMap<EntityKey, HashSet<CacheKey>>,
    /// type name → entries that mention any object of that type
    by_type: HashMap<String, HashSet<CacheKey>>,
    /// entry → what it was registered with
    by_key: HashMap<CacheKey, Registration>,
    next_generation: Generation,
}

impl IndexState {
    fn unlink(&mut self, key: &CacheKey) -> Option<Registration> {
        let registration = self.by_key.remove(key)?;
        for entity in &registration.entities {
            if let Some(keys) = self.by_entity.get_mut(entity) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_entity.remove(entity);
                }
            }
        }
        for type_name in &registration.types {
            if let Some(keys) = self.by_type.get_mut(type_name) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_type.remove(type_name);
                }
            }
        }
        Some(registration)
    }
}

/// Reverse index from entities and types to cache entry keys.
///
/// All maps sit behind one lock, so the forward and reverse views never
/// disagree. Lookups take the read side and do not block each other.
#[derive(Debug, Default)]
pub struct InvalidationIndex {
    state: RwLock<IndexState>,
}

impl InvalidationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `key` as depending on `entities` and `types`.
    ///
    /// Re-inserting a key replaces its previous registration, dropping the
    /// stale reverse mappings first. Returns the new registration's generation.
    pub fn insert(
        &self,
        key: CacheKey,
        entities: HashSet<EntityKey>,
        types: HashSet<String>,
    ) -> Generation {
        let mut state = self.write();
        state.unlink(&key);

        state.next_generation += 1;
        let generation = state.next_generation;

        for entity in &entities {
            state
                .by_entity
                .entry(entity.clone())
                .or_default()
                .insert(key.clone());
        }
        for type_name in &types {
            state
                .by_type
                .entry(type_name.clone())
                .or_default()
                .insert(key.clone());
        }
        state.by_key.insert(
            key,
            Registration {
                generation,
                entities,
                types,
            },
        );
        generation
    }

    /// Remove every mapping for `key`. Returns whether the key was registered.
    pub fn remove(&self, key: &CacheKey) -> bool {
        self.write().unlink(key).is_some()
    }

    /// Remove `key` only if its current registration is `generation`.
    pub fn remove_generation(&self, key: &CacheKey, generation: Generation) -> bool {
        let mut state = self.write();
        let current = state
            .by_key
            .get(key)
            .is_some_and(|registration| registration.generation == generation);
        if current {
            state.unlink(key);
        }
        current
    }

    /// Generation of `key`'s current registration, if any.
    pub fn generation(&self, key: &CacheKey) -> Option<Generation> {
        self.read().by_key.get(key).map(|registration| registration.generation)
    }

    /// Entries that mention `entity`.
    pub fn lookup_by_entity(&self, entity: &EntityKey) -> HashSet<CacheKey> {
        self.read()
            .by_entity
            .get(entity)
            .cloned()
            .unwrap_or_default()
    }

    /// Entries that mention any object of `type_name`, identified or not.
    pub fn lookup_by_type(&self, type_name: &str) -> HashSet<CacheKey> {
        self.read()
            .by_type
            .get(type_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Entities `key` was registered with.
    pub fn entities_for_key(&self, key: &CacheKey) -> HashSet<EntityKey> {
        self.read()
            .by_key
            .get(key)
            .map(|r| r.entities.clone())
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.read().by_key.contains_key(key)
    }

    /// Clear all mappings.
    pub fn clear(&self) {
        let mut state = self.write();
        state.by_entity.clear();
        state.by_type.clear();
        state.by_key.clear();
    }

    /// Number of registered cache entries.
    pub fn key_count(&self) -> usize {
        self.read().by_key.len()
    }

    /// Number of entities referenced by at least one entry.
    pub fn entity_count(&self) -> usize {
        self.read().by_entity.len()
    }

    /// Number of types referenced by at least one entry.
    pub fn type_count(&self) -> usize {
        self.read().by_type.len()
    }
}
