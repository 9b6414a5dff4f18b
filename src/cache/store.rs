//! Pluggable cache stores.
//!
//! [`CacheStore`] is the capability the orchestrator needs: read an entry,
//! write an entry together with its dependencies, and purge entries by
//! entity or type. [`InMemoryStore`] is the default; [`KvStore`](super::kv::KvStore)
//! adapts any byte-oriented key-value backend.
//!
//! # In-memory store
//!
//! Entries live in a moka cache with a per-entry expiry taken from the
//! resolved TTL, bounded by `max_entries`. moka never returns an expired
//! entry, so expiry is enforced on read even before the entry is swept.
//! Removals driven by moka itself (expiry, capacity) are mirrored into the
//! [`InvalidationIndex`] through an eviction listener.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::future::join_all;
use moka::Expiry;
use moka::future::Cache;
use moka::notification::RemovalCause;
use tracing::debug;

use super::extract::Dependencies;
use super::index::{Generation, InvalidationIndex};
use super::key::CacheKey;
use crate::Result;
use crate::types::{EntityKey, ExecutionResult, InvalidationTarget};

/// Default maximum number of entries in the in-memory store.
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Storage capability used by the response cache.
///
/// Any type implementing these three calls can back the cache. Errors are
/// reported, never fatal: the orchestrator treats a failed read as a miss
/// and a failed write as "not cached".
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a live entry. `Ok(None)` is a miss.
    async fn get(&self, key: &CacheKey) -> Result<Option<ExecutionResult>>;

    /// Store `result` under `key` for `ttl`, recording what it depends on.
    async fn set(
        &self,
        key: &CacheKey,
        result: &ExecutionResult,
        deps: &Dependencies,
        ttl: Duration,
    ) -> Result<()>;

    /// Purge every entry matching any target. Returns how many were purged.
    ///
    /// A target with an id matches entries mentioning that entity; a target
    /// without one matches entries mentioning any object of its type.
    async fn invalidate(&self, targets: &[InvalidationTarget]) -> Result<usize>;
}

/// Resolve invalidation targets to the entry keys they cover.
pub(crate) fn keys_for_targets(
    index: &InvalidationIndex,
    targets: &[InvalidationTarget],
) -> HashSet<CacheKey> {
    let mut keys = HashSet::new();
    for target in targets {
        match &target.id {
            Some(id) => keys.extend(index.lookup_by_entity(&EntityKey {
                type_name: target.type_name.clone(),
                id: id.clone(),
            })),
            None => keys.extend(index.lookup_by_type(&target.type_name)),
        }
    }
    keys
}

/// A moka value that knows its own TTL and the index registration it backs.
pub(crate) trait Registered: Clone + Send + Sync + 'static {
    fn generation(&self) -> Generation;
    fn ttl(&self) -> Duration;
}

/// Expires each entry after its own resolved TTL.
pub(crate) struct EntryExpiry;

impl<V: Registered> Expiry<CacheKey, V> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &V,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl())
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &V,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl())
    }
}

/// Build a moka cache whose expiry and capacity removals are mirrored into `index`.
pub(crate) fn mirrored_cache<V: Registered>(
    index: &Arc<InvalidationIndex>,
    max_entries: Option<u64>,
) -> Cache<CacheKey, V> {
    let listener_index = Arc::clone(index);
    let builder = Cache::builder()
        .expire_after(EntryExpiry)
        .eviction_listener(move |key: Arc<CacheKey>, value: V, cause| {
            // A replacement's registration belongs to the new value.
            if !matches!(cause, RemovalCause::Replaced) {
                listener_index.remove_generation(&key, value.generation());
            }
        });
    match max_entries {
        Some(max) => builder.max_capacity(max).build(),
        None => builder.build(),
    }
}

#[derive(Clone)]
struct StoredEntry {
    generation: Generation,
    ttl: Duration,
    result: Arc<ExecutionResult>,
}

impl Registered for StoredEntry {
    fn generation(&self) -> Generation {
        self.generation
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Volatile in-process store (the default).
pub struct InMemoryStore {
    cache: Cache<CacheKey, StoredEntry>,
    index: Arc<InvalidationIndex>,
}

impl InMemoryStore {
    /// Create a store with the default capacity (10,000 entries).
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    /// Create a store holding at most `max` entries.
    pub fn with_max_entries(max: u64) -> Self {
        let index = Arc::new(InvalidationIndex::new());
        let cache = mirrored_cache(&index, Some(max));
        Self { cache, index }
    }

    /// The store's invalidation index.
    pub fn index(&self) -> &InvalidationIndex {
        &self.index
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Flush moka's pending maintenance (expiry sweeps, eviction listeners).
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Evict every entry and mapping.
    pub async fn clear(&self) {
        self.index.clear();
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<ExecutionResult>> {
        Ok(self
            .cache
            .get(key)
            .await
            .map(|entry| entry.result.as_ref().clone()))
    }

    async fn set(
        &self,
        key: &CacheKey,
        result: &ExecutionResult,
        deps: &Dependencies,
        ttl: Duration,
    ) -> Result<()> {
        let generation = self
            .index
            .insert(key.clone(), deps.entities.clone(), deps.types.clone());
        self.cache
            .insert(
                key.clone(),
                StoredEntry {
                    generation,
                    ttl,
                    result: Arc::new(result.clone()),
                },
            )
            .await;

        // A purge or a newer write may have taken the registration meanwhile.
        if self.index.generation(key) != Some(generation) {
            self.cache.invalidate(key).await;
        }
        Ok(())
    }

    async fn invalidate(&self, targets: &[InvalidationTarget]) -> Result<usize> {
        let keys = keys_for_targets(&self.index, targets);
        for key in &keys {
            self.index.remove(key);
        }
        join_all(keys.iter().map(|key| self.cache.invalidate(key))).await;
        debug!(targets = targets.len(), count = keys.len(), "purged cache entries");
        Ok(keys.len())
    }
}
