//! Adapter for external key-value backends.
//!
//! [`KvStore`] serializes results as JSON and hands them to a
//! [`KvBackend`] together with their TTL, leaving expiry to the backend (the
//! way a `SET ... PX` would). The invalidation index stays in process:
//! cross-process coherency is out of scope, so every process purges what it
//! registered itself. Registrations are tracked in a moka cache expiring on
//! the same TTL, so the index drops a key once its backend copy has expired.
//! Purging a key the backend no longer has is a successful no-op.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use super::extract::Dependencies;
use super::index::{Generation, InvalidationIndex};
use super::key::CacheKey;
use super::store::{CacheStore, Registered, keys_for_targets, mirrored_cache};
use crate::Result;
use crate::types::{ExecutionResult, InvalidationTarget};

/// Byte-oriented key-value backend with per-key expiry.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Fetch a value; `Ok(None)` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a value that expires after `ttl`.
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Delete a value. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Clone)]
struct Tracked {
    generation: Generation,
    ttl: Duration,
}

impl Registered for Tracked {
    fn generation(&self) -> Generation {
        self.generation
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// [`CacheStore`] over a [`KvBackend`].
pub struct KvStore<B> {
    backend: B,
    prefix: String,
    index: Arc<InvalidationIndex>,
    tracked: Cache<CacheKey, Tracked>,
}

impl<B: KvBackend> KvStore<B> {
    /// Wrap `backend`, namespacing keys under `mimir:`.
    pub fn new(backend: B) -> Self {
        Self::with_prefix(backend, "mimir:")
    }

    /// Wrap `backend`, namespacing keys under `prefix`.
    pub fn with_prefix(backend: B, prefix: impl Into<String>) -> Self {
        let index = Arc::new(InvalidationIndex::new());
        let tracked = mirrored_cache(&index, None);
        Self {
            backend,
            prefix: prefix.into(),
            index,
            tracked,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn index(&self) -> &InvalidationIndex {
        &self.index
    }

    /// Flush pending expiry of tracked registrations.
    pub async fn run_pending_tasks(&self) {
        self.tracked.run_pending_tasks().await;
    }

    fn backend_key(&self, key: &CacheKey) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl<B: KvBackend> CacheStore for KvStore<B> {
    async fn get(&self, key: &CacheKey) -> Result<Option<ExecutionResult>> {
        match self.backend.get(&self.backend_key(key)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        result: &ExecutionResult,
        deps: &Dependencies,
        ttl: Duration,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(result)?;
        self.backend.put(&self.backend_key(key), bytes, ttl).await?;
        let generation = self
            .index
            .insert(key.clone(), deps.entities.clone(), deps.types.clone());
        self.tracked
            .insert(key.clone(), Tracked { generation, ttl })
            .await;
        Ok(())
    }

    async fn invalidate(&self, targets: &[InvalidationTarget]) -> Result<usize> {
        let keys = keys_for_targets(&self.index, targets);
        for key in &keys {
            // Keys stay registered until their backend copy is deleted.
            self.backend.delete(&self.backend_key(key)).await?;
            self.index.remove(key);
            self.tracked.invalidate(key).await;
        }
        debug!(targets = targets.len(), count = keys.len(), "purged backend entries");
        Ok(keys.len())
    }
}
