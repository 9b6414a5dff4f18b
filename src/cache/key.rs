//! Cache key derivation.
//!
//! A key is the hex SHA-256 digest of (normalized document, operation name,
//! key-sorted variables, partition token). The digest is stable across
//! processes, so the same key space serves an in-memory or an external store.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Request;

/// Opaque identity of one cacheable execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an externally derived key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts a partition token from caller context.
///
/// Returning `None` places the caller in the shared partition.
pub type SessionFn<C> = Arc<dyn Fn(&C) -> Option<String> + Send + Sync>;

/// Derives [`CacheKey`]s for requests.
pub struct KeyResolver<C> {
    session: Option<SessionFn<C>>,
}

impl<C> KeyResolver<C> {
    /// Resolver with a single shared partition.
    pub fn new() -> Self {
        Self { session: None }
    }

    /// Resolver that partitions the key space by `session(context)`.
    pub fn with_session(session: SessionFn<C>) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Partition token for `context`, if a session function is configured.
    pub fn partition(&self, context: &C) -> Option<String> {
        self.session.as_ref().and_then(|session| session(context))
    }

    /// Derive the key for `request` issued under `context`.
    pub fn resolve(&self, request: &Request, context: &C) -> CacheKey {
        derive_key(request, self.partition(context).as_deref())
    }
}

impl<C> Default for KeyResolver<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for KeyResolver<C> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
        }
    }
}

/// Compute the cache key for a request in a given partition.
///
/// Each component is length-prefixed so that adjacent components cannot
/// bleed into one another; absent name/partition hash differently from empty.
pub fn derive_key(request: &Request, partition: Option<&str>) -> CacheKey {
    let mut hasher = Sha256::new();

    let document = normalize_document(&request.operation.document);
    update_component(&mut hasher, Some(&document));
    update_component(&mut hasher, request.operation.name.as_deref());

    let variables = sort_json_value(&serde_json::Value::Object(request.variables.clone()));
    // Serializing a `serde_json::Value` cannot fail.
    let variables = serde_json::to_string(&variables).unwrap_or_default();
    update_component(&mut hasher, Some(&variables));

    update_component(&mut hasher, partition);

    CacheKey(hex::encode(hasher.finalize()))
}

fn update_component(hasher: &mut Sha256, component: Option<&str>) {
    match component {
        Some(s) => {
            hasher.update([1u8]);
            hasher.update((s.len() as u64).to_be_bytes());
            hasher.update(s.as_bytes());
        }
        None => hasher.update([0u8]),
    }
}

/// Collapse runs of whitespace so formatting differences share a key.
fn normalize_document(document: &str) -> String {
    document.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Recursively sort object keys for order-independent serialization.
fn sort_json_value(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let sorted = entries
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_json_value(v)))
                .collect();
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(sort_json_value).collect())
        }
        other => other.clone(),
    }
}
