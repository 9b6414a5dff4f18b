//! Caching subsystem.
//!
//! The engine behind [`ResponseCache`](crate::ResponseCache), split by concern:
//!
//! - [`key`]: derives a stable [`CacheKey`] from operation, variables and
//!   caller partition.
//! - [`extract`]: walks a result tree and reports the entities, types and
//!   root coordinates it depends on.
//! - [`ttl`]: resolves a freshness window from those dependencies.
//! - [`index`]: the entity ↔ entry reverse index that makes invalidation
//!   precise.
//! - [`store`]: the [`CacheStore`] capability and the default
//!   [`InMemoryStore`]; [`kv`] adapts external key-value backends.

pub mod extract;
pub mod index;
pub mod key;
pub mod kv;
pub mod store;
pub mod ttl;

pub use extract::{Dependencies, EntityExtractor};
pub use index::InvalidationIndex;
pub use key::{CacheKey, KeyResolver, SessionFn};
pub use kv::{KvBackend, KvStore};
pub use store::{CacheStore, InMemoryStore};
pub use ttl::{TtlDecision, TtlPolicy};
