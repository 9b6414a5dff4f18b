//! Mimir - entity-aware response cache for query servers
//!
//! This crate wraps an opaque operation executor with a response cache.
//! Read results are cached per (operation, variables, caller partition);
//! every cached result is indexed by the entities it contains, so a write
//! returning an entity purges exactly the cached reads that mentioned it.
//! Cache identity and invalidation triggers are derived from the shape of
//! the type-annotated result tree; no per-type cache code is needed.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use async_trait::async_trait;
//! use mimir::{ExecutionResult, Executor, Mimir, Operation, Request, Value};
//!
//! struct Api;
//!
//! #[async_trait]
//! impl Executor for Api {
//!     type Context = ();
//!
//!     async fn execute(&self, _request: &Request, _ctx: &()) -> ExecutionResult {
//!         ExecutionResult::data(Value::from_json(serde_json::json!({
//!             "__typename": "Query",
//!             "users": [{ "__typename": "User", "id": 1, "name": "Ada" }]
//!         })))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> mimir::Result<()> {
//!     let cache = Mimir::builder()
//!         .ttl(Duration::from_secs(30))
//!         .ttl_per_schema_coordinate("Query.users", Duration::from_secs(5))
//!         .build(Api)?;
//!
//!     let users = Request::new(Operation::query("{ users { id name } }"));
//!     let first = cache.execute(&users, &()).await;
//!     let second = cache.execute(&users, &()).await; // served from cache
//!     assert_eq!(first, second);
//!
//!     cache
//!         .invalidate(&[mimir::InvalidationTarget::entity("User", 1)])
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheKey, CacheStore, InMemoryStore, KvBackend, KvStore};
pub use config::CacheSettings;
pub use error::{MimirError, Result};
pub use gateway::{CacheOutcome, Executed, Mimir, MimirBuilder, ResponseCache, SkipReason};
pub use traits::Executor;

// Re-export all types
pub use types::{
    EntityKey, ExecutionResult, GraphError, InvalidationTarget, Object, Operation, OperationKind,
    Request, Scalar, Value, Variables,
};
