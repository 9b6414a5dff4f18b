//! Tests for [`ResponseCache`] against a mock executor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use mimir::cache::Dependencies;
use mimir::{
    CacheKey, CacheOutcome, CacheStore, EntityKey, ExecutionResult, Executor, GraphError,
    InvalidationTarget, Mimir, MimirError, Operation, Request, ResponseCache, Result, SkipReason,
    Value,
};

// ============================================================================
// Mock executor
// ============================================================================

/// Caller context: an optional session id.
type Session = Option<String>;

/// Serves a tiny user/comment/order graph and counts executions per root field.
#[derive(Default)]
struct Api {
    calls: Mutex<HashMap<String, usize>>,
}

impl Api {
    fn calls(&self, root_field: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(root_field)
            .copied()
            .unwrap_or(0)
    }
}

fn users_data(limit: usize) -> serde_json::Value {
    let users: Vec<_> = (1..=2)
        .map(|id| {
            json!({
                "__typename": "User",
                "id": id,
                "name": format!("User {id}"),
                "comments": [{
                    "__typename": "Comment",
                    "id": id,
                    "text": format!("Comment {id} of User {id}")
                }]
            })
        })
        .take(limit)
        .collect();
    json!({ "__typename": "Query", "users": users })
}

fn orders_data() -> serde_json::Value {
    json!({
        "__typename": "Query",
        "orders": [
            {
                "__typename": "Order",
                "id": 1,
                "products": [{ "__typename": "Product", "id": 1, "name": "Jeans" }]
            },
            {
                "__typename": "Order",
                "id": 2,
                "products": [{ "__typename": "Product", "id": 2, "name": "Shoes" }]
            }
        ]
    })
}

#[async_trait]
impl Executor for Api {
    type Context = Session;

    async fn execute(&self, request: &Request, _session: &Session) -> ExecutionResult {
        let root = request
            .operation
            .root_fields
            .first()
            .cloned()
            .unwrap_or_default();
        *self.calls.lock().unwrap().entry(root.clone()).or_default() += 1;

        match root.as_str() {
            "users" => {
                let limit = request
                    .variables
                    .get("limit")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(2) as usize;
                ExecutionResult::data(Value::from_json(users_data(limit)))
            }
            "orders" => ExecutionResult::data(Value::from_json(orders_data())),
            "updateUser" => {
                let id = request.variables.get("id").cloned().unwrap_or(json!(1));
                ExecutionResult::data(Value::from_json(json!({
                    "__typename": "Mutation",
                    "updateUser": { "__typename": "User", "id": id }
                })))
            }
            "updateUsers" => ExecutionResult::data(Value::from_json(json!({
                "__typename": "Mutation",
                "updateUsers": [{ "__typename": "User", "id": 1 }, null]
            })))
            .with_error(GraphError::new("second user not found").at(["updateUsers", "1"])),
            "ticker" => ExecutionResult::data(Value::from_json(json!({
                "__typename": "Subscription",
                "ticker": 1
            }))),
            _ => ExecutionResult::error(GraphError::new(format!("unknown field '{root}'"))),
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

fn users() -> Request {
    Request::new(
        Operation::query("query test { users { id name comments { id text } } }")
            .root_field("users"),
    )
}

fn users_limited(limit: u64) -> Request {
    Request::new(
        Operation::query(
            "query test($limit: Int!) { users(limit: $limit) { id name comments { id text } } }",
        )
        .root_field("users"),
    )
    .variable("limit", limit)
}

fn orders() -> Request {
    Request::new(
        Operation::query("query test { orders { id products { id name } } }").root_field("orders"),
    )
}

fn update_user(id: i64) -> Request {
    Request::new(
        Operation::mutation("mutation test($id: ID!) { updateUser(id: $id) { id } }")
            .root_field("updateUser"),
    )
    .variable("id", id)
}

const ANON: Session = None;

fn session(id: &str) -> Session {
    Some(id.to_string())
}

async fn run(cache: &ResponseCache<Api>, request: &Request) -> CacheOutcome {
    cache.execute_with_outcome(request, &ANON).await.outcome
}

// ============================================================================
// Read path
// ============================================================================

#[tokio::test]
async fn repeated_read_executes_once() {
    let cache = Mimir::builder().build(Api::default()).unwrap();

    let first = cache.execute(&users(), &ANON).await;
    let second = cache.execute(&users(), &ANON).await;
    let third = cache.execute(&users(), &ANON).await;

    assert_eq!(cache.executor().calls("users"), 1);
    assert_eq!(first, second);
    assert_eq!(second, third);
}

#[tokio::test]
async fn hit_returns_stored_value_unchanged() {
    let cache = Mimir::builder().build(Api::default()).unwrap();

    let miss = cache.execute_with_outcome(&users(), &ANON).await;
    let hit = cache.execute_with_outcome(&users(), &ANON).await;

    assert!(matches!(miss.outcome, CacheOutcome::Stored { .. }));
    assert_eq!(hit.outcome, CacheOutcome::Hit);
    assert_eq!(hit.result.to_json()["data"], users_data(2));
}

#[tokio::test]
async fn distinct_variables_are_distinct_entries() {
    let cache = Mimir::builder().build(Api::default()).unwrap();

    cache.execute(&users_limited(1), &ANON).await;
    cache.execute(&users_limited(2), &ANON).await;
    assert_eq!(cache.executor().calls("users"), 2);

    cache.execute(&users_limited(1), &ANON).await;
    cache.execute(&users_limited(2), &ANON).await;
    assert_eq!(cache.executor().calls("users"), 2);
}

#[tokio::test]
async fn errored_results_are_never_cached() {
    let cache = Mimir::builder().build(Api::default()).unwrap();
    let broken = Request::new(Operation::query("{ order { id } }").root_field("order"));

    let first = cache.execute_with_outcome(&broken, &ANON).await;
    let second = cache.execute_with_outcome(&broken, &ANON).await;

    assert_eq!(cache.executor().calls("order"), 2);
    assert_eq!(first.outcome, CacheOutcome::Skipped(SkipReason::ExecutionErrors));
    assert_eq!(first.result.errors[0].message, "unknown field 'order'");
    assert_eq!(second.result, first.result);
}

#[tokio::test]
async fn ignored_types_bypass_the_cache() {
    let cache = Mimir::builder()
        .ignored_type("Comment")
        .build(Api::default())
        .unwrap();

    assert_eq!(run(&cache, &users()).await, CacheOutcome::Skipped(SkipReason::IgnoredType));
    run(&cache, &users()).await;
    assert_eq!(cache.executor().calls("users"), 2);

    // Results without the ignored type still cache.
    run(&cache, &orders()).await;
    run(&cache, &orders()).await;
    assert_eq!(cache.executor().calls("orders"), 1);
}

#[tokio::test]
async fn should_cache_result_can_veto() {
    let cache = Mimir::builder()
        .should_cache_result(|result| {
            result
                .data
                .as_ref()
                .and_then(Value::as_object)
                .is_some_and(|root| root.get("orders").is_none())
        })
        .build(Api::default())
        .unwrap();

    assert_eq!(run(&cache, &orders()).await, CacheOutcome::Skipped(SkipReason::Rejected));
    run(&cache, &orders()).await;
    assert_eq!(cache.executor().calls("orders"), 2);

    run(&cache, &users()).await;
    run(&cache, &users()).await;
    assert_eq!(cache.executor().calls("users"), 1);
}

// ============================================================================
// Write path
// ============================================================================

#[tokio::test]
async fn write_purges_reads_referencing_its_entities() {
    let cache = Mimir::builder().build(Api::default()).unwrap();

    cache.execute(&users(), &ANON).await;
    cache.execute(&users(), &ANON).await;
    assert_eq!(cache.executor().calls("users"), 1);

    let outcome = run(&cache, &update_user(1)).await;
    assert_eq!(
        outcome,
        CacheOutcome::Invalidated {
            entities: vec![EntityKey::new("User", 1)],
            purged: 1
        }
    );

    cache.execute(&users(), &ANON).await;
    assert_eq!(cache.executor().calls("users"), 2);
}

#[tokio::test]
async fn write_on_unrelated_entity_keeps_cached_reads() {
    let cache = Mimir::builder().build(Api::default()).unwrap();

    cache.execute(&users(), &ANON).await;
    cache.execute(&update_user(99), &ANON).await;
    assert_eq!(run(&cache, &users()).await, CacheOutcome::Hit);
    assert_eq!(cache.executor().calls("users"), 1);
}

#[tokio::test]
async fn writes_are_never_served_from_cache() {
    let cache = Mimir::builder().build(Api::default()).unwrap();

    cache.execute(&update_user(1), &ANON).await;
    cache.execute(&update_user(1), &ANON).await;
    assert_eq!(cache.executor().calls("updateUser"), 2);
}

#[tokio::test]
async fn partial_write_still_purges_returned_entities() {
    let cache = Mimir::builder().build(Api::default()).unwrap();
    let partial = Request::new(
        Operation::mutation("mutation { updateUsers(ids: [1, 3]) { id } }")
            .root_field("updateUsers"),
    );

    cache.execute(&users(), &ANON).await;
    let executed = cache.execute_with_outcome(&partial, &ANON).await;

    assert_eq!(executed.result.errors.len(), 1);
    assert!(matches!(executed.outcome, CacheOutcome::Invalidated { purged: 1, .. }));
    cache.execute(&users(), &ANON).await;
    assert_eq!(cache.executor().calls("users"), 2);
}

#[tokio::test]
async fn write_invalidation_can_be_disabled() {
    let cache = Mimir::builder()
        .invalidate_via_mutation(false)
        .build(Api::default())
        .unwrap();

    cache.execute(&users(), &ANON).await;
    assert_eq!(run(&cache, &update_user(1)).await, CacheOutcome::Bypassed);
    assert_eq!(run(&cache, &users()).await, CacheOutcome::Hit);
}

#[tokio::test]
async fn subscriptions_pass_through() {
    let cache = Mimir::builder().build(Api::default()).unwrap();
    let ticker =
        Request::new(Operation::subscription("subscription { ticker }").root_field("ticker"));

    assert_eq!(run(&cache, &ticker).await, CacheOutcome::Bypassed);
    assert_eq!(run(&cache, &ticker).await, CacheOutcome::Bypassed);
    assert_eq!(cache.executor().calls("ticker"), 2);
}

// ============================================================================
// Explicit invalidation
// ============================================================================

#[tokio::test]
async fn invalidate_by_id_purges_only_that_entity() {
    let cache = Mimir::builder().build(Api::default()).unwrap();

    // limit 1 references Comment 1 only; limit 2 references Comments 1 and 2.
    cache.execute(&users_limited(1), &ANON).await;
    cache.execute(&users_limited(2), &ANON).await;
    assert_eq!(cache.executor().calls("users"), 2);

    let purged = cache
        .invalidate(&[InvalidationTarget::entity("Comment", 2)])
        .await
        .unwrap();
    assert_eq!(purged, 1);

    assert_eq!(run(&cache, &users_limited(1)).await, CacheOutcome::Hit);
    assert!(matches!(run(&cache, &users_limited(2)).await, CacheOutcome::Stored { .. }));
    assert_eq!(cache.executor().calls("users"), 3);
}

#[tokio::test]
async fn invalidate_by_type_purges_every_entity_of_that_type() {
    let cache = Mimir::builder().build(Api::default()).unwrap();

    cache.execute(&users_limited(1), &ANON).await;
    cache.execute(&users_limited(2), &ANON).await;
    cache.execute(&orders(), &ANON).await;

    let purged = cache
        .invalidate(&[InvalidationTarget::type_name("Comment")])
        .await
        .unwrap();
    assert_eq!(purged, 2);

    cache.execute(&users_limited(1), &ANON).await;
    cache.execute(&users_limited(2), &ANON).await;
    assert_eq!(cache.executor().calls("users"), 4);
    assert_eq!(run(&cache, &orders()).await, CacheOutcome::Hit);
}

#[tokio::test]
async fn invalidate_through_the_store_handle() {
    let store: Arc<dyn CacheStore> = Arc::new(mimir::InMemoryStore::new());
    let cache = Mimir::builder()
        .cache(Arc::clone(&store))
        .build(Api::default())
        .unwrap();

    cache.execute(&users(), &ANON).await;
    store
        .invalidate(&[InvalidationTarget::entity("Comment", 2)])
        .await
        .unwrap();

    cache.execute(&users(), &ANON).await;
    assert_eq!(cache.executor().calls("users"), 2);
}

#[tokio::test]
async fn invalidating_twice_is_idempotent() {
    let cache = Mimir::builder().build(Api::default()).unwrap();
    cache.execute(&users(), &ANON).await;

    let target = [InvalidationTarget::entity("User", 1)];
    assert_eq!(cache.invalidate(&target).await.unwrap(), 1);
    assert_eq!(cache.invalidate(&target).await.unwrap(), 0);
}

// ============================================================================
// TTL policy
// ============================================================================

#[tokio::test]
async fn entry_expires_after_ttl() {
    let cache = Mimir::builder()
        .ttl(Duration::from_millis(50))
        .build(Api::default())
        .unwrap();

    cache.execute(&users(), &ANON).await;
    cache.execute(&users(), &ANON).await;
    assert_eq!(cache.executor().calls("users"), 1);

    tokio::time::sleep(Duration::from_millis(120)).await;
    cache.execute(&users(), &ANON).await;
    assert_eq!(cache.executor().calls("users"), 2);
}

#[tokio::test]
async fn per_type_ttl_shortens_lifetime() {
    let cache = Mimir::builder()
        .ttl(Duration::from_secs(30))
        .ttl_per_type("User", Duration::from_millis(50))
        .build(Api::default())
        .unwrap();

    assert_eq!(
        run(&cache, &users()).await,
        CacheOutcome::Stored { ttl: Duration::from_millis(50) }
    );
    run(&cache, &users()).await;
    assert_eq!(cache.executor().calls("users"), 1);

    tokio::time::sleep(Duration::from_millis(120)).await;
    run(&cache, &users()).await;
    assert_eq!(cache.executor().calls("users"), 2);
}

#[tokio::test]
async fn per_coordinate_ttl_shortens_lifetime() {
    let cache = Mimir::builder()
        .ttl(Duration::from_secs(30))
        .ttl_per_schema_coordinate("Query.users", Duration::from_millis(50))
        .build(Api::default())
        .unwrap();

    run(&cache, &users()).await;
    run(&cache, &users()).await;
    assert_eq!(cache.executor().calls("users"), 1);

    tokio::time::sleep(Duration::from_millis(120)).await;
    run(&cache, &users()).await;
    assert_eq!(cache.executor().calls("users"), 2);
}

#[tokio::test]
async fn coordinate_override_outlives_short_global_ttl() {
    let cache = Mimir::builder()
        .ttl(Duration::from_millis(20))
        .ttl_per_schema_coordinate("Query.users", Duration::from_millis(400))
        .build(Api::default())
        .unwrap();

    run(&cache, &users()).await;
    run(&cache, &orders()).await;
    tokio::time::sleep(Duration::from_millis(80)).await;
    run(&cache, &users()).await;
    run(&cache, &orders()).await;
    assert_eq!(cache.executor().calls("users"), 1);
    assert_eq!(cache.executor().calls("orders"), 2);

    tokio::time::sleep(Duration::from_millis(450)).await;
    run(&cache, &users()).await;
    assert_eq!(cache.executor().calls("users"), 2);
}

#[tokio::test]
async fn zero_global_ttl_disables_caching() {
    let cache = Mimir::builder()
        .ttl(Duration::ZERO)
        .build(Api::default())
        .unwrap();

    assert_eq!(run(&cache, &users()).await, CacheOutcome::Skipped(SkipReason::TtlDisabled));
    run(&cache, &users()).await;
    assert_eq!(cache.executor().calls("users"), 2);
}

#[tokio::test]
async fn positive_override_caches_under_zero_global_ttl() {
    let cache = Mimir::builder()
        .ttl(Duration::ZERO)
        .ttl_per_schema_coordinate("Query.users", Duration::from_secs(30))
        .build(Api::default())
        .unwrap();

    run(&cache, &users()).await;
    run(&cache, &users()).await;
    run(&cache, &orders()).await;
    run(&cache, &orders()).await;
    assert_eq!(cache.executor().calls("users"), 1);
    assert_eq!(cache.executor().calls("orders"), 2);
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn sessions_partition_cached_reads() {
    let cache = Mimir::builder()
        .session(|session: &Session| session.clone())
        .build(Api::default())
        .unwrap();

    cache.execute(&users(), &session("1")).await;
    cache.execute(&users(), &session("1")).await;
    assert_eq!(cache.executor().calls("users"), 1);

    cache.execute(&users(), &session("2")).await;
    assert_eq!(cache.executor().calls("users"), 2);
    assert_ne!(
        cache.cache_key(&users(), &session("1")),
        cache.cache_key(&users(), &session("2"))
    );
}

#[tokio::test]
async fn invalidation_crosses_partitions() {
    let cache = Mimir::builder()
        .session(|session: &Session| session.clone())
        .build(Api::default())
        .unwrap();

    cache.execute(&users(), &session("1")).await;
    cache.execute(&users(), &session("2")).await;
    assert_eq!(cache.executor().calls("users"), 2);

    let outcome = cache
        .execute_with_outcome(&update_user(1), &session("1"))
        .await
        .outcome;
    assert!(matches!(outcome, CacheOutcome::Invalidated { purged: 2, .. }));

    cache.execute(&users(), &session("1")).await;
    cache.execute(&users(), &session("2")).await;
    assert_eq!(cache.executor().calls("users"), 4);
}

#[tokio::test]
async fn enabled_predicate_bypasses_cache() {
    let cache = Mimir::builder()
        .enabled(|session: &Session| session.as_deref() != Some("admin"))
        .build(Api::default())
        .unwrap();

    let outcome = cache
        .execute_with_outcome(&users(), &session("admin"))
        .await
        .outcome;
    assert_eq!(outcome, CacheOutcome::Bypassed);
    cache.execute(&users(), &session("admin")).await;
    assert_eq!(cache.executor().calls("users"), 2);

    cache.execute(&users(), &session("reader")).await;
    cache.execute(&users(), &session("reader")).await;
    assert_eq!(cache.executor().calls("users"), 3);
}

// ============================================================================
// Extension metadata
// ============================================================================

#[tokio::test]
async fn extension_metadata_reports_cache_handling() {
    let cache = Mimir::builder()
        .include_extension_metadata(true)
        .build(Api::default())
        .unwrap();

    let miss = cache.execute(&users(), &ANON).await;
    assert_eq!(
        miss.extensions[mimir::gateway::EXTENSION_KEY],
        json!({ "hit": false, "didCache": true, "ttl": 60_000 })
    );

    let hit = cache.execute(&users(), &ANON).await;
    assert_eq!(hit.extensions[mimir::gateway::EXTENSION_KEY], json!({ "hit": true }));

    let write = cache.execute(&update_user(1), &ANON).await;
    assert_eq!(
        write.extensions[mimir::gateway::EXTENSION_KEY],
        json!({ "invalidatedEntities": [{ "typename": "User", "id": "1" }] })
    );
}

#[tokio::test]
async fn extension_metadata_is_absent_by_default() {
    let cache = Mimir::builder().build(Api::default()).unwrap();
    let result = cache.execute(&users(), &ANON).await;
    assert!(result.extensions.is_empty());
}

// ============================================================================
// Store failures
// ============================================================================

/// A store whose backend is always unreachable.
struct UnreachableStore;

#[async_trait]
impl CacheStore for UnreachableStore {
    async fn get(&self, _key: &CacheKey) -> Result<Option<ExecutionResult>> {
        Err(MimirError::store("connection refused"))
    }

    async fn set(
        &self,
        _key: &CacheKey,
        _result: &ExecutionResult,
        _deps: &Dependencies,
        _ttl: Duration,
    ) -> Result<()> {
        Err(MimirError::store("connection refused"))
    }

    async fn invalidate(&self, _targets: &[InvalidationTarget]) -> Result<usize> {
        Err(MimirError::store("connection refused"))
    }
}

#[tokio::test]
async fn store_failures_do_not_fail_operations() {
    let cache = Mimir::builder()
        .cache(Arc::new(UnreachableStore))
        .build(Api::default())
        .unwrap();

    let read = cache.execute_with_outcome(&users(), &ANON).await;
    assert!(matches!(read.outcome, CacheOutcome::StoreFailed(_)));
    assert_eq!(read.result.to_json()["data"], users_data(2));
    cache.execute(&users(), &ANON).await;
    assert_eq!(cache.executor().calls("users"), 2);

    let write = cache.execute_with_outcome(&update_user(1), &ANON).await;
    assert!(matches!(write.outcome, CacheOutcome::StoreFailed(_)));
    assert!(write.result.errors.is_empty());
}

#[tokio::test]
async fn explicit_invalidation_reports_store_failure() {
    let cache = Mimir::builder()
        .cache(Arc::new(UnreachableStore))
        .build(Api::default())
        .unwrap();

    let err = cache
        .invalidate(&[InvalidationTarget::type_name("User")])
        .await
        .unwrap_err();
    assert!(matches!(err, MimirError::Store(_)));
}

// ============================================================================
// Builder validation and concurrency
// ============================================================================

#[test]
fn builder_rejects_empty_id_fields() {
    let result = Mimir::builder()
        .id_fields(Vec::<String>::new())
        .build(Api::default());
    assert!(matches!(result, Err(MimirError::Configuration(_))));
}

#[test]
fn builder_rejects_zero_capacity() {
    let result = Mimir::builder().max_entries(0).build(Api::default());
    assert!(matches!(result, Err(MimirError::Configuration(_))));
}

#[test]
fn misnamed_coordinate_is_not_fatal() {
    let result = Mimir::builder()
        .ttl_per_schema_coordinate("users", Duration::from_secs(1))
        .build(Api::default());
    assert!(result.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_misses_converge() {
    let cache = Arc::new(Mimir::builder().build(Api::default()).unwrap());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.execute(&users(), &ANON).await })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(cache.executor().calls("users") >= 1);

    assert_eq!(run(&cache, &users()).await, CacheOutcome::Hit);
}
