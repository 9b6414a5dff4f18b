//! ResponseCache - wraps an executor with entity-aware result caching

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheKey, CacheStore, EntityExtractor, KeyResolver, TtlDecision, TtlPolicy};
use crate::telemetry;
use crate::types::{EntityKey, ExecutionResult, InvalidationTarget, OperationKind, Request};
use crate::{Executor, Result};

/// Extension member carrying cache metadata when enabled.
pub const EXTENSION_KEY: &str = "responseCache";

/// Decides per caller context whether the cache takes part at all.
pub type ContextPredicate<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

/// Final veto on storing an executed result.
pub type ResultPredicate = Arc<dyn Fn(&ExecutionResult) -> bool + Send + Sync>;

/// Why an executed read was returned without being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The executor reported errors.
    ExecutionErrors,
    /// The result touched an ignored type.
    IgnoredType,
    /// The resolved TTL was zero.
    TtlDisabled,
    /// The `should_cache_result` predicate refused it.
    Rejected,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::ExecutionErrors => "execution_errors",
            SkipReason::IgnoredType => "ignored_type",
            SkipReason::TtlDisabled => "ttl_disabled",
            SkipReason::Rejected => "rejected",
        }
    }
}

/// What the cache did for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from the store; the executor was not called.
    Hit,
    /// Executed and stored for `ttl`.
    Stored { ttl: Duration },
    /// Executed and returned uncached.
    Skipped(SkipReason),
    /// The store failed; the result is still valid.
    StoreFailed(String),
    /// A write purged `purged` entries referencing `entities`.
    Invalidated {
        entities: Vec<EntityKey>,
        purged: usize,
    },
    /// The cache did not take part (disabled, subscription, or write
    /// invalidation turned off).
    Bypassed,
}

/// A result together with the cache's handling of it.
#[derive(Debug, Clone)]
pub struct Executed {
    pub result: ExecutionResult,
    pub outcome: CacheOutcome,
}

/// Caching layer around an [`Executor`].
///
/// Reads are answered from the store when an equivalent execution (same
/// operation, variables and partition) is still fresh. Writes always execute
/// and then purge every entry that referenced an entity in their result.
/// Build one with [`Mimir::builder()`](crate::Mimir::builder).
pub struct ResponseCache<E: Executor> {
    pub(super) executor: E,
    pub(super) store: Arc<dyn CacheStore>,
    pub(super) keys: KeyResolver<E::Context>,
    pub(super) extractor: EntityExtractor,
    pub(super) ttl: TtlPolicy,
    pub(super) ignored_types: HashSet<String>,
    pub(super) enabled: Option<ContextPredicate<E::Context>>,
    pub(super) should_cache_result: Option<ResultPredicate>,
    pub(super) invalidate_via_mutation: bool,
    pub(super) include_extension_metadata: bool,
}

impl<E: Executor> ResponseCache<E> {
    /// The wrapped executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// The TTL policy in effect.
    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    /// Key a request would be cached under for `context`.
    pub fn cache_key(&self, request: &Request, context: &E::Context) -> CacheKey {
        self.keys.resolve(request, context)
    }

    /// Execute `request`, going through the cache where applicable.
    pub async fn execute(&self, request: &Request, context: &E::Context) -> ExecutionResult {
        self.execute_with_outcome(request, context).await.result
    }

    /// Execute `request` and report what the cache did.
    #[instrument(skip_all, fields(kind = request.kind().as_str()))]
    pub async fn execute_with_outcome(
        &self,
        request: &Request,
        context: &E::Context,
    ) -> Executed {
        if let Some(enabled) = &self.enabled
            && !enabled(context)
        {
            let result = self.run(request, context).await;
            return Executed {
                result,
                outcome: CacheOutcome::Bypassed,
            };
        }

        match request.kind() {
            OperationKind::Query => self.read(request, context).await,
            OperationKind::Mutation => self.write(request, context).await,
            OperationKind::Subscription => {
                let result = self.run(request, context).await;
                Executed {
                    result,
                    outcome: CacheOutcome::Bypassed,
                }
            }
        }
    }

    /// Purge every entry matching `targets`, independent of any execution.
    ///
    /// Returns the number of purged entries. Unlike the read and write paths,
    /// a store failure here is returned to the caller.
    #[instrument(skip_all, fields(targets = targets.len()))]
    pub async fn invalidate(&self, targets: &[InvalidationTarget]) -> Result<usize> {
        let purged = self.store.invalidate(targets).await.inspect_err(|e| {
            warn!(error = %e, "explicit invalidation failed");
            record_store_error("invalidate");
        })?;
        metrics::counter!(telemetry::INVALIDATED_ENTRIES_TOTAL, "source" => "explicit")
            .increment(purged as u64);
        debug!(purged, "explicit invalidation");
        Ok(purged)
    }

    async fn read(&self, request: &Request, context: &E::Context) -> Executed {
        let key = self.keys.resolve(request, context);

        match self.store.get(&key).await {
            Ok(Some(mut result)) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "kind" => "query").increment(1);
                debug!(key = %key, "response cache hit");
                if self.include_extension_metadata {
                    annotate(&mut result, json!({ "hit": true }));
                }
                return Executed {
                    result,
                    outcome: CacheOutcome::Hit,
                };
            }
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, executing uncached");
                record_store_error("get");
            }
        }

        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "kind" => "query").increment(1);
        debug!(key = %key, "response cache miss");

        let mut result = self.run(request, context).await;
        let outcome = self.store_result(&key, request, &result).await;

        if self.include_extension_metadata {
            let meta = match &outcome {
                CacheOutcome::Stored { ttl } => {
                    json!({ "hit": false, "didCache": true, "ttl": ttl.as_millis() as u64 })
                }
                _ => json!({ "hit": false, "didCache": false }),
            };
            annotate(&mut result, meta);
        }
        Executed { result, outcome }
    }

    async fn store_result(
        &self,
        key: &CacheKey,
        request: &Request,
        result: &ExecutionResult,
    ) -> CacheOutcome {
        if result.has_errors() {
            return skipped(key, SkipReason::ExecutionErrors);
        }
        if let Some(should_cache) = &self.should_cache_result
            && !should_cache(result)
        {
            return skipped(key, SkipReason::Rejected);
        }

        let deps = self
            .extractor
            .extract(&request.operation, result.data.as_ref());
        if deps.touches_any(self.ignored_types.iter()) {
            return skipped(key, SkipReason::IgnoredType);
        }

        let ttl = match self.ttl.resolve(&deps) {
            TtlDecision::Cache(ttl) => ttl,
            TtlDecision::Skip => return skipped(key, SkipReason::TtlDisabled),
        };

        match self.store.set(key, result, &deps, ttl).await {
            Ok(()) => {
                debug!(
                    key = %key,
                    ttl_ms = ttl.as_millis() as u64,
                    entities = deps.entities.len(),
                    "stored response"
                );
                CacheOutcome::Stored { ttl }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cache write failed, returning result uncached");
                record_store_error("set");
                CacheOutcome::StoreFailed(e.to_string())
            }
        }
    }

    async fn write(&self, request: &Request, context: &E::Context) -> Executed {
        let mut result = self.run(request, context).await;
        if !self.invalidate_via_mutation {
            return Executed {
                result,
                outcome: CacheOutcome::Bypassed,
            };
        }

        // Partial results still name the entities they touched.
        let deps = self
            .extractor
            .extract(&request.operation, result.data.as_ref());
        let mut entities: Vec<EntityKey> = deps.entities.into_iter().collect();
        entities.sort();

        let purged = if entities.is_empty() {
            0
        } else {
            let targets: Vec<InvalidationTarget> = entities.iter().map(Into::into).collect();
            match self.store.invalidate(&targets).await {
                Ok(purged) => purged,
                Err(e) => {
                    warn!(error = %e, entities = entities.len(), "invalidation after write failed");
                    record_store_error("invalidate");
                    return Executed {
                        result,
                        outcome: CacheOutcome::StoreFailed(e.to_string()),
                    };
                }
            }
        };
        metrics::counter!(telemetry::INVALIDATED_ENTRIES_TOTAL, "source" => "mutation")
            .increment(purged as u64);
        debug!(entities = entities.len(), purged, "write invalidated cached responses");

        if self.include_extension_metadata {
            let invalidated: Vec<InvalidationTarget> = entities.iter().map(Into::into).collect();
            annotate(&mut result, json!({ "invalidatedEntities": invalidated }));
        }
        Executed {
            result,
            outcome: CacheOutcome::Invalidated { entities, purged },
        }
    }

    async fn run(&self, request: &Request, context: &E::Context) -> ExecutionResult {
        let start = Instant::now();
        let result = self.executor.execute(request, context).await;
        metrics::histogram!(telemetry::EXECUTION_DURATION_SECONDS,
            "kind" => request.kind().as_str(),
        )
        .record(start.elapsed().as_secs_f64());
        result
    }
}

fn skipped(key: &CacheKey, reason: SkipReason) -> CacheOutcome {
    metrics::counter!(telemetry::CACHE_SKIPS_TOTAL, "reason" => reason.as_str()).increment(1);
    debug!(key = %key, reason = reason.as_str(), "response not cached");
    CacheOutcome::Skipped(reason)
}

fn record_store_error(op: &'static str) {
    metrics::counter!(telemetry::STORE_ERRORS_TOTAL, "op" => op).increment(1);
}

fn annotate(result: &mut ExecutionResult, meta: serde_json::Value) {
    result.extensions.insert(EXTENSION_KEY.to_string(), meta);
}
