//! Telemetry metric name constants.
//!
//! Centralised metric names for the response cache. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `mimir_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `kind`: operation kind: "query", "mutation" or "subscription"
//! - `reason`: why a result was not stored (see [`SkipReason`](crate::gateway::SkipReason))
//! - `op`: store call that failed: "get", "set" or "invalidate"
//! - `source`: what triggered a purge: "mutation" or "explicit"

/// Total reads answered from the cache.
///
/// Labels: `kind`.
pub const CACHE_HITS_TOTAL: &str = "mimir_cache_hits_total";

/// Total reads that fell through to the executor.
///
/// Labels: `kind`.
pub const CACHE_MISSES_TOTAL: &str = "mimir_cache_misses_total";

/// Total executed reads whose result was not stored.
///
/// Labels: `reason`.
pub const CACHE_SKIPS_TOTAL: &str = "mimir_cache_skips_total";

/// Total failed calls into the cache store.
///
/// Labels: `op`.
pub const STORE_ERRORS_TOTAL: &str = "mimir_store_errors_total";

/// Total cache entries purged by invalidation.
///
/// Labels: `source`.
pub const INVALIDATED_ENTRIES_TOTAL: &str = "mimir_invalidated_entries_total";

/// Duration of wrapped executor calls in seconds.
///
/// Labels: `kind`.
pub const EXECUTION_DURATION_SECONDS: &str = "mimir_execution_duration_seconds";
