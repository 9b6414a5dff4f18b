//! Freshness window resolution.
//!
//! Priority, highest first:
//!
//! 1. a per-coordinate override for any executed root coordinate (the
//!    shortest one when several root fields carry overrides);
//! 2. the shortest per-type override among touched types;
//! 3. the global default.
//!
//! A zero duration at the winning level means "do not cache". A zero global
//! default therefore disables caching only for results no override matches:
//! a positive override still caches its own scope.

use std::collections::HashMap;
use std::time::Duration;

use super::extract::Dependencies;

/// Default global time-to-live: one minute.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// What to do with an executed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlDecision {
    /// Store the result for this long.
    Cache(Duration),
    /// Return the result uncached.
    Skip,
}

impl TtlDecision {
    fn from_duration(ttl: Duration) -> Self {
        if ttl.is_zero() {
            TtlDecision::Skip
        } else {
            TtlDecision::Cache(ttl)
        }
    }
}

/// Time-to-live configuration, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    /// Applies when no override matches. Zero disables caching.
    pub default: Duration,
    /// Overrides keyed by type name.
    pub per_type: HashMap<String, Duration>,
    /// Overrides keyed by schema coordinate (`Query.users`).
    pub per_coordinate: HashMap<String, Duration>,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            default: DEFAULT_TTL,
            per_type: HashMap::new(),
            per_coordinate: HashMap::new(),
        }
    }
}

impl TtlPolicy {
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            ..Default::default()
        }
    }

    /// Add a per-type override.
    pub fn type_ttl(mut self, type_name: impl Into<String>, ttl: Duration) -> Self {
        self.per_type.insert(type_name.into(), ttl);
        self
    }

    /// Add a per-coordinate override.
    pub fn coordinate_ttl(mut self, coordinate: impl Into<String>, ttl: Duration) -> Self {
        self.per_coordinate.insert(coordinate.into(), ttl);
        self
    }

    /// Resolve the freshness window for a result with these dependencies.
    pub fn resolve(&self, deps: &Dependencies) -> TtlDecision {
        if let Some(ttl) = shortest_override(&self.per_coordinate, deps.coordinates.iter()) {
            return TtlDecision::from_duration(ttl);
        }
        if let Some(ttl) = shortest_override(&self.per_type, deps.types.iter()) {
            return TtlDecision::from_duration(ttl);
        }
        TtlDecision::from_duration(self.default)
    }
}

fn shortest_override<'a>(
    overrides: &HashMap<String, Duration>,
    touched: impl Iterator<Item = &'a String>,
) -> Option<Duration> {
    if overrides.is_empty() {
        return None;
    }
    touched.filter_map(|name| overrides.get(name).copied()).min()
}
