//! Builder for configuring response cache instances

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::cached::{ContextPredicate, ResponseCache, ResultPredicate};
use crate::cache::extract::DEFAULT_ID_FIELD;
use crate::cache::store::DEFAULT_MAX_ENTRIES;
use crate::cache::ttl::DEFAULT_TTL;
use crate::cache::{CacheStore, EntityExtractor, InMemoryStore, KeyResolver, SessionFn, TtlPolicy};
use crate::config::CacheSettings;
use crate::{Executor, ExecutionResult, MimirError, Result};

/// Main entry point for creating response caches.
pub struct Mimir;

impl Mimir {
    /// Create a new builder for configuring the cache.
    ///
    /// `C` is the executor's caller-context type; it is usually inferred
    /// from [`MimirBuilder::build`] or from a session function.
    pub fn builder<C>() -> MimirBuilder<C> {
        MimirBuilder::new()
    }
}

/// Builder for configuring response caches.
pub struct MimirBuilder<C> {
    ttl: Duration,
    ttl_per_type: HashMap<String, Duration>,
    ttl_per_coordinate: HashMap<String, Duration>,
    ignored_types: HashSet<String>,
    id_fields: Vec<String>,
    session: Option<SessionFn<C>>,
    enabled: Option<ContextPredicate<C>>,
    should_cache_result: Option<ResultPredicate>,
    invalidate_via_mutation: bool,
    include_extension_metadata: bool,
    max_entries: u64,
    store: Option<Arc<dyn CacheStore>>,
}

impl<C> MimirBuilder<C> {
    pub fn new() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            ttl_per_type: HashMap::new(),
            ttl_per_coordinate: HashMap::new(),
            ignored_types: HashSet::new(),
            id_fields: vec![DEFAULT_ID_FIELD.to_string()],
            session: None,
            enabled: None,
            should_cache_result: None,
            invalidate_via_mutation: true,
            include_extension_metadata: false,
            max_entries: DEFAULT_MAX_ENTRIES,
            store: None,
        }
    }

    /// Set the global default time-to-live (default: 60s).
    ///
    /// `Duration::ZERO` disables caching for every result that no
    /// per-type or per-coordinate override matches.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Override the time-to-live of results touching `type_name`.
    ///
    /// When several touched types carry overrides, the shortest applies.
    pub fn ttl_per_type(mut self, type_name: impl Into<String>, ttl: Duration) -> Self {
        self.ttl_per_type.insert(type_name.into(), ttl);
        self
    }

    /// Override the time-to-live of results executing a root field, given
    /// as a schema coordinate such as `Query.users`. Takes priority over
    /// per-type overrides and the global default.
    pub fn ttl_per_schema_coordinate(
        mut self,
        coordinate: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        self.ttl_per_coordinate.insert(coordinate.into(), ttl);
        self
    }

    /// Never cache results that touch `type_name`.
    pub fn ignored_type(mut self, type_name: impl Into<String>) -> Self {
        self.ignored_types.insert(type_name.into());
        self
    }

    /// Never cache results that touch any of `types`.
    pub fn ignored_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Set the identifier fields consulted for entities, in order (default: `id`).
    pub fn id_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Partition cached results by a token derived from caller context.
    ///
    /// Callers mapping to `None` share one partition. Invalidation is not
    /// partitioned: purging an entity affects every partition.
    pub fn session<F>(mut self, session: F) -> Self
    where
        F: Fn(&C) -> Option<String> + Send + Sync + 'static,
    {
        self.session = Some(Arc::new(session));
        self
    }

    /// Decide per request whether the cache takes part at all.
    pub fn enabled<F>(mut self, enabled: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.enabled = Some(Arc::new(enabled));
        self
    }

    /// Add a final veto on storing results. Results with errors are never
    /// stored regardless of this predicate.
    pub fn should_cache_result<F>(mut self, should_cache: F) -> Self
    where
        F: Fn(&ExecutionResult) -> bool + Send + Sync + 'static,
    {
        self.should_cache_result = Some(Arc::new(should_cache));
        self
    }

    /// Whether write results purge the entities they return (default: true).
    pub fn invalidate_via_mutation(mut self, enabled: bool) -> Self {
        self.invalidate_via_mutation = enabled;
        self
    }

    /// Report cache handling under `extensions.responseCache` (default: false).
    pub fn include_extension_metadata(mut self, enabled: bool) -> Self {
        self.include_extension_metadata = enabled;
        self
    }

    /// Capacity of the default in-memory store (default: 10,000).
    pub fn max_entries(mut self, max: u64) -> Self {
        self.max_entries = max;
        self
    }

    /// Use a custom store instead of the default in-memory one.
    pub fn cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Apply file-based settings on top of the current configuration.
    pub fn settings(mut self, settings: &CacheSettings) -> Self {
        self.ttl = Duration::from_millis(settings.ttl_ms);
        self.max_entries = settings.max_entries;
        self.invalidate_via_mutation = settings.invalidate_via_mutation;
        self.include_extension_metadata = settings.include_extension_metadata;
        self.id_fields = settings.id_fields.clone();
        self.ignored_types
            .extend(settings.ignored_types.iter().cloned());
        for (type_name, ms) in &settings.ttl_per_type {
            self.ttl_per_type
                .insert(type_name.clone(), Duration::from_millis(*ms));
        }
        for (coordinate, ms) in &settings.ttl_per_schema_coordinate {
            self.ttl_per_coordinate
                .insert(coordinate.clone(), Duration::from_millis(*ms));
        }
        self
    }

    /// Wrap `executor` with the configured cache.
    pub fn build<E>(self, executor: E) -> Result<ResponseCache<E>>
    where
        E: Executor<Context = C>,
    {
        if self.id_fields.is_empty() {
            return Err(MimirError::Configuration(
                "at least one id field is required".to_string(),
            ));
        }

        for coordinate in self.ttl_per_coordinate.keys() {
            if !is_schema_coordinate(coordinate) {
                warn!(
                    %coordinate,
                    "TTL override is not a Type.field coordinate and will never match"
                );
            }
        }

        let store = match self.store {
            Some(store) => store,
            None => {
                if self.max_entries == 0 {
                    return Err(MimirError::Configuration(
                        "max_entries must be greater than zero".to_string(),
                    ));
                }
                Arc::new(InMemoryStore::with_max_entries(self.max_entries))
            }
        };

        let keys = match self.session {
            Some(session) => KeyResolver::with_session(session),
            None => KeyResolver::new(),
        };

        Ok(ResponseCache {
            executor,
            store,
            keys,
            extractor: EntityExtractor::with_id_fields(self.id_fields),
            ttl: TtlPolicy {
                default: self.ttl,
                per_type: self.ttl_per_type,
                per_coordinate: self.ttl_per_coordinate,
            },
            ignored_types: self.ignored_types,
            enabled: self.enabled,
            should_cache_result: self.should_cache_result,
            invalidate_via_mutation: self.invalidate_via_mutation,
            include_extension_metadata: self.include_extension_metadata,
        })
    }
}

impl<C> Default for MimirBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn is_schema_coordinate(coordinate: &str) -> bool {
    matches!(coordinate.split_once('.'), Some((ty, field)) if !ty.is_empty() && !field.is_empty())
}
