//! Entity extraction from executed results.
//!
//! Walks a type-annotated result tree and reports what the result depends on:
//! the identified entities it contains, every object type it touches, and the
//! root schema coordinates (`Query.users`) the operation executed. These
//! drive TTL resolution, the ignored-types check and invalidation.

use std::collections::HashSet;

use crate::types::{EntityKey, Operation, Scalar, Value};

/// Identifier field consulted when none are configured.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Everything a result depends on, as seen by the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// Objects with a resolvable identifier.
    pub entities: HashSet<EntityKey>,
    /// Type names of every non-root object, identified or not.
    pub types: HashSet<String>,
    /// Root schema coordinates, e.g. `Query.users`.
    pub coordinates: HashSet<String>,
}

impl Dependencies {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.types.is_empty() && self.coordinates.is_empty()
    }

    /// Whether any touched type is in `types`.
    pub fn touches_any<'a>(&self, mut types: impl Iterator<Item = &'a String>) -> bool {
        types.any(|t| self.types.contains(t))
    }
}

/// Derives [`Dependencies`] from results.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    id_fields: Vec<String>,
}

impl EntityExtractor {
    /// Extractor that identifies objects by their `id` field.
    pub fn new() -> Self {
        Self {
            id_fields: vec![DEFAULT_ID_FIELD.to_string()],
        }
    }

    /// Extractor consulting `id_fields` in order; the first non-null scalar wins.
    pub fn with_id_fields<I, S>(id_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id_fields: id_fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn id_fields(&self) -> &[String] {
        &self.id_fields
    }

    /// Extract the dependencies of `data`, the root value of a result of `operation`.
    pub fn extract(&self, operation: &Operation, data: Option<&Value>) -> Dependencies {
        let mut deps = Dependencies::default();
        let Some(Value::Object(root)) = data else {
            return deps;
        };

        let root_type = root
            .type_name
            .as_deref()
            .unwrap_or_else(|| operation.kind.root_type());
        if operation.root_fields.is_empty() {
            deps.coordinates
                .extend(root.fields.keys().map(|f| format!("{root_type}.{f}")));
        } else {
            deps.coordinates.extend(
                operation
                    .root_fields
                    .iter()
                    .map(|f| format!("{root_type}.{f}")),
            );
        }

        // Explicit stack: result depth is bounded only by the executor.
        let mut pending: Vec<&Value> = root.fields.values().collect();
        while let Some(node) = pending.pop() {
            match node {
                Value::Null | Value::Scalar(_) => {}
                Value::List(items) => pending.extend(items.iter()),
                Value::Object(obj) => {
                    if let Some(type_name) = &obj.type_name {
                        deps.types.insert(type_name.clone());
                        if let Some(id) = self.identify(obj) {
                            deps.entities.insert(EntityKey {
                                type_name: type_name.clone(),
                                id,
                            });
                        }
                    }
                    pending.extend(obj.fields.values());
                }
            }
        }

        deps
    }

    fn identify(&self, obj: &crate::types::Object) -> Option<String> {
        self.id_fields.iter().find_map(|field| match obj.get(field) {
            Some(Value::Scalar(Scalar::String(s))) => Some(s.clone()),
            Some(Value::Scalar(scalar)) => Some(scalar.to_string()),
            _ => None,
        })
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}
