//! Entity identity types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one addressable object in the data graph.
///
/// The identifier is kept in its string form so that an integer `1` and the
/// ID string `"1"` name the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub type_name: String,
    pub id: String,
}

impl EntityKey {
    pub fn new(type_name: impl Into<String>, id: impl ToString) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.to_string(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.id)
    }
}

/// An invalidation request: one entity, or every entity of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvalidationTarget {
    #[serde(rename = "typename")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl InvalidationTarget {
    /// Target a single entity.
    pub fn entity(type_name: impl Into<String>, id: impl ToString) -> Self {
        Self {
            type_name: type_name.into(),
            id: Some(id.to_string()),
        }
    }

    /// Target every cached result touching `type_name`.
    pub fn type_name(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
        }
    }
}

impl From<EntityKey> for InvalidationTarget {
    fn from(key: EntityKey) -> Self {
        Self {
            type_name: key.type_name,
            id: Some(key.id),
        }
    }
}

impl From<&EntityKey> for InvalidationTarget {
    fn from(key: &EntityKey) -> Self {
        key.clone().into()
    }
}
