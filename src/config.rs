//! File-based cache configuration.
//!
//! Settings are read from TOML; every field is optional and durations are
//! given in milliseconds:
//!
//! ```toml
//! ttl_ms = 60000
//! max_entries = 10000
//! ignored_types = ["Session"]
//! id_fields = ["id", "uuid"]
//! invalidate_via_mutation = true
//! include_extension_metadata = false
//!
//! [ttl_per_type]
//! User = 500
//!
//! [ttl_per_schema_coordinate]
//! "Query.users" = 200
//! ```
//!
//! Apply with [`MimirBuilder::settings()`](crate::MimirBuilder::settings).
//! Types and coordinates are not checked against any schema; a name that
//! never occurs simply never matches.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::cache::extract::DEFAULT_ID_FIELD;
use crate::cache::store::DEFAULT_MAX_ENTRIES;
use crate::cache::ttl::DEFAULT_TTL;
use crate::{MimirError, Result};

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Global default TTL in milliseconds (default: 60000). `0` disables
    /// caching where no override applies.
    pub ttl_ms: u64,
    /// Capacity of the in-memory store (default: 10000).
    pub max_entries: u64,
    /// Per-type TTL overrides in milliseconds.
    pub ttl_per_type: HashMap<String, u64>,
    /// Per-coordinate TTL overrides in milliseconds.
    pub ttl_per_schema_coordinate: HashMap<String, u64>,
    /// Types whose presence prevents caching.
    pub ignored_types: Vec<String>,
    /// Identifier fields, consulted in order (default: `["id"]`).
    pub id_fields: Vec<String>,
    /// Whether write results purge their entities (default: true).
    pub invalidate_via_mutation: bool,
    /// Whether results carry `extensions.responseCache` (default: false).
    pub include_extension_metadata: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL.as_millis() as u64,
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl_per_type: HashMap::new(),
            ttl_per_schema_coordinate: HashMap::new(),
            ignored_types: Vec::new(),
            id_fields: vec![DEFAULT_ID_FIELD.to_string()],
            invalidate_via_mutation: true,
            include_extension_metadata: false,
        }
    }
}

impl CacheSettings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| MimirError::Configuration(format!("Failed to parse cache settings: {e}")))
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MimirError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            MimirError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }
}
