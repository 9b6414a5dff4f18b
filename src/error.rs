//! Mimir error types

/// Mimir error types
///
/// Execution errors reported by the wrapped executor are not represented
/// here: they travel inside [`ExecutionResult::errors`](crate::ExecutionResult)
/// and reach the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum MimirError {
    // Store backend errors
    /// A cache backend could not serve a read, write or purge.
    #[error("store error: {0}")]
    Store(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MimirError {
    /// Shorthand for a backend failure.
    pub fn store(msg: impl Into<String>) -> Self {
        MimirError::Store(msg.into())
    }
}

/// Result type alias for Mimir operations
pub type Result<T> = std::result::Result<T, MimirError>;
