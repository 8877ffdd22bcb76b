//! Error types for the context engine

use thiserror::Error;

/// Main error type for context engine operations
#[derive(Error, Debug)]
pub enum ContextError {
    /// A dimension analyzer failed; the build is aborted and nothing is persisted
    #[error("Analyzer error ({dimension}): {message}")]
    Analyzer {
        dimension: &'static str,
        message: String,
    },

    /// Persistence layer failure on save/get/delete/query
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid or unloadable configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A change event payload could not be turned into an entity
    #[error("Failed to decode {entity_kind} payload: {message}")]
    Decode {
        entity_kind: String,
        message: String,
    },

    /// Repository record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Repository record already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No decoder registered for the entity kind
    #[error("Unknown entity kind: {0}")]
    UnknownEntityKind(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ContextError {
    /// Build an analyzer failure for the given dimension
    pub fn analyzer(dimension: &'static str, message: impl Into<String>) -> Self {
        Self::Analyzer {
            dimension,
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ContextError {
    fn from(err: config::ConfigError) -> Self {
        ContextError::Configuration(err.to_string())
    }
}

/// Result type alias for context engine operations
pub type Result<T> = std::result::Result<T, ContextError>;
