use thiserror::Error;

/// Result type alias for model and storage operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Error type for model, collection and storage operations.
///
/// Not-found is never an error: finders return `Ok(None)` or an empty
/// collection instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A storage handle was used before being configured.
    #[error("storage not configured: {0}")]
    Configuration(String),

    /// A field write or identifier was rejected.
    #[error("validation error: {0}")]
    Validation(String),

    /// A typed collection was handed an element of another model type.
    #[error("type mismatch: collection of {expected} cannot hold {found}")]
    TypeMismatch { expected: String, found: String },

    /// A collection index was outside the collection bounds.
    #[error("index {index} out of bounds for collection of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The attached backend does not implement the operation.
    #[error("{operation} is not implemented for {model}: no storage attached")]
    Unimplemented {
        operation: &'static str,
        model: String,
    },

    /// Query preparation or execution failed in the database driver.
    #[error("database error: {0}")]
    Database(String),

    /// Filesystem failure in the file backend.
    #[error("io error: {0}")]
    Io(String),

    /// Serialization/deserialization error.
    #[error("model serialization error: {0}")]
    Serde(String),

    /// A storage handle lock was poisoned.
    #[error("storage lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serde(err.to_string())
    }
}

#[cfg(feature = "database")]
impl From<rusqlite::Error> for ModelError {
    fn from(err: rusqlite::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}
