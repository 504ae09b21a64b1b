//! Error types for emoserve

/// Result type alias using emoserve's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for emoserve operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Model loading or inference errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Request input rejected by the input policy
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Prediction requested before the model finished loading
    #[error("model '{0}' is not ready")]
    NotReady(String),

    /// Initialization requested on a model that is already loaded
    #[error("model '{0}' is already loaded")]
    AlreadyLoaded(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
