//! Error handling module for fieldmap
//!
//! Provides the crate error type using thiserror. Step functions supplied by
//! callers report their own failures through `anyhow::Error`; those never
//! escape the engine directly; they become fallbacks and, at `Throw`
//! severity, one of the variants below.

use thiserror::Error;

/// Main error type for fieldmap
#[derive(Error, Debug)]
pub enum DeserializeError {
    /// A resolver's operator chain failed and severity was `Throw`
    #[error("{0}")]
    Unresolved(String),

    /// A resolver's validator failed and severity was `Throw`
    #[error("{0}")]
    Invalid(String),

    /// Caller-provided error type raised at `Throw` severity
    #[error("{0}")]
    Custom(Box<dyn std::error::Error + Send + Sync + 'static>),

    /// The target record could not hold a value at the given path
    #[error("Cannot assign to {path}: {reason}")]
    Assignment { path: String, reason: String },

    /// Invalid resolver or mapping configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors (mapping files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for fieldmap operations
pub type Result<T> = std::result::Result<T, DeserializeError>;

impl DeserializeError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an assignment error
    pub fn assignment(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Assignment {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for the errors raised by the reporter at `Throw` severity.
    pub fn is_reported(&self) -> bool {
        matches!(self, Self::Unresolved(_) | Self::Invalid(_) | Self::Custom(_))
    }

    /// Borrow a caller-provided error raised through an `ErrorType`.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Custom(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}
