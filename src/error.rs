//! Unified error handling for the kaatru crate
//!
//! Domain-specific errors live in [`crate::utils::error`]; this module
//! consolidates them into a single [`Error`] enum for use across module
//! boundaries, with a classification of errors into categories and a
//! recoverable/fatal split that drives retry decisions.

use std::io;
use thiserror::Error;

pub use crate::utils::error::{ExtractError, FetchError, TranslateError};

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Content extraction errors
    Extraction,
    /// Translation service errors
    Translation,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the kaatru crate
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Extraction chain errors
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),

    /// Translation errors
    #[error("Translate error: {0}")]
    Translate(#[from] TranslateError),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors; the only kind the pipeline's top-level run
    /// surfaces to its caller
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Check if this error is recoverable (worth retrying)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_transient(),
            Self::Extract(e) => match e {
                ExtractError::Fetch(fe) => fe.is_transient(),
                // Thin content is a fallthrough signal, not a retry case
                ExtractError::Insufficient { .. }
                | ExtractError::NoContent
                | ExtractError::Exhausted => false,
            },
            Self::Translate(e) => e.is_transient(),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Io(_) => true,
            Self::Json(_) | Self::Config(_) | Self::Other { .. } => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(_) | Self::Http(_) | Self::Io(_) => ErrorCategory::Network,
            Self::Extract(ExtractError::Fetch(_)) => ErrorCategory::Network,
            Self::Extract(_) | Self::Json(_) => ErrorCategory::Extraction,
            Self::Translate(_) => ErrorCategory::Translation,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let fetch_err = Error::Fetch(FetchError::Timeout);
        assert_eq!(fetch_err.category(), ErrorCategory::Network);

        let extract_err = Error::Extract(ExtractError::Exhausted);
        assert_eq!(extract_err.category(), ErrorCategory::Extraction);

        let translate_err = Error::Translate(TranslateError::QuotaExceeded);
        assert_eq!(translate_err.category(), ErrorCategory::Translation);
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::Fetch(FetchError::Timeout).is_recoverable());
        assert!(!Error::Extract(ExtractError::Exhausted).is_recoverable());
        assert!(!Error::Translate(TranslateError::QuotaExceeded).is_recoverable());
        assert!(Error::Translate(TranslateError::RateLimited).is_recoverable());
        assert!(!Error::config("missing target language").is_recoverable());
    }

    #[test]
    fn test_insufficient_is_not_a_retry_case() {
        let err = Error::Extract(ExtractError::Insufficient { len: 50, min: 100 });
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("Invalid rate limit");
        assert_eq!(err.category(), ErrorCategory::Config);
    }
}
