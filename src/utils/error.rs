//! Domain error types for the pipeline stages
//!
//! Each stage gets its own error enum so callers can tell "no content
//! found" apart from "network failed" apart from "misconfiguration".

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server asked us to slow down (429)
    #[error("Rate limited by server")]
    RateLimited,

    /// Server error with status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded")]
    MaxRetriesExceeded,

    /// Content decoding error
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// True when a retry with backoff has a chance of succeeding.
    ///
    /// Transient: timeouts, connection failures, and the throttling /
    /// 5xx status family (429, 500, 502, 503, 504).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::RateLimited => true,
            Self::ServerError(status) => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::MaxRetriesExceeded | Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors that can occur in the extraction chain
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Fetching the page failed
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// A strategy found text, but below the minimum-content threshold
    #[error("Extracted text too short: {len} < {min}")]
    Insufficient { len: usize, min: usize },

    /// A strategy found no usable content at all
    #[error("No content found")]
    NoContent,

    /// Every strategy in the chain failed or fell short
    #[error("All extraction strategies exhausted")]
    Exhausted,
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslateError {
    /// HTTP request error
    #[error("Translation request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Input was empty after trimming
    #[error("Nothing to translate")]
    EmptyInput,

    /// Service returned an empty translation
    #[error("Translation returned empty result")]
    EmptyResult,

    /// Service quota exhausted; fatal for this call, never retried
    #[error("Translation quota exceeded")]
    QuotaExceeded,

    /// Service asked us to slow down (429)
    #[error("Translation rate limited")]
    RateLimited,

    /// Service temporarily unavailable (503)
    #[error("Translation service unavailable")]
    ServiceUnavailable,

    /// Unexpected response shape
    #[error("Malformed translation response: {0}")]
    MalformedResponse(String),

    /// Maximum retry attempts exceeded
    #[error("Maximum translation attempts exceeded")]
    MaxRetriesExceeded,
}

impl TranslateError {
    /// True when the translator's own retry policy should try again
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited | Self::ServiceUnavailable => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::EmptyInput
            | Self::EmptyResult
            | Self::QuotaExceeded
            | Self::MalformedResponse(_)
            | Self::MaxRetriesExceeded => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_transient_statuses() {
        for status in [429, 500, 502, 503, 504] {
            assert!(FetchError::ServerError(status).is_transient());
        }
        for status in [400, 401, 403, 404, 410] {
            assert!(!FetchError::ServerError(status).is_transient());
        }
    }

    #[test]
    fn test_fetch_timeout_is_transient() {
        assert!(FetchError::Timeout.is_transient());
        assert!(!FetchError::Decode("bad bytes".to_string()).is_transient());
    }

    #[test]
    fn test_translate_quota_is_fatal() {
        assert!(!TranslateError::QuotaExceeded.is_transient());
        assert!(TranslateError::RateLimited.is_transient());
        assert!(TranslateError::ServiceUnavailable.is_transient());
    }
}
