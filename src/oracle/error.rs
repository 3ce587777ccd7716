//! Error types for reverse search operations.

use thiserror::Error;

use crate::http_client::ClientBuildError;

/// Errors that can occur while querying the reverse search provider.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Network-level failure.
    #[error("reverse search request failed: {source}\n  Suggestion: Check your network connection")]
    Request {
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Provider quota exhausted.
    #[error("reverse search rate limit exceeded\n  Suggestion: Wait for the quota window to reset or raise --cooldown-secs")]
    RateLimited,

    /// Provider answered with a non-success HTTP status.
    #[error("reverse search returned HTTP {status}\n  Suggestion: {suggestion}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// How to fix the issue.
        suggestion: &'static str,
    },

    /// Provider reported an error inside a successful response.
    #[error("reverse search provider error (status {status}): {message}")]
    Provider {
        /// Provider status code.
        status: i64,
        /// Provider message.
        message: String,
    },

    /// Response body did not match the provider's documented shape.
    #[error("unexpected reverse search response: {reason}")]
    MalformedResponse {
        /// What was wrong with the body.
        reason: String,
    },

    /// HTTP client could not be constructed.
    #[error(transparent)]
    ClientBuild(#[from] ClientBuildError),
}

impl SearchError {
    /// Creates an `HttpStatus` error with a status-specific suggestion.
    #[must_use]
    pub fn http_status(status: u16) -> Self {
        let suggestion = match status {
            401 | 403 => "Check SAUCENAO_API_KEY",
            s if s >= 500 => "Provider unavailable. Try again later",
            _ => "Check the search request parameters",
        };
        Self::HttpStatus { status, suggestion }
    }

    /// Creates a `MalformedResponse` error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }
}
