//! Error types for catalog operations.

use thiserror::Error;

use crate::http_client::ClientBuildError;

/// Errors that can occur while talking to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The configured endpoint is not a usable base URL.
    #[error("invalid catalog endpoint '{endpoint}': {reason}\n  Suggestion: Set SHIMMIE_ENDPOINT to the site root, e.g. https://booru.example")]
    InvalidEndpoint {
        /// Configured endpoint.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Login was rejected or returned no session.
    #[error("catalog authentication failed for '{user}': {reason}\n  Suggestion: Check SHIMMIE_LOGIN and SHIMMIE_PASSWORD")]
    Authentication {
        /// Login name used.
        user: String,
        /// Reason reported by the catalog.
        reason: String,
    },

    /// Network-level failure.
    #[error("catalog {operation} request failed: {source}")]
    Request {
        /// Operation being performed.
        operation: &'static str,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Catalog answered with a non-success HTTP status.
    #[error("catalog {operation} returned HTTP {status}")]
    HttpStatus {
        /// Operation being performed.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
    },

    /// GraphQL `errors` array was non-empty.
    #[error("catalog {operation} failed: {}", .messages.join("; "))]
    GraphQl {
        /// Operation being performed.
        operation: &'static str,
        /// Error messages reported by the server.
        messages: Vec<String>,
    },

    /// Response body did not match the expected shape.
    #[error("unexpected catalog {operation} response: {reason}")]
    MalformedResponse {
        /// Operation being performed.
        operation: &'static str,
        /// What was wrong with the body.
        reason: String,
    },

    /// HTTP client could not be constructed.
    #[error(transparent)]
    ClientBuild(#[from] ClientBuildError),
}

impl CatalogError {
    /// Creates an `Authentication` error.
    #[must_use]
    pub fn authentication(user: &str, reason: impl Into<String>) -> Self {
        Self::Authentication {
            user: user.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `MalformedResponse` error.
    #[must_use]
    pub fn malformed(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            operation,
            reason: reason.into(),
        }
    }

    /// Returns true for authentication failures.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
