//! Error types for extractor operations.
//!
//! Extractor errors never stop an item: the resolution engine logs them and
//! demotes to the next candidate.

use thiserror::Error;

use crate::http_client::ClientBuildError;

/// Errors that can occur while fetching site metadata.
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// The candidate URL does not carry a post id this extractor understands.
    #[error("[{extractor}] cannot read post id from '{url}': {reason}")]
    InvalidUrl {
        /// Extractor name.
        extractor: String,
        /// Candidate URL.
        url: String,
        /// Why the URL was rejected.
        reason: String,
    },

    /// Network-level failure talking to the site API.
    #[error("[{extractor}] request to {url} failed: {source}")]
    Request {
        /// Extractor name.
        extractor: String,
        /// API URL requested.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The site API answered with a non-success status.
    #[error("[{extractor}] HTTP {status} from {url}")]
    HttpStatus {
        /// Extractor name.
        extractor: String,
        /// API URL requested.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The site API answered with a body that does not match its documented shape.
    #[error("[{extractor}] unexpected response from {url}: {reason}")]
    MalformedResponse {
        /// Extractor name.
        extractor: String,
        /// API URL requested.
        url: String,
        /// What was wrong with the body.
        reason: String,
    },

    /// HTTP client could not be constructed.
    #[error(transparent)]
    ClientBuild(#[from] ClientBuildError),
}

impl ExtractorError {
    /// Creates an `InvalidUrl` error.
    #[must_use]
    pub fn invalid_url(extractor: &str, url: &str, reason: &str) -> Self {
        Self::InvalidUrl {
            extractor: extractor.to_string(),
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Request` error.
    #[must_use]
    pub fn request(extractor: &str, url: &str, source: reqwest::Error) -> Self {
        Self::Request {
            extractor: extractor.to_string(),
            url: url.to_string(),
            source,
        }
    }

    /// Creates an `HttpStatus` error.
    #[must_use]
    pub fn http_status(extractor: &str, url: &str, status: u16) -> Self {
        Self::HttpStatus {
            extractor: extractor.to_string(),
            url: url.to_string(),
            status,
        }
    }

    /// Creates a `MalformedResponse` error.
    #[must_use]
    pub fn malformed(extractor: &str, url: &str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            extractor: extractor.to_string(),
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
