//! Error types for image transfer.

use thiserror::Error;

use crate::http_client::ClientBuildError;

/// Errors that can occur while downloading, recompressing or rehosting an image.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Network-level failure.
    #[error("{stage} request for {url} failed: {source}")]
    Request {
        /// `download` or `upload`.
        stage: &'static str,
        /// Target URL.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Remote answered with a non-success HTTP status.
    #[error("{stage} of {url} returned HTTP {status}\n  Suggestion: {suggestion}")]
    HttpStatus {
        /// `download` or `upload`.
        stage: &'static str,
        /// Target URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// How to fix the issue.
        suggestion: &'static str,
    },

    /// Image could not be decoded or encoded.
    #[error("image recompression failed: {source}")]
    Image {
        /// Underlying codec error.
        #[source]
        source: image::ImageError,
    },

    /// WebP encoder rejected the decoded pixels.
    #[error("WebP encoding failed: {reason}")]
    Encode {
        /// Encoder status reported by libwebp.
        reason: String,
    },

    /// Recompression task panicked or was cancelled.
    #[error("image recompression task failed: {reason}")]
    Task {
        /// Join error description.
        reason: String,
    },

    /// Upload response did not carry a usable URL.
    #[error("unexpected upload response: {reason}")]
    MalformedResponse {
        /// What was wrong with the body.
        reason: String,
    },

    /// HTTP client could not be constructed.
    #[error(transparent)]
    ClientBuild(#[from] ClientBuildError),
}

impl TransferError {
    /// Creates an `HttpStatus` error with a stage-specific suggestion.
    #[must_use]
    pub fn http_status(stage: &'static str, url: &str, status: u16) -> Self {
        let suggestion = match (stage, status) {
            ("upload", 401 | 403) => "Check CHIBISAFE_API_KEY",
            ("upload", 413) => "File exceeds the upload limit. Try --compress",
            (_, 404) => "The file no longer exists at this URL",
            (_, s) if s >= 500 => "Server unavailable. Try again later",
            _ => "Check the URL and credentials",
        };
        Self::HttpStatus {
            stage,
            url: url.to_string(),
            status,
            suggestion,
        }
    }

    /// Creates a `MalformedResponse` error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }
}

impl From<image::ImageError> for TransferError {
    fn from(source: image::ImageError) -> Self {
        Self::Image { source }
    }
}
