//! Errors that abandon a worker cycle.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::oracle::SearchError;
use crate::transfer::TransferError;

/// An operational failure inside one cycle.
///
/// Extractor failures never appear here; the engine absorbs them.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Catalog fetch, login or write failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Download, recompression or rehosting failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Reverse search failed.
    #[error(transparent)]
    Search(#[from] SearchError),
}

impl WorkerError {
    /// Returns true for failures that must stop the process immediately.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Catalog(error) if error.is_authentication())
    }

    /// Stage label for logs.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Catalog(_) => "catalog",
            Self::Transfer(_) => "transfer",
            Self::Search(_) => "search",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_is_fatal() {
        let err = WorkerError::from(CatalogError::authentication("bot", "denied"));
        assert!(err.is_fatal());
        assert_eq!(err.stage(), "catalog");
    }

    #[test]
    fn test_search_failure_is_not_fatal() {
        let err = WorkerError::from(SearchError::RateLimited);
        assert!(!err.is_fatal());
        assert_eq!(err.stage(), "search");
    }
}
