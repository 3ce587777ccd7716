//! Reverse image search oracle.
//!
//! The oracle turns a publicly reachable image URL into a set of candidate
//! source matches. Ordering of the returned set is not trusted: the resolution
//! engine applies its own thresholds and extractor priorities.

mod error;
mod saucenao;

pub use error::SearchError;
pub use saucenao::{SauceNaoOracle, site_label_for_index};

use async_trait::async_trait;

use crate::extractor::SiteId;

/// A single candidate match reported by the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMatch {
    /// Confidence that the candidate shows the queried image (0–100).
    pub similarity: f64,
    /// Oracle site identifier.
    pub site_id: SiteId,
    /// Human-readable site label, e.g. `Yande.re`.
    pub site_label: String,
    /// Post URL on the candidate site.
    pub url: String,
    /// Author display name, when the oracle knows one.
    pub author: Option<String>,
}

impl CandidateMatch {
    /// Creates a candidate without author information.
    #[must_use]
    pub fn new(
        similarity: f64,
        site_id: SiteId,
        site_label: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            similarity,
            site_id,
            site_label: site_label.into(),
            url: url.into(),
            author: None,
        }
    }

    /// Attaches an author display name.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Trait implemented by reverse image search providers.
#[async_trait]
pub trait ReverseSearchOracle: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Searches for sources of the image at `public_url`.
    async fn search(&self, public_url: &str) -> Result<Vec<CandidateMatch>, SearchError>;
}
