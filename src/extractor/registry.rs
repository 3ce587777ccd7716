//! Extractor registry keyed by oracle site id.
//!
//! The [`ExtractorRegistry`] is an explicit, statically built list. Priority and
//! membership are decided at registration time, never by discovery.

use tracing::{debug, warn};
use url::Url;

use super::utils::canonical_host;
use super::{Extractor, SiteId};

/// An ordered collection of extractors, at most one per site id.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Registers an extractor.
    ///
    /// A second extractor for an already registered site id is ignored.
    #[tracing::instrument(skip(self, extractor), fields(extractor_name))]
    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        tracing::Span::current().record("extractor_name", extractor.name());
        if let Some(existing) = self.get(extractor.site_id()) {
            warn!(
                site_id = extractor.site_id(),
                existing = existing.name(),
                rejected = extractor.name(),
                "Site already has an extractor; ignoring duplicate registration"
            );
            return;
        }
        debug!(
            name = extractor.name(),
            site_id = extractor.site_id(),
            priority_rank = extractor.priority_rank(),
            "Registering extractor"
        );
        self.extractors.push(extractor);
    }

    /// Returns the number of registered extractors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Returns true if no extractors are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Returns the extractor registered for `site_id`.
    #[must_use]
    pub fn get(&self, site_id: SiteId) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.site_id() == site_id)
            .map(AsRef::as_ref)
    }

    /// Returns all extractors sorted by priority rank (stable on registration order).
    #[must_use]
    pub fn by_priority(&self) -> Vec<&dyn Extractor> {
        let mut ordered: Vec<&dyn Extractor> =
            self.extractors.iter().map(AsRef::as_ref).collect();
        ordered.sort_by_key(|e| e.priority_rank());
        ordered
    }

    /// Returns the highest-priority extractor that reads URLs on `url`'s host.
    #[must_use]
    pub fn find_for_url(&self, url: &str) -> Option<&dyn Extractor> {
        let parsed = Url::parse(url).ok()?;
        let host = canonical_host(parsed.host_str()?);
        self.by_priority()
            .into_iter()
            .find(|e| e.handles_host(&host))
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.extractors.iter().map(|e| e.name()).collect();
        f.debug_struct("ExtractorRegistry")
            .field("extractor_count", &self.extractors.len())
            .field("extractors", &names)
            .finish()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
