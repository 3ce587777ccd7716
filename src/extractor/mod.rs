//! Site-specific metadata extractors.
//!
//! An extractor turns a candidate URL reported by the reverse-search oracle
//! into normalized catalog metadata (tags, source, rating). Extractors are
//! registered explicitly in a priority-ordered [`ExtractorRegistry`]; the
//! resolution engine consults it to pick the best qualifying candidate.
//!
//! # Architecture
//!
//! - [`Extractor`] - Async trait that individual site extractors implement
//! - [`ExtractorRegistry`] - Ordered collection keyed by oracle site id
//! - [`ExtractOutcome`] - `Found` metadata or `Absent`, never null
//! - [`DanbooruExtractor`] - Danbooru JSON API with category-prefixed tags
//! - [`GelbooruExtractor`] - Gelbooru DAPI
//! - [`MoebooruExtractor`] - Moebooru `post.json` API (Yande.re, Konachan)

mod danbooru;
mod error;
mod gelbooru;
mod moebooru;
mod registry;
mod utils;

pub use danbooru::DanbooruExtractor;
pub use error::ExtractorError;
pub use gelbooru::GelbooruExtractor;
pub use moebooru::MoebooruExtractor;
pub use registry::ExtractorRegistry;

use std::fmt;

use async_trait::async_trait;
use tracing::warn;

/// Oracle site identifier (SauceNAO index id).
pub type SiteId = u32;

/// Content rating understood by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rating {
    /// Safe for work.
    Safe,
    /// Questionable / sensitive.
    Questionable,
    /// Explicit.
    Explicit,
    /// No rating known; never written to the catalog.
    #[default]
    Unknown,
}

impl Rating {
    /// Returns the single-character catalog code (`s`, `q`, `e`, `?`).
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Safe => "s",
            Self::Questionable => "q",
            Self::Explicit => "e",
            Self::Unknown => "?",
        }
    }

    /// Parses a catalog code or common long-form label.
    ///
    /// Anything unrecognized maps to [`Rating::Unknown`].
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "s" | "safe" | "general" => Self::Safe,
            "q" | "questionable" | "sensitive" => Self::Questionable,
            "e" | "explicit" => Self::Explicit,
            _ => Self::Unknown,
        }
    }

    /// Returns true for every rating other than [`Rating::Unknown`].
    #[must_use]
    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Normalized metadata produced by an extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataResult {
    /// Catalog tags, already namespaced where the site distinguishes categories.
    pub tags: Vec<String>,
    /// Best known origin URL for the post.
    pub source: String,
    /// Content rating.
    pub rating: Rating,
}

/// Outcome of a single extractor call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// The site returned usable metadata.
    Found(MetadataResult),
    /// The site has nothing for this URL (deleted post, empty result).
    Absent,
}

/// Trait that all site extractors implement.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Box<dyn Extractor>` in the registry.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Oracle site identifier this extractor understands.
    fn site_id(&self) -> SiteId;

    /// Short lowercase name, also used for the `meta:<name>` tag.
    fn name(&self) -> &str;

    /// Declared priority; lower ranks win when several candidates qualify.
    fn priority_rank(&self) -> u32;

    /// Returns true if this extractor can read URLs on `host`.
    fn handles_host(&self, host: &str) -> bool;

    /// Fetches metadata for a post URL on this extractor's site.
    async fn fetch_metadata(&self, url: &str) -> Result<ExtractOutcome, ExtractorError>;
}

/// Optional per-site API credentials.
#[derive(Debug, Clone, Default)]
pub struct ExtractorCredentials {
    /// Danbooru login name.
    pub danbooru_login: Option<String>,
    /// Danbooru API key.
    pub danbooru_api_key: Option<String>,
    /// Gelbooru user id.
    pub gelbooru_user_id: Option<String>,
    /// Gelbooru API key.
    pub gelbooru_api_key: Option<String>,
}

/// Builds the registry of built-in extractors.
///
/// Extractors whose HTTP client cannot be built are skipped with a warning so
/// one broken site never disables the others.
#[must_use]
pub fn build_default_extractor_registry(credentials: &ExtractorCredentials) -> ExtractorRegistry {
    let mut registry = ExtractorRegistry::new();

    match DanbooruExtractor::new(
        credentials.danbooru_login.clone(),
        credentials.danbooru_api_key.clone(),
    ) {
        Ok(extractor) => registry.register(Box::new(extractor)),
        Err(error) => warn!(error = %error, "Danbooru extractor unavailable"),
    }

    match MoebooruExtractor::yandere() {
        Ok(extractor) => registry.register(Box::new(extractor)),
        Err(error) => warn!(error = %error, "Yande.re extractor unavailable"),
    }

    match GelbooruExtractor::new(
        credentials.gelbooru_user_id.clone(),
        credentials.gelbooru_api_key.clone(),
    ) {
        Ok(extractor) => registry.register(Box::new(extractor)),
        Err(error) => warn!(error = %error, "Gelbooru extractor unavailable"),
    }

    match MoebooruExtractor::konachan() {
        Ok(extractor) => registry.register(Box::new(extractor)),
        Err(error) => warn!(error = %error, "Konachan extractor unavailable"),
    }

    registry
}
