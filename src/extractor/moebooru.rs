//! Moebooru extractor - Yande.re and Konachan share the same `post.json` API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::http_client::build_http_client;

use super::utils::{host_matches_domain, is_numeric_id, last_path_segment, split_tags};
use super::{ExtractOutcome, Extractor, ExtractorError, MetadataResult, Rating, SiteId};

#[derive(Debug, Deserialize)]
struct MoebooruPost {
    #[serde(default)]
    tags: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    rating: Option<String>,
}

/// Extractor for Moebooru-based boards.
pub struct MoebooruExtractor {
    client: Client,
    name: &'static str,
    site_id: SiteId,
    domain: &'static str,
    base_url: String,
    public_url: &'static str,
}

impl MoebooruExtractor {
    /// Creates the Yande.re extractor (site 12).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError`] if HTTP client construction fails.
    pub fn yandere() -> Result<Self, ExtractorError> {
        Self::build("yandere", 12, "yande.re", "https://yande.re")
    }

    /// Creates the Konachan extractor (site 26).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError`] if HTTP client construction fails.
    pub fn konachan() -> Result<Self, ExtractorError> {
        Self::build("konachan", 26, "konachan.com", "https://konachan.com")
    }

    /// Overrides the API base URL (for testing with wiremock).
    ///
    /// The public post URL used as source fallback is unaffected.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build(
        name: &'static str,
        site_id: SiteId,
        domain: &'static str,
        public_url: &'static str,
    ) -> Result<Self, ExtractorError> {
        let client = build_http_client(name, None)?;
        Ok(Self {
            client,
            name,
            site_id,
            domain,
            base_url: public_url.to_string(),
            public_url,
        })
    }

    fn api_url(&self, post_id: &str, candidate: &str) -> Result<Url, ExtractorError> {
        let mut api_url = Url::parse(&format!("{}/post.json", self.base_url))
            .map_err(|e| ExtractorError::invalid_url(self.name, candidate, &e.to_string()))?;
        api_url
            .query_pairs_mut()
            .append_pair("tags", &format!("id:{post_id}"));
        Ok(api_url)
    }

    fn normalize_post(&self, post: MoebooruPost, post_id: &str) -> MetadataResult {
        let mut tags = split_tags(&post.tags, None);
        tags.push(format!("meta:{}", self.name));

        let source = post
            .source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{}/post/show/{post_id}", self.public_url));

        MetadataResult {
            tags,
            source,
            rating: post.rating.as_deref().map_or(Rating::Unknown, Rating::from_code),
        }
    }
}

impl std::fmt::Debug for MoebooruExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoebooruExtractor")
            .field("name", &self.name)
            .field("site_id", &self.site_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Extractor for MoebooruExtractor {
    fn site_id(&self) -> SiteId {
        self.site_id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn priority_rank(&self) -> u32 {
        self.site_id
    }

    fn handles_host(&self, host: &str) -> bool {
        host_matches_domain(host, self.domain)
    }

    #[tracing::instrument(skip(self), fields(extractor = self.name))]
    async fn fetch_metadata(&self, url: &str) -> Result<ExtractOutcome, ExtractorError> {
        let post_id = last_path_segment(url)
            .filter(|id| is_numeric_id(id))
            .ok_or_else(|| {
                ExtractorError::invalid_url(self.name, url, "no numeric post id in path")
            })?;
        let api_url = self.api_url(&post_id, url)?;

        debug!(post_id = %post_id, "Calling Moebooru API");

        let response = self
            .client
            .get(api_url.clone())
            .send()
            .await
            .map_err(|e| ExtractorError::request(self.name, api_url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractorError::http_status(
                self.name,
                api_url.as_str(),
                status.as_u16(),
            ));
        }

        let posts = response
            .json::<Vec<MoebooruPost>>()
            .await
            .map_err(|e| ExtractorError::malformed(self.name, api_url.as_str(), e.to_string()))?;

        let Some(post) = posts.into_iter().next() else {
            debug!(post_id = %post_id, "Moebooru returned no post");
            return Ok(ExtractOutcome::Absent);
        };

        Ok(ExtractOutcome::Found(self.normalize_post(post, &post_id)))
    }
}
