//! Gelbooru extractor - reads post metadata from the Gelbooru DAPI.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::http_client::build_http_client;

use super::utils::{host_matches_domain, is_numeric_id, query_param, split_tags, valid_http_url};
use super::{ExtractOutcome, Extractor, ExtractorError, MetadataResult, Rating, SiteId};

const NAME: &str = "gelbooru";
const SITE_ID: SiteId = 25;
const DEFAULT_BASE_URL: &str = "https://gelbooru.com";
const PUBLIC_POST_URL: &str = "https://gelbooru.com/index.php?page=post&s=view&id=";
const DOMAIN: &str = "gelbooru.com";

/// DAPI omits `post` entirely when nothing matches.
#[derive(Debug, Deserialize)]
struct GelbooruResponse {
    #[serde(default)]
    post: Vec<GelbooruPost>,
}

#[derive(Debug, Deserialize)]
struct GelbooruPost {
    #[serde(default)]
    tags: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    rating: Option<String>,
}

/// Extractor for `gelbooru.com` posts.
pub struct GelbooruExtractor {
    client: Client,
    base_url: String,
    user_id: Option<String>,
    api_key: Option<String>,
}

impl GelbooruExtractor {
    /// Creates an extractor against the public Gelbooru API.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError`] if HTTP client construction fails.
    pub fn new(user_id: Option<String>, api_key: Option<String>) -> Result<Self, ExtractorError> {
        Self::with_base_url(DEFAULT_BASE_URL, user_id, api_key)
    }

    /// Creates an extractor with a custom API base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError`] if HTTP client construction fails.
    pub fn with_base_url(
        base_url: impl Into<String>,
        user_id: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, ExtractorError> {
        let client = build_http_client(NAME, None)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: user_id.filter(|v| !v.trim().is_empty()),
            api_key: api_key.filter(|v| !v.trim().is_empty()),
        })
    }

    fn api_url(&self, post_id: &str, candidate: &str) -> Result<Url, ExtractorError> {
        let mut api_url = Url::parse(&format!("{}/index.php", self.base_url))
            .map_err(|e| ExtractorError::invalid_url(NAME, candidate, &e.to_string()))?;
        {
            let mut query = api_url.query_pairs_mut();
            query
                .append_pair("page", "dapi")
                .append_pair("s", "post")
                .append_pair("q", "index")
                .append_pair("json", "1")
                .append_pair("id", post_id);
            if let (Some(user_id), Some(key)) = (&self.user_id, &self.api_key) {
                query.append_pair("user_id", user_id).append_pair("api_key", key);
            }
        }
        Ok(api_url)
    }
}

impl std::fmt::Debug for GelbooruExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GelbooruExtractor")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.user_id.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Extractor for GelbooruExtractor {
    fn site_id(&self) -> SiteId {
        SITE_ID
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn priority_rank(&self) -> u32 {
        SITE_ID
    }

    fn handles_host(&self, host: &str) -> bool {
        host_matches_domain(host, DOMAIN)
    }

    #[tracing::instrument(skip(self), fields(extractor = NAME))]
    async fn fetch_metadata(&self, url: &str) -> Result<ExtractOutcome, ExtractorError> {
        let post_id = query_param(url, "id")
            .filter(|id| is_numeric_id(id))
            .ok_or_else(|| ExtractorError::invalid_url(NAME, url, "missing numeric `id` query parameter"))?;
        let api_url = self.api_url(&post_id, url)?;

        debug!(post_id = %post_id, "Calling Gelbooru API");

        let response = self
            .client
            .get(api_url.clone())
            .send()
            .await
            .map_err(|e| ExtractorError::request(NAME, api_url.path(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractorError::http_status(
                NAME,
                api_url.path(),
                status.as_u16(),
            ));
        }

        let body = response
            .json::<GelbooruResponse>()
            .await
            .map_err(|e| ExtractorError::malformed(NAME, api_url.path(), e.to_string()))?;

        let Some(post) = body.post.into_iter().next() else {
            debug!(post_id = %post_id, "Gelbooru returned no post");
            return Ok(ExtractOutcome::Absent);
        };

        Ok(ExtractOutcome::Found(normalize_post(post, &post_id)))
    }
}

fn normalize_post(post: GelbooruPost, post_id: &str) -> MetadataResult {
    let mut tags = split_tags(&post.tags, None);
    tags.push(format!("meta:{NAME}"));

    let source = post
        .source
        .as_deref()
        .and_then(valid_http_url)
        .unwrap_or_else(|| format!("{PUBLIC_POST_URL}{post_id}"));

    MetadataResult {
        tags,
        source,
        rating: post.rating.as_deref().map_or(Rating::Unknown, Rating::from_code),
    }
}
