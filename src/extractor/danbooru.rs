//! Danbooru extractor - reads post metadata from the Danbooru JSON API.
//!
//! Danbooru splits tags into categories; they are carried into the catalog as
//! namespaced tags (`character:`, `artist:`, `meta:`, `series:`) with general
//! tags left bare.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::http_client::build_http_client;

use super::utils::{host_matches_domain, is_numeric_id, last_path_segment, split_tags};
use super::{ExtractOutcome, Extractor, ExtractorError, MetadataResult, Rating, SiteId};

const NAME: &str = "danbooru";
const SITE_ID: SiteId = 9;
const DEFAULT_BASE_URL: &str = "https://danbooru.donmai.us";
const PUBLIC_POST_URL: &str = "https://danbooru.donmai.us/posts";
const DOMAIN: &str = "donmai.us";

#[derive(Debug, Deserialize)]
struct DanbooruPost {
    #[serde(default)]
    tag_string_character: String,
    #[serde(default)]
    tag_string_artist: String,
    #[serde(default)]
    tag_string_meta: String,
    #[serde(default)]
    tag_string_copyright: String,
    #[serde(default)]
    tag_string_general: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    rating: Option<String>,
}

/// Extractor for `danbooru.donmai.us` posts.
pub struct DanbooruExtractor {
    client: Client,
    base_url: String,
    login: Option<String>,
    api_key: Option<String>,
}

impl DanbooruExtractor {
    /// Creates an extractor against the public Danbooru API.
    ///
    /// Credentials are only sent when both login and key are present.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError`] if HTTP client construction fails.
    pub fn new(login: Option<String>, api_key: Option<String>) -> Result<Self, ExtractorError> {
        Self::with_base_url(DEFAULT_BASE_URL, login, api_key)
    }

    /// Creates an extractor with a custom API base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError`] if HTTP client construction fails.
    pub fn with_base_url(
        base_url: impl Into<String>,
        login: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, ExtractorError> {
        let client = build_http_client(NAME, None)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            login: login.filter(|v| !v.trim().is_empty()),
            api_key: api_key.filter(|v| !v.trim().is_empty()),
        })
    }

    fn api_url(&self, post_id: &str, candidate: &str) -> Result<Url, ExtractorError> {
        let raw = format!("{}/posts/{post_id}.json", self.base_url);
        let mut api_url = Url::parse(&raw)
            .map_err(|e| ExtractorError::invalid_url(NAME, candidate, &e.to_string()))?;
        if let (Some(login), Some(key)) = (&self.login, &self.api_key) {
            api_url
                .query_pairs_mut()
                .append_pair("login", login)
                .append_pair("api_key", key);
        }
        Ok(api_url)
    }
}

impl std::fmt::Debug for DanbooruExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DanbooruExtractor")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.login.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Extractor for DanbooruExtractor {
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
        let post_id = last_path_segment(url)
            .filter(|id| is_numeric_id(id))
            .ok_or_else(|| ExtractorError::invalid_url(NAME, url, "no numeric post id in path"))?;
        let api_url = self.api_url(&post_id, url)?;

        debug!(post_id = %post_id, "Calling Danbooru API");

        let response = self
            .client
            .get(api_url.clone())
            .send()
            .await
            .map_err(|e| ExtractorError::request(NAME, api_url.path(), e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(post_id = %post_id, "Danbooru post not found");
            return Ok(ExtractOutcome::Absent);
        }
        if !status.is_success() {
            return Err(ExtractorError::http_status(
                NAME,
                api_url.path(),
                status.as_u16(),
            ));
        }

        let post = response
            .json::<DanbooruPost>()
            .await
            .map_err(|e| ExtractorError::malformed(NAME, api_url.path(), e.to_string()))?;

        Ok(ExtractOutcome::Found(normalize_post(post, &post_id)))
    }
}

fn normalize_post(post: DanbooruPost, post_id: &str) -> MetadataResult {
    let mut tags = Vec::new();
    tags.extend(split_tags(&post.tag_string_character, Some("character")));
    tags.extend(split_tags(&post.tag_string_artist, Some("artist")));
    tags.extend(split_tags(&post.tag_string_meta, Some("meta")));
    tags.extend(split_tags(&post.tag_string_copyright, Some("series")));
    tags.extend(split_tags(&post.tag_string_general, None));
    tags.push(format!("meta:{NAME}"));

    let source = post
        .source
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("{PUBLIC_POST_URL}/{post_id}"));

    MetadataResult {
        tags,
        source,
        rating: post.rating.as_deref().map_or(Rating::Unknown, danbooru_rating),
    }
}

/// Danbooru uses `g`eneral / `s`ensitive / `q`uestionable / `e`xplicit.
fn danbooru_rating(code: &str) -> Rating {
    match code.trim() {
        "g" => Rating::Safe,
        "s" | "q" => Rating::Questionable,
        "e" => Rating::Explicit,
        _ => Rating::Unknown,
    }
}
