//! SauceNAO oracle - queries the SauceNAO JSON API (`output_type=2`).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::extractor::SiteId;
use crate::http_client::build_http_client;

use super::{CandidateMatch, ReverseSearchOracle, SearchError};

const DEFAULT_BASE_URL: &str = "https://saucenao.com";
const DEFAULT_RESULT_COUNT: u32 = 5;

#[derive(Debug, Deserialize)]
struct SauceNaoResponse {
    header: SauceNaoHeader,
    #[serde(default)]
    results: Option<Vec<SauceNaoResult>>,
}

#[derive(Debug, Deserialize)]
struct SauceNaoHeader {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SauceNaoResult {
    header: ResultHeader,
    #[serde(default)]
    data: ResultData,
}

#[derive(Debug, Deserialize)]
struct ResultHeader {
    similarity: NumberOrText,
    index_id: SiteId,
    #[serde(default)]
    index_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResultData {
    #[serde(default)]
    ext_urls: Vec<String>,
    #[serde(default)]
    member_name: Option<String>,
    #[serde(default)]
    author_name: Option<String>,
    /// String on most indexes, array of names on booru indexes.
    #[serde(default)]
    creator: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Reverse search through SauceNAO.
pub struct SauceNaoOracle {
    client: Client,
    base_url: String,
    api_key: String,
    result_count: u32,
}

impl SauceNaoOracle {
    /// Creates an oracle using the public SauceNAO endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if HTTP client construction fails.
    pub fn new(api_key: impl Into<String>) -> Result<Self, SearchError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Creates an oracle with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if HTTP client construction fails.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let client = build_http_client("saucenao", None)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            result_count: DEFAULT_RESULT_COUNT,
        })
    }

    fn search_url(&self, public_url: &str) -> Result<Url, SearchError> {
        let mut url = Url::parse(&format!("{}/search.php", self.base_url))
            .map_err(|e| SearchError::malformed(format!("invalid SauceNAO base URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("output_type", "2")
            .append_pair("numres", &self.result_count.to_string())
            .append_pair("api_key", &self.api_key)
            .append_pair("url", public_url);
        Ok(url)
    }
}

impl std::fmt::Debug for SauceNaoOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SauceNaoOracle")
            .field("base_url", &self.base_url)
            .field("result_count", &self.result_count)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReverseSearchOracle for SauceNaoOracle {
    fn name(&self) -> &'static str {
        "saucenao"
    }

    #[tracing::instrument(skip(self), fields(oracle = "saucenao"))]
    async fn search(&self, public_url: &str) -> Result<Vec<CandidateMatch>, SearchError> {
        let url = self.search_url(public_url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| SearchError::Request { source })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            return Err(SearchError::http_status(status.as_u16()));
        }

        let body = response
            .json::<SauceNaoResponse>()
            .await
            .map_err(|e| SearchError::malformed(e.to_string()))?;

        if body.header.status != 0 {
            return Err(SearchError::Provider {
                status: body.header.status,
                message: body
                    .header
                    .message
                    .unwrap_or_else(|| "no message".to_string()),
            });
        }

        let candidates: Vec<CandidateMatch> = body
            .results
            .unwrap_or_default()
            .into_iter()
            .filter_map(into_candidate)
            .collect();

        debug!(count = candidates.len(), "SauceNAO candidates received");
        Ok(candidates)
    }
}

fn into_candidate(result: SauceNaoResult) -> Option<CandidateMatch> {
    let Some(similarity) = result.header.similarity.as_f64() else {
        debug!(index_id = result.header.index_id, "Skipping result with unreadable similarity");
        return None;
    };
    let url = result.data.ext_urls.into_iter().next()?;
    let site_label = site_label_for_index(result.header.index_id)
        .map(str::to_string)
        .or_else(|| label_from_index_name(&result.header.index_name))
        .unwrap_or_else(|| format!("index_{}", result.header.index_id));

    let author = non_blank(result.data.member_name)
        .or_else(|| non_blank(result.data.author_name))
        .or_else(|| non_blank(result.data.creator.as_ref().and_then(creator_name)));

    Some(CandidateMatch {
        similarity,
        site_id: result.header.index_id,
        site_label,
        url,
        author,
    })
}

fn non_blank(name: Option<String>) -> Option<String> {
    name.map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

fn creator_name(value: &Value) -> Option<String> {
    match value {
        Value::String(name) => Some(name.clone()),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .find(|name| !name.trim().is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Parses `"Index #9: Danbooru - 1234.jpg"` into `Danbooru`.
fn label_from_index_name(index_name: &str) -> Option<String> {
    let (_, rest) = index_name.split_once(':')?;
    let label = rest.split(" - ").next()?.trim();
    (!label.is_empty()).then(|| label.to_string())
}

/// Returns the site label for a known SauceNAO index id.
#[must_use]
pub fn site_label_for_index(index_id: SiteId) -> Option<&'static str> {
    let label = match index_id {
        0 => "H-Magazines",
        2 => "H-Game CG",
        3 => "DoujinshiDB",
        5 | 6 => "Pixiv",
        8 => "Nico Nico Seiga",
        9 => "Danbooru",
        10 => "drawr",
        11 => "Nijie",
        12 => "Yande.re",
        16 => "FAKKU",
        18 | 38 => "H-Misc",
        19 => "2D-Market",
        20 => "MediBang",
        21 => "Anime",
        22 => "H-Anime",
        23 => "Movies",
        24 => "Shows",
        25 => "Gelbooru",
        26 => "Konachan",
        27 => "Sankaku Channel",
        28 => "Anime Pictures",
        29 => "e621.net",
        30 => "Idol Complex",
        31 | 32 => "bcy.net",
        33 => "PortalGraphics.net",
        34 => "deviantArt",
        35 => "Pawoo.net",
        36 => "Madokami",
        37 => "MangaDex",
        39 => "ArtStation",
        40 => "FurAffinity",
        41 => "Twitter",
        42 => "Furry Network",
        43 => "Kemono",
        44 => "Skeb",
        _ => return None,
    };
    Some(label)
}
