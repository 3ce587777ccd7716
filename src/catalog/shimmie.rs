//! Shimmie2 GraphQL catalog gateway.
//!
//! All operations POST `{query, variables}` to `<endpoint>/graphql`. The login
//! mutation yields a session token which is stored as `shm_user`/`shm_session`
//! cookies in the client's jar, so later mutations are authenticated.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::cookie::Jar;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use crate::http_client::build_http_client;

use super::{CatalogError, CatalogGateway, PostUpdate, Session, UpdatedPost, WorkItem};

const LOGIN_MUTATION: &str = "mutation Login($username: String!, $password: String!) { \
     login(username: $username, password: $password) { user { name } session error } }";

const NEXT_POST_QUERY: &str = "query NextPost($tags: [String!]) { \
     posts(limit: 1, offset: 0, tags: $tags) { id post_id tags source hash ext image_link } }";

const UPDATE_METADATA_MUTATION: &str =
    "mutation UpdatePostMetadata($post_id: Int!, $metadata: [MetadataInput!]!) { \
     update_post_metadata(post_id: $post_id, metadata: $metadata) { id tags source } }";

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    login: LoginPayload,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    user: Option<LoginUser>,
    session: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PostsData {
    posts: Vec<ShimmiePost>,
}

#[derive(Debug, Deserialize)]
struct ShimmiePost {
    id: IdValue,
    post_id: i64,
    #[serde(default)]
    tags: TagList,
    source: Option<String>,
    hash: String,
    ext: String,
    image_link: String,
}

#[derive(Debug, Deserialize)]
struct UpdateData {
    update_post_metadata: UpdatedSummary,
}

#[derive(Debug, Deserialize)]
struct UpdatedSummary {
    id: IdValue,
    #[serde(default)]
    tags: TagList,
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Number(i64),
    Text(String),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// Shimmie exposes tags as a list; older builds return a space-joined string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagList {
    List(Vec<String>),
    Text(String),
}

impl Default for TagList {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl TagList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(tags) => tags,
            Self::Text(raw) => raw.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// Catalog gateway for a Shimmie2 instance.
pub struct ShimmieGateway {
    client: Client,
    jar: Arc<Jar>,
    endpoint: Url,
    base: String,
    login: String,
    password: String,
}

impl ShimmieGateway {
    /// Creates a gateway for the Shimmie site rooted at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidEndpoint`] for a non-http(s) endpoint, or
    /// [`CatalogError::ClientBuild`] if HTTP client construction fails.
    pub fn new(
        endpoint: &str,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let base = endpoint.trim().trim_end_matches('/').to_string();
        let parsed = Url::parse(&base).map_err(|e| CatalogError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CatalogError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let jar = Arc::new(Jar::default());
        let client = build_http_client("shimmie", Some(Arc::clone(&jar)))?;

        Ok(Self {
            client,
            jar,
            endpoint: parsed,
            base,
            login: login.into(),
            password: password.into(),
        })
    }

    fn graphql_url(&self) -> String {
        format!("{}/graphql", self.base)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: &str,
        variables: Value,
    ) -> Result<T, CatalogError> {
        let response = self
            .client
            .post(self.graphql_url())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|source| CatalogError::Request { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::HttpStatus {
                operation,
                status: status.as_u16(),
            });
        }

        let body = response
            .json::<GraphQlResponse<T>>()
            .await
            .map_err(|e| CatalogError::malformed(operation, e.to_string()))?;

        if !body.errors.is_empty() {
            return Err(CatalogError::GraphQl {
                operation,
                messages: body.errors.into_iter().map(|e| e.message).collect(),
            });
        }

        body.data
            .ok_or_else(|| CatalogError::malformed(operation, "response has no data"))
    }

    fn store_session(&self, user_name: &str, session: &str) {
        self.jar.add_cookie_str(
            &format!("shm_user={user_name}; Path=/"),
            &self.endpoint,
        );
        self.jar.add_cookie_str(
            &format!("shm_session={session}; Path=/"),
            &self.endpoint,
        );
    }
}

impl std::fmt::Debug for ShimmieGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShimmieGateway")
            .field("endpoint", &self.base)
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CatalogGateway for ShimmieGateway {
    #[tracing::instrument(skip(self), fields(catalog = "shimmie", login = %self.login))]
    async fn authenticate(&self) -> Result<Session, CatalogError> {
        let data: LoginData = self
            .execute(
                "login",
                LOGIN_MUTATION,
                json!({ "username": self.login, "password": self.password }),
            )
            .await?;

        let payload = data.login;
        if let Some(error) = payload.error.filter(|e| !e.trim().is_empty()) {
            return Err(CatalogError::authentication(&self.login, error));
        }
        let session = payload
            .session
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CatalogError::authentication(&self.login, "no session returned"))?;
        let user_name = payload
            .user
            .map(|u| u.name)
            .ok_or_else(|| CatalogError::authentication(&self.login, "no user returned"))?;

        self.store_session(&user_name, &session);
        info!(user = %user_name, "Logged in to catalog");
        Ok(Session { user_name })
    }

    #[tracing::instrument(skip(self), fields(catalog = "shimmie"))]
    async fn fetch_next(&self, tag: &str) -> Result<Option<WorkItem>, CatalogError> {
        let data: PostsData = self
            .execute("fetch", NEXT_POST_QUERY, json!({ "tags": [tag] }))
            .await?;

        let item = data.posts.into_iter().next().map(|post| WorkItem {
            id: post.id.into_string(),
            post_id: post.post_id,
            hash: post.hash,
            ext: post.ext,
            tags: post.tags.into_vec(),
            source: post.source,
            image_link: post.image_link,
        });
        debug!(found = item.is_some(), "Fetched next backlog post");
        Ok(item)
    }

    #[tracing::instrument(skip(self, update), fields(catalog = "shimmie", post_id = update.post_id))]
    async fn apply_metadata(&self, update: &PostUpdate) -> Result<UpdatedPost, CatalogError> {
        let metadata: Vec<Value> = update
            .metadata_entries()
            .into_iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect();

        let data: UpdateData = self
            .execute(
                "update",
                UPDATE_METADATA_MUTATION,
                json!({ "post_id": update.post_id, "metadata": metadata }),
            )
            .await?;

        let summary = data.update_post_metadata;
        Ok(UpdatedPost {
            id: summary.id.into_string(),
            tags: summary.tags.into_vec(),
            source: summary.source,
        })
    }

    fn image_url(&self, item: &WorkItem) -> String {
        if item.image_link.starts_with("http://") || item.image_link.starts_with("https://") {
            return item.image_link.clone();
        }
        format!("{}{}", self.base, item.image_link)
    }

    fn post_url(&self, post_id: i64) -> String {
        format!("{}/post/view/{post_id}", self.base)
    }
}
