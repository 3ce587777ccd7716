//! Catalog gateway: where backlog items come from and where decisions land.
//!
//! The worker loop only talks to the catalog through [`CatalogGateway`]. The
//! shipped implementation is [`ShimmieGateway`], a Shimmie2 GraphQL client.

mod error;
mod shimmie;

pub use error::CatalogError;
pub use shimmie::ShimmieGateway;

use async_trait::async_trait;

use crate::extractor::Rating;

/// A catalog post awaiting enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Catalog object identity.
    pub id: String,
    /// Numeric post id used for mutations and links.
    pub post_id: i64,
    /// Content hash, used for the rehosted file name.
    pub hash: String,
    /// File extension without the dot.
    pub ext: String,
    /// Current tags.
    pub tags: Vec<String>,
    /// Current source, if any.
    pub source: Option<String>,
    /// Catalog-relative image path.
    pub image_link: String,
}

impl WorkItem {
    /// Returns true when the post already carries a non-blank source.
    #[must_use]
    pub fn has_source(&self) -> bool {
        self.source.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

/// Authenticated catalog session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Name of the logged-in user.
    pub user_name: String,
}

/// A metadata write for one post.
///
/// `tags` replaces the post's entire tag field. `source` and `rating` are only
/// written when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostUpdate {
    /// Target post id.
    pub post_id: i64,
    /// Full replacement tag list.
    pub tags: Vec<String>,
    /// New source, or `None` to leave the current one untouched.
    pub source: Option<String>,
    /// New rating, or `None` to leave the current one untouched.
    pub rating: Option<Rating>,
}

impl PostUpdate {
    /// Returns the `(key, value)` metadata pairs to send, `tags` first.
    #[must_use]
    pub fn metadata_entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![("tags", self.tags.join(" "))];
        if let Some(source) = &self.source {
            entries.push(("source", source.clone()));
        }
        if let Some(rating) = self.rating.filter(|r| r.is_known()) {
            entries.push(("rating", rating.code().to_string()));
        }
        entries
    }
}

/// Post state returned by the catalog after a metadata write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedPost {
    /// Catalog object identity.
    pub id: String,
    /// Tags after the write.
    pub tags: Vec<String>,
    /// Source after the write.
    pub source: Option<String>,
}

/// Trait implemented by catalog backends.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Establishes an authenticated session used by later mutations.
    async fn authenticate(&self) -> Result<Session, CatalogError>;

    /// Returns the next post carrying `tag`, or `None` when the backlog is empty.
    async fn fetch_next(&self, tag: &str) -> Result<Option<WorkItem>, CatalogError>;

    /// Writes metadata for one post.
    async fn apply_metadata(&self, update: &PostUpdate) -> Result<UpdatedPost, CatalogError>;

    /// Absolute URL of the item's image file as hosted by the catalog.
    fn image_url(&self, item: &WorkItem) -> String;

    /// Absolute URL of the post's page, for operator logs.
    fn post_url(&self, post_id: i64) -> String;
}
