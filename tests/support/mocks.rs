//! In-memory collaborators for worker loop tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use metamaster_core::catalog::{CatalogError, CatalogGateway, PostUpdate, Session, UpdatedPost, WorkItem};
use metamaster_core::extractor::{ExtractOutcome, Extractor, ExtractorError, MetadataResult, Rating, SiteId};
use metamaster_core::oracle::{CandidateMatch, ReverseSearchOracle, SearchError};
use metamaster_core::transfer::{ImageTransfer, TransferError};

pub const ENDPOINT: &str = "https://booru.example";

pub fn work_item(post_id: i64, tags: &[&str], source: Option<&str>) -> WorkItem {
    WorkItem {
        id: format!("post:{post_id}"),
        post_id,
        hash: format!("hash{post_id}"),
        ext: "png".to_string(),
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
        source: source.map(str::to_string),
        image_link: format!("/_images/hash{post_id}/{post_id}.png"),
    }
}

/// Catalog holding posts in memory; writes replace tags like Shimmie does.
#[derive(Default)]
pub struct MemoryCatalog {
    posts: Mutex<Vec<WorkItem>>,
    updates: Mutex<Vec<PostUpdate>>,
    fetch_script: Mutex<VecDeque<bool>>,
    reject_login: bool,
    pub fetch_calls: AtomicUsize,
}

impl MemoryCatalog {
    pub fn with_posts(posts: Vec<WorkItem>) -> Self {
        Self {
            posts: Mutex::new(posts),
            ..Self::default()
        }
    }

    pub fn rejecting_login() -> Self {
        Self {
            reject_login: true,
            ..Self::default()
        }
    }

    /// Scripts upcoming fetches: `true` fails the call, `false` serves normally.
    pub fn script_fetches(&self, plan: &[bool]) {
        self.fetch_script.lock().unwrap().extend(plan.iter().copied());
    }

    pub fn updates(&self) -> Vec<PostUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn post(&self, post_id: i64) -> Option<WorkItem> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.post_id == post_id)
            .cloned()
    }
}

#[async_trait]
impl CatalogGateway for MemoryCatalog {
    async fn authenticate(&self) -> Result<Session, CatalogError> {
        if self.reject_login {
            return Err(CatalogError::authentication("bot", "invalid password"));
        }
        Ok(Session {
            user_name: "bot".to_string(),
        })
    }

    async fn fetch_next(&self, tag: &str) -> Result<Option<WorkItem>, CatalogError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fetch_script.lock().unwrap().pop_front() == Some(true) {
            return Err(CatalogError::HttpStatus {
                operation: "fetch",
                status: 503,
            });
        }
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.tags.iter().any(|t| t == tag))
            .cloned())
    }

    async fn apply_metadata(&self, update: &PostUpdate) -> Result<UpdatedPost, CatalogError> {
        self.updates.lock().unwrap().push(update.clone());
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.post_id == update.post_id)
            .ok_or_else(|| CatalogError::malformed("update", "unknown post"))?;
        post.tags.clone_from(&update.tags);
        if let Some(source) = &update.source {
            post.source = Some(source.clone());
        }
        Ok(UpdatedPost {
            id: post.id.clone(),
            tags: post.tags.clone(),
            source: post.source.clone(),
        })
    }

    fn image_url(&self, item: &WorkItem) -> String {
        format!("{ENDPOINT}{}", item.image_link)
    }

    fn post_url(&self, post_id: i64) -> String {
        format!("{ENDPOINT}/post/view/{post_id}")
    }
}

/// Oracle returning the same candidates for every query.
#[derive(Default)]
pub struct FixedOracle {
    candidates: Vec<CandidateMatch>,
    failing: bool,
    queries: Mutex<Vec<String>>,
}

impl FixedOracle {
    pub fn returning(candidates: Vec<CandidateMatch>) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReverseSearchOracle for FixedOracle {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn search(&self, public_url: &str) -> Result<Vec<CandidateMatch>, SearchError> {
        self.queries.lock().unwrap().push(public_url.to_string());
        if self.failing {
            return Err(SearchError::RateLimited);
        }
        Ok(self.candidates.clone())
    }
}

/// Transfer backend that never touches the network or the image codec.
#[derive(Default)]
pub struct RecordingTransfer {
    pub downloads: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl ImageTransfer for RecordingTransfer {
    async fn download(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        self.downloads.lock().unwrap().push(url.to_string());
        Ok(b"original".to_vec())
    }

    async fn transcode(&self, _bytes: Vec<u8>) -> Result<Vec<u8>, TransferError> {
        Ok(b"recompressed".to_vec())
    }

    async fn rehost(&self, bytes: Vec<u8>, file_name: &str) -> Result<String, TransferError> {
        self.uploads
            .lock()
            .unwrap()
            .push((file_name.to_string(), bytes));
        Ok(format!("https://files.example/{file_name}"))
    }
}

/// Extractor with a canned outcome.
pub struct CannedExtractor {
    pub site_id: SiteId,
    pub rank: u32,
    pub tags: Vec<String>,
    pub source: String,
    pub rating: Rating,
}

impl CannedExtractor {
    pub fn new(site_id: SiteId, rank: u32, tag: &str) -> Self {
        Self {
            site_id,
            rank,
            tags: vec![tag.to_string()],
            source: format!("https://site{site_id}.example/post"),
            rating: Rating::Questionable,
        }
    }
}

#[async_trait]
impl Extractor for CannedExtractor {
    fn site_id(&self) -> SiteId {
        self.site_id
    }

    fn name(&self) -> &str {
        "canned"
    }

    fn priority_rank(&self) -> u32 {
        self.rank
    }

    fn handles_host(&self, _host: &str) -> bool {
        false
    }

    async fn fetch_metadata(&self, _url: &str) -> Result<ExtractOutcome, ExtractorError> {
        Ok(ExtractOutcome::Found(MetadataResult {
            tags: self.tags.clone(),
            source: self.source.clone(),
            rating: self.rating,
        }))
    }
}
