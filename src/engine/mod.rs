//! Resolution engine: turns oracle candidates into one metadata decision.
//!
//! Tiers are evaluated in order and the first one that succeeds wins:
//!
//! 1. [`DecisionTier::ExtractorMatch`] - a qualifying candidate on a site with a
//!    registered extractor, best priority rank first
//! 2. [`DecisionTier::AttributedLink`] - a qualifying candidate with an author
//! 3. [`DecisionTier::PlainLink`] - any qualifying candidate
//! 4. [`DecisionTier::NotFound`] - nothing qualifies; the search URL is kept
//!
//! Extractor failures never escape [`resolve`]; they demote to the next
//! candidate. Every decision ends with [`SENTINEL_TAG`].

mod naming;
mod tags;

pub use naming::{sanitize_author, site_display_name};

use std::fmt;

use tracing::{debug, info, warn};

use crate::catalog::WorkItem;
use crate::extractor::{ExtractOutcome, Extractor, ExtractorRegistry, Rating};
use crate::oracle::CandidateMatch;

pub(crate) use tags::union as union_tags;

/// Marker tag appended to every processed item.
pub const SENTINEL_TAG: &str = "meta:metamaster";

/// Tag added to unresolved items when `mark_unknown` is set.
pub const UNKNOWN_TAG: &str = "meta:unknown";

/// Similarity a candidate must exceed to drive a decision.
pub const MAX_SIMILARITY: f64 = 80.0;

/// Similarity a candidate must exceed to be logged as a near miss.
pub const MIN_SIMILARITY: f64 = 40.0;

/// Similarity thresholds, both exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Candidates above this qualify for tiers 1-3.
    pub max_similarity: f64,
    /// Candidates above this are reported when nothing qualifies.
    pub min_similarity: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_similarity: MAX_SIMILARITY,
            min_similarity: MIN_SIMILARITY,
        }
    }
}

impl Thresholds {
    /// Returns true if the candidate may drive an authoritative decision.
    #[must_use]
    pub fn qualifies(&self, candidate: &CandidateMatch) -> bool {
        candidate.similarity > self.max_similarity
    }

    /// Returns true if the candidate is worth surfacing to the operator.
    #[must_use]
    pub fn is_advisory(&self, candidate: &CandidateMatch) -> bool {
        candidate.similarity > self.min_similarity
    }
}

/// Per-run knobs the engine needs besides thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Tag that marks backlog items; never written back.
    pub backlog_tag: String,
    /// Add [`UNKNOWN_TAG`] to items nothing was found for.
    pub mark_unknown: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            backlog_tag: "tagme".to_string(),
            mark_unknown: false,
        }
    }
}

/// Which rung of the fallback ladder produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionTier {
    /// A site extractor returned full metadata.
    ExtractorMatch,
    /// Linked to a candidate with a known author.
    AttributedLink,
    /// Linked to a candidate without author information.
    PlainLink,
    /// No candidate qualified.
    NotFound,
}

impl DecisionTier {
    /// All tiers in precedence order.
    pub const ALL: [Self; 4] = [
        Self::ExtractorMatch,
        Self::AttributedLink,
        Self::PlainLink,
        Self::NotFound,
    ];

    /// Stable snake_case label for logs and summaries.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::ExtractorMatch => "extractor_match",
            Self::AttributedLink => "attributed_link",
            Self::PlainLink => "plain_link",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for DecisionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The engine's output for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDecision {
    /// Full tag list to write, sentinel last.
    pub tags: Vec<String>,
    /// Proposed source URL.
    pub source: Option<String>,
    /// Proposed rating; never [`Rating::Unknown`].
    pub rating: Option<Rating>,
    /// Tier that produced the decision.
    pub tier: DecisionTier,
}

/// Resolves one item against the oracle's candidates.
///
/// `search_url` is the public URL the oracle was queried with; it becomes the
/// source of a [`DecisionTier::NotFound`] decision. Candidate order from the
/// oracle is only used to break ties.
#[tracing::instrument(skip_all, fields(post_id = item.post_id, candidates = candidates.len()))]
pub async fn resolve(
    item: &WorkItem,
    search_url: &str,
    candidates: &[CandidateMatch],
    registry: &ExtractorRegistry,
    thresholds: &Thresholds,
    options: &ResolveOptions,
) -> MetadataDecision {
    let backlog_tag = options.backlog_tag.as_str();

    if let Some(decision) = resolve_by_extractor(item, candidates, registry, thresholds, backlog_tag).await {
        return decision;
    }

    let qualifying: Vec<&CandidateMatch> = candidates
        .iter()
        .filter(|c| thresholds.qualifies(c))
        .collect();

    let attributed = qualifying.iter().find_map(|candidate| {
        let author = sanitize_author(candidate.author.as_deref()?);
        (!author.is_empty()).then_some((*candidate, author))
    });
    if let Some((candidate, author)) = attributed {
        let tier_tags = vec![
            format!("artist:{author}"),
            format!("meta:{}", site_display_name(&candidate.site_label)),
        ];
        info!(url = %candidate.url, artist = %author, "Linked to attributed candidate");
        return MetadataDecision {
            tags: tags::merge_with_sentinel([tier_tags.as_slice(), item.tags.as_slice()], backlog_tag),
            source: Some(candidate.url.clone()),
            rating: None,
            tier: DecisionTier::AttributedLink,
        };
    }

    if let Some(candidate) = qualifying.first() {
        let tier_tags = vec![format!("meta:{}", site_display_name(&candidate.site_label))];
        info!(url = %candidate.url, "Linked to candidate without author");
        return MetadataDecision {
            tags: tags::merge_with_sentinel([tier_tags.as_slice(), item.tags.as_slice()], backlog_tag),
            source: Some(candidate.url.clone()),
            rating: None,
            tier: DecisionTier::PlainLink,
        };
    }

    if let Some(near_miss) = advisory_candidate(candidates, thresholds) {
        info!(
            url = %near_miss.url,
            similarity = near_miss.similarity,
            "Low similarity result"
        );
    }

    let unknown: Vec<String> = if options.mark_unknown {
        vec![UNKNOWN_TAG.to_string()]
    } else {
        Vec::new()
    };
    info!("No qualifying candidate");
    MetadataDecision {
        tags: tags::merge_with_sentinel([item.tags.as_slice(), unknown.as_slice()], backlog_tag),
        source: Some(search_url.to_string()),
        rating: None,
        tier: DecisionTier::NotFound,
    }
}

async fn resolve_by_extractor(
    item: &WorkItem,
    candidates: &[CandidateMatch],
    registry: &ExtractorRegistry,
    thresholds: &Thresholds,
    backlog_tag: &str,
) -> Option<MetadataDecision> {
    let mut ranked: Vec<(&CandidateMatch, &dyn Extractor)> = candidates
        .iter()
        .filter(|c| thresholds.qualifies(c))
        .filter_map(|c| registry.get(c.site_id).map(|extractor| (c, extractor)))
        .collect();
    // sort_by_key is stable: equal ranks keep oracle order
    ranked.sort_by_key(|(_, extractor)| extractor.priority_rank());

    for (candidate, extractor) in ranked {
        match extractor.fetch_metadata(&candidate.url).await {
            Ok(ExtractOutcome::Found(result)) => {
                info!(
                    extractor = extractor.name(),
                    url = %candidate.url,
                    tags = result.tags.len(),
                    "Extractor matched"
                );
                return Some(MetadataDecision {
                    tags: tags::merge_with_sentinel(
                        [result.tags.as_slice(), item.tags.as_slice()],
                        backlog_tag,
                    ),
                    source: Some(result.source),
                    rating: result.rating.is_known().then_some(result.rating),
                    tier: DecisionTier::ExtractorMatch,
                });
            }
            Ok(ExtractOutcome::Absent) => {
                debug!(extractor = extractor.name(), url = %candidate.url, "Extractor found nothing");
            }
            Err(error) => {
                warn!(extractor = extractor.name(), url = %candidate.url, error = %error, "Extractor failed, trying next candidate");
            }
        }
    }
    None
}

/// Returns the first candidate above the advisory threshold.
#[must_use]
pub fn advisory_candidate<'a>(
    candidates: &'a [CandidateMatch],
    thresholds: &Thresholds,
) -> Option<&'a CandidateMatch> {
    candidates.iter().find(|c| thresholds.is_advisory(c))
}
