//! Worker loop: drives the resolution engine over the catalog backlog.
//!
//! One item is in flight at a time. Each cycle walks the [`CycleState`]
//! machine from `FetchNext` to `Cooldown`; a failed stage abandons the cycle,
//! counts against the [`FailureCounter`], and still waits out the cooldown.
//! The run ends when the backlog drains or the failure budget is spent.

mod error;
mod state;

pub use error::WorkerError;
pub use state::{CycleState, FailureCounter, TerminationCause};

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::catalog::{CatalogGateway, PostUpdate, WorkItem};
use crate::config::RunConfig;
use crate::engine::{self, DecisionTier, MetadataDecision, union_tags};
use crate::extractor::ExtractorRegistry;
use crate::oracle::ReverseSearchOracle;
use crate::transfer::{ImageTransfer, publish_copy};

/// Totals for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Why the run stopped.
    pub cause: TerminationCause,
    /// Items whose metadata was written.
    pub processed: usize,
    /// Cycles abandoned because of an operational error.
    pub failed_cycles: usize,
    tiers: HashMap<DecisionTier, usize>,
}

impl RunSummary {
    fn new(cause: TerminationCause) -> Self {
        Self {
            cause,
            processed: 0,
            failed_cycles: 0,
            tiers: HashMap::new(),
        }
    }

    /// Number of applied decisions produced by `tier`.
    #[must_use]
    pub fn tier_count(&self, tier: DecisionTier) -> usize {
        self.tiers.get(&tier).copied().unwrap_or(0)
    }

    fn record(&mut self, tier: DecisionTier) {
        self.processed += 1;
        *self.tiers.entry(tier).or_insert(0) += 1;
    }
}

/// Applies the run's extra-tag policy to a freshly fetched item.
///
/// With `append_existing_tags` the item keeps its tags and gains the extra
/// ones; otherwise its tags are replaced by the extra tags.
#[must_use]
pub fn prepare_item(mut item: WorkItem, config: &RunConfig) -> WorkItem {
    item.tags = if config.append_existing_tags {
        union_tags(&item.tags, &config.extra_tags)
    } else {
        union_tags(&config.extra_tags, &[])
    };
    item
}

/// Builds the catalog write for a decision.
///
/// Tags are always written. The source is only written when the item has
/// none or `override_source` is set; the rating only when known.
#[must_use]
pub fn build_post_update(
    item: &WorkItem,
    decision: &MetadataDecision,
    override_source: bool,
) -> PostUpdate {
    let source = if override_source || !item.has_source() {
        decision.source.clone()
    } else {
        None
    };
    PostUpdate {
        post_id: item.post_id,
        tags: decision.tags.clone(),
        source,
        rating: decision.rating.filter(|rating| rating.is_known()),
    }
}

/// Sequential enrichment worker.
pub struct Worker {
    catalog: Arc<dyn CatalogGateway>,
    oracle: Arc<dyn ReverseSearchOracle>,
    transfer: Option<Arc<dyn ImageTransfer>>,
    registry: ExtractorRegistry,
    config: RunConfig,
    state: CycleState,
    failures: FailureCounter,
    summary: RunSummary,
}

impl Worker {
    /// Creates a worker that searches with the catalog-hosted image URL.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogGateway>,
        oracle: Arc<dyn ReverseSearchOracle>,
        registry: ExtractorRegistry,
        config: RunConfig,
    ) -> Self {
        let failures = FailureCounter::new(config.failure_threshold);
        Self {
            catalog,
            oracle,
            transfer: None,
            registry,
            config,
            state: CycleState::FetchNext,
            failures,
            summary: RunSummary::new(TerminationCause::BacklogDrained),
        }
    }

    /// Attaches the rehosting backend used when upload mode is on.
    #[must_use]
    pub fn with_transfer(mut self, transfer: Arc<dyn ImageTransfer>) -> Self {
        self.transfer = Some(transfer);
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &CycleState {
        &self.state
    }

    /// Current consecutive failure count.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.failures.count()
    }

    /// Authenticates, then steps until the run terminates.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Catalog`] if authentication fails. Failures
    /// inside the loop are counted, never returned.
    pub async fn run(mut self) -> Result<RunSummary, WorkerError> {
        let session = self.catalog.authenticate().await?;
        info!(
            user = %session.user_name,
            tag = %self.config.backlog_tag,
            extra_tags = ?self.config.extra_tags,
            "Processing backlog"
        );

        let cause = loop {
            if let Some(cause) = self.state.termination() {
                break cause;
            }
            self.step().await;
        };

        self.summary.cause = cause;
        let summary = self.summary;
        let by_tier: Vec<String> = DecisionTier::ALL
            .iter()
            .map(|tier| format!("{tier}={}", summary.tier_count(*tier)))
            .collect();
        info!(
            cause = %summary.cause,
            processed = summary.processed,
            failed_cycles = summary.failed_cycles,
            tiers = %by_tier.join(" "),
            "Run finished"
        );
        Ok(summary)
    }

    /// Performs one state transition.
    pub async fn step(&mut self) {
        let current = mem::replace(&mut self.state, CycleState::Cooldown);
        let stage = current.label();
        self.state = match self.advance(current).await {
            Ok(next) => next,
            Err(error) => self.record_failure(stage, &error),
        };
    }

    fn record_failure(&mut self, stage: &'static str, failure: &WorkerError) -> CycleState {
        self.summary.failed_cycles += 1;
        if self.failures.record_failure() {
            error!(
                stage,
                service = failure.stage(),
                error = %failure,
                consecutive = self.failures.count(),
                "Too many consecutive failures, stopping"
            );
            return CycleState::Terminated(TerminationCause::FailureBudgetExceeded);
        }
        warn!(
            stage,
            service = failure.stage(),
            error = %failure,
            consecutive = self.failures.count(),
            threshold = self.failures.threshold(),
            "Cycle failed"
        );
        CycleState::Cooldown
    }

    async fn advance(&mut self, current: CycleState) -> Result<CycleState, WorkerError> {
        match current {
            CycleState::FetchNext => {
                let Some(item) = self.catalog.fetch_next(&self.config.backlog_tag).await? else {
                    info!(tag = %self.config.backlog_tag, "No more items with backlog tag");
                    return Ok(CycleState::Terminated(TerminationCause::BacklogDrained));
                };
                info!(id = %item.id, post_id = item.post_id, "Fetched item");
                let item = prepare_item(item, &self.config);

                if self.config.upload && self.transfer.is_some() {
                    Ok(CycleState::Transfer { item })
                } else {
                    let public_url = self.catalog.image_url(&item);
                    Ok(CycleState::Search { item, public_url })
                }
            }

            CycleState::Transfer { item } => {
                let source_url = self.catalog.image_url(&item);
                let public_url = match &self.transfer {
                    Some(transfer) => {
                        publish_copy(
                            transfer.as_ref(),
                            &source_url,
                            &item.hash,
                            &item.ext,
                            self.config.compress,
                        )
                        .await?
                    }
                    None => source_url,
                };
                Ok(CycleState::Search { item, public_url })
            }

            CycleState::Search { item, public_url } => {
                let candidates = self.oracle.search(&public_url).await?;
                info!(
                    oracle = self.oracle.name(),
                    candidates = candidates.len(),
                    "Reverse search complete"
                );
                Ok(CycleState::Resolve {
                    item,
                    public_url,
                    candidates,
                })
            }

            CycleState::Resolve {
                item,
                public_url,
                candidates,
            } => {
                let decision = engine::resolve(
                    &item,
                    &public_url,
                    &candidates,
                    &self.registry,
                    &self.config.thresholds,
                    &self.config.resolve_options(),
                )
                .await;
                info!(tier = %decision.tier, tags = decision.tags.len(), "Resolved metadata");
                Ok(CycleState::Apply { item, decision })
            }

            CycleState::Apply { item, decision } => {
                let update = build_post_update(&item, &decision, self.config.override_source);
                let updated = self.catalog.apply_metadata(&update).await?;
                info!(
                    id = %updated.id,
                    tier = %decision.tier,
                    tags = updated.tags.len(),
                    source = updated.source.as_deref().unwrap_or(""),
                    link = %self.catalog.post_url(item.post_id),
                    "Metadata updated"
                );
                self.summary.record(decision.tier);
                self.failures.reset();
                Ok(CycleState::Cooldown)
            }

            CycleState::Cooldown => {
                tokio::time::sleep(self.config.cooldown).await;
                Ok(CycleState::FetchNext)
            }

            terminated @ CycleState::Terminated(_) => Ok(terminated),
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("state", &self.state)
            .field("failures", &self.failures)
            .field("extractors", &self.registry.len())
            .finish_non_exhaustive()
    }
}
