//! Cycle state machine and failure budget.
//!
//! States: `FetchNext` -> `Transfer` (upload mode only) -> `Search`
//!         -> `Resolve` -> `Apply` -> `Cooldown` -> `FetchNext` ...
//!
//! Any state may move to `Cooldown` after a recovered failure, or to
//! `Terminated` when the backlog drains or the failure budget runs out.

use std::fmt;

use crate::catalog::WorkItem;
use crate::engine::MetadataDecision;
use crate::oracle::CandidateMatch;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationCause {
    /// No item carries the backlog tag any more.
    BacklogDrained,
    /// Too many consecutive cycles failed.
    FailureBudgetExceeded,
}

impl TerminationCause {
    /// Returns true when the run ended without exhausting its failure budget.
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::BacklogDrained
    }
}

impl fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BacklogDrained => f.write_str("backlog drained"),
            Self::FailureBudgetExceeded => f.write_str("failure budget exceeded"),
        }
    }
}

/// Position of the worker within one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleState {
    /// Ask the catalog for the next backlog item.
    FetchNext,
    /// Rehost the item's image.
    Transfer {
        /// Prepared item.
        item: WorkItem,
    },
    /// Query the oracle.
    Search {
        /// Prepared item.
        item: WorkItem,
        /// URL the oracle will fetch.
        public_url: String,
    },
    /// Run the resolution engine.
    Resolve {
        /// Prepared item.
        item: WorkItem,
        /// URL the oracle fetched.
        public_url: String,
        /// Oracle output.
        candidates: Vec<CandidateMatch>,
    },
    /// Write the decision back to the catalog.
    Apply {
        /// Prepared item.
        item: WorkItem,
        /// Engine output.
        decision: MetadataDecision,
    },
    /// Fixed pause before the next fetch.
    Cooldown,
    /// Run is over.
    Terminated(TerminationCause),
}

impl CycleState {
    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::FetchNext => "fetch_next",
            Self::Transfer { .. } => "transfer",
            Self::Search { .. } => "search",
            Self::Resolve { .. } => "resolve",
            Self::Apply { .. } => "apply",
            Self::Cooldown => "cooldown",
            Self::Terminated(_) => "terminated",
        }
    }

    /// Returns the termination cause once the run is over.
    #[must_use]
    pub fn termination(&self) -> Option<TerminationCause> {
        match self {
            Self::Terminated(cause) => Some(*cause),
            _ => None,
        }
    }
}

/// Consecutive failed cycles, reset by any completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureCounter {
    consecutive: u32,
    threshold: u32,
}

impl FailureCounter {
    /// Creates a counter that is exhausted after `threshold` failures.
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive: 0,
            threshold: threshold.max(1),
        }
    }

    /// Records one failed cycle and returns true if the budget is now spent.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.is_exhausted()
    }

    /// Clears the count after a completed cycle.
    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    /// Current consecutive failure count.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.consecutive
    }

    /// Configured threshold.
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Returns true once the count has reached the threshold.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.consecutive >= self.threshold
    }
}
