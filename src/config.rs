//! Run configuration for the worker loop.

use std::time::Duration;

use thiserror::Error;

use crate::engine::{ResolveOptions, Thresholds};

/// Default backlog tag.
pub const DEFAULT_BACKLOG_TAG: &str = "tagme";

/// Consecutive failed cycles that terminate a run.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Pause between cycles, in seconds.
pub const DEFAULT_COOLDOWN_SECS: u64 = 9;

/// Errors from [`RunConfig::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Backlog tag is empty or contains whitespace.
    #[error("invalid backlog tag '{tag}'\n  Suggestion: Use a single non-empty tag such as 'tagme'")]
    InvalidBacklogTag {
        /// Rejected tag.
        tag: String,
    },

    /// A similarity threshold is outside 0..=100.
    #[error("{name} similarity {value} is outside 0..=100")]
    ThresholdOutOfRange {
        /// `max` or `min`.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// Advisory threshold is not below the decision threshold.
    #[error("min similarity {min} must be below max similarity {max}")]
    ThresholdOrder {
        /// Advisory threshold.
        min: f64,
        /// Decision threshold.
        max: f64,
    },

    /// Failure threshold of zero would stop before the first cycle.
    #[error("failure threshold must be at least 1")]
    ZeroFailureThreshold,
}

/// Immutable settings for one worker run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Tag that marks items awaiting enrichment.
    pub backlog_tag: String,
    /// Tags added to every processed item.
    pub extra_tags: Vec<String>,
    /// Keep the item's existing tags alongside `extra_tags`.
    pub append_existing_tags: bool,
    /// Rehost the image before searching.
    pub upload: bool,
    /// Recompress to WebP before rehosting.
    pub compress: bool,
    /// Replace an existing source.
    pub override_source: bool,
    /// Tag unresolved items with `meta:unknown`.
    pub mark_unknown: bool,
    /// Consecutive failed cycles before giving up.
    pub failure_threshold: u32,
    /// Pause after every cycle.
    pub cooldown: Duration,
    /// Similarity thresholds.
    pub thresholds: Thresholds,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            backlog_tag: DEFAULT_BACKLOG_TAG.to_string(),
            extra_tags: Vec::new(),
            append_existing_tags: false,
            upload: false,
            compress: false,
            override_source: false,
            mark_unknown: false,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
            thresholds: Thresholds::default(),
        }
    }
}

impl RunConfig {
    /// Checks the configuration for values the worker cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tag = self.backlog_tag.as_str();
        if tag.is_empty() || tag.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidBacklogTag {
                tag: tag.to_string(),
            });
        }

        for (name, value) in [
            ("max", self.thresholds.max_similarity),
            ("min", self.thresholds.min_similarity),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if self.thresholds.min_similarity >= self.thresholds.max_similarity {
            return Err(ConfigError::ThresholdOrder {
                min: self.thresholds.min_similarity,
                max: self.thresholds.max_similarity,
            });
        }

        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        Ok(())
    }

    /// Engine options derived from this configuration.
    #[must_use]
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            backlog_tag: self.backlog_tag.clone(),
            mark_unknown: self.mark_unknown,
        }
    }
}
