//! Metamaster Core Library
//!
//! This library enriches catalog posts that carry a backlog tag with tags,
//! a source link and a rating found through reverse image search.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`catalog`] - Catalog gateway trait and the Shimmie2 GraphQL client
//! - [`oracle`] - Reverse search trait and the SauceNAO client
//! - [`extractor`] - Site metadata extractors and their priority registry
//! - [`engine`] - Tiered resolution of candidates into one decision
//! - [`transfer`] - Download, WebP recompression and rehosting
//! - [`worker`] - Sequential worker loop with a failure budget
//! - [`config`] - Validated run configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod config;
pub mod engine;
pub mod extractor;
pub mod http_client;
pub mod oracle;
pub mod transfer;
mod user_agent;
pub mod worker;

// Re-export commonly used types
pub use catalog::{
    CatalogError, CatalogGateway, PostUpdate, Session, ShimmieGateway, UpdatedPost, WorkItem,
};
pub use config::{ConfigError, RunConfig};
pub use engine::{
    DecisionTier, MetadataDecision, ResolveOptions, SENTINEL_TAG, Thresholds, UNKNOWN_TAG, resolve,
};
pub use extractor::{
    ExtractOutcome, Extractor, ExtractorCredentials, ExtractorError, ExtractorRegistry,
    MetadataResult, Rating, SiteId, build_default_extractor_registry,
};
pub use http_client::configure_http_timeouts;
pub use oracle::{CandidateMatch, ReverseSearchOracle, SauceNaoOracle, SearchError};
pub use transfer::{ChibisafeTransfer, ImageTransfer, TransferError};
pub use worker::{CycleState, RunSummary, TerminationCause, Worker, WorkerError};
