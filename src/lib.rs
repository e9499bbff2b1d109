//! Document Enhancer - an iterative, multi-strategy document quality pipeline.
//!
//! A document is repeatedly scored and passed through a small set of named
//! strategies (clarity, completeness, consistency, accuracy, readability)
//! until it clears a quality threshold, stops improving, or runs out of
//! passes or budget. Every step is logged as a version so a run can be
//! rolled back or diffed.
//!
//! ## Modules
//!
//! - [`document`]: the unit of work
//! - [`quality`]: five-dimension quality scoring
//! - [`strategy`]: the strategy registry and its concrete implementations
//! - [`config`]: mode profiles and layered settings
//! - [`cost`]: pricing model and budget guard
//! - [`history`]: per-document version history and rollback
//! - [`cache`]: content-addressed result cache
//! - [`pipeline`]: the pass/strategy coordinator
//! - [`batch`]: bounded-parallelism execution over many documents
//! - [`report`]: per-document and process-wide reporting
//! - [`llm`]: LLM provider abstraction used by strategies' enhance step
//! - [`cli`]: the `enhance` binary's subcommands

pub mod batch;
pub mod cache;
pub mod capability;
pub mod cli;
pub mod config;
pub mod constants;
pub mod cost;
pub mod document;
pub mod error;
pub mod hashutil;
pub mod history;
pub mod llm;
pub mod pipeline;
pub mod quality;
pub mod report;
pub mod strategy;
pub mod textutil;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{ConfigLoader, Mode, Settings};
pub use document::Document;
pub use error::{EnhanceError, Result};

pub use batch::BatchExecutor;
pub use cache::{CacheKey, ResultCache};
pub use cost::CostModel;
pub use history::VersionHistory;
pub use pipeline::{Coordinator, EnhancementResult, TerminationReason};
pub use quality::QualityMetrics;
pub use report::{ImprovementReport, MetricsCollector, SharedMetrics};
pub use strategy::{StrategyKind, StrategyRegistry};
