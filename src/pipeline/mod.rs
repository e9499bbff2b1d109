//! Pipeline Coordinator
//!
//! Runs the pass/strategy loop for a single document and assembles the
//! [`EnhancementResult`]. See [`coordinator::Coordinator`] for the
//! algorithm; this module just owns the result/termination shapes shared
//! with the batch executor and the reporter.

mod coordinator;

pub use coordinator::Coordinator;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Threshold,
    Cost,
    Degradation,
    Plateau,
    MaxPasses,
    NoStrategies,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TerminationReason::Threshold => "threshold",
            TerminationReason::Cost => "cost",
            TerminationReason::Degradation => "degradation",
            TerminationReason::Plateau => "plateau",
            TerminationReason::MaxPasses => "max_passes",
            TerminationReason::NoStrategies => "no_strategies",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Improvement {
    pub strategy: String,
    pub description: String,
    pub quality_delta: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementResult {
    pub original_content: String,
    pub enhanced_content: String,
    pub improvements: Vec<Improvement>,
    pub quality_before: f64,
    pub quality_after: f64,
    pub improvement_percentage: f64,
    pub strategies_applied: Vec<String>,
    pub total_cost: f64,
    pub processing_time_ms: u64,
    pub passes_executed: u32,
    pub success: bool,
    pub errors: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub measured_at: DateTime<Utc>,
}

impl EnhancementResult {
    /// A no-op result: nothing was enhanced, content passed through
    /// unchanged. Used for cache-test fixtures and as a safe fallback when
    /// the coordinator can't proceed (e.g. `max_passes == 0`).
    pub fn empty(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            original_content: content.clone(),
            enhanced_content: content,
            improvements: Vec::new(),
            quality_before: 0.0,
            quality_after: 0.0,
            improvement_percentage: 0.0,
            strategies_applied: Vec::new(),
            total_cost: 0.0,
            processing_time_ms: 0,
            passes_executed: 0,
            success: true,
            errors: Vec::new(),
            metadata: HashMap::new(),
            measured_at: Utc::now(),
        }
    }
}
