//! Strategy Registry
//!
//! Strategies are values, not a class hierarchy: each implements the same
//! small async contract and is looked up by [`StrategyKind`] from a
//! [`StrategyRegistry`] built once at startup. Every strategy degrades to a
//! local, non-LLM transform when no [`crate::llm::LlmCapability`] is
//! available or the caller passes `None`.

mod accuracy;
mod clarity;
mod completeness;
mod consistency;
mod readability;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::llm::SharedProvider;

/// Which enhancement dimension a strategy targets. `All` is a planning
/// sentinel only - never dispatched to a concrete implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Clarity,
    Completeness,
    Consistency,
    Accuracy,
    Readability,
    All,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Clarity => "clarity",
            StrategyKind::Completeness => "completeness",
            StrategyKind::Consistency => "consistency",
            StrategyKind::Accuracy => "accuracy",
            StrategyKind::Readability => "readability",
            StrategyKind::All => "all",
        }
    }

    /// The five concrete strategies, in a stable enum-declaration order used
    /// to break priority ties.
    pub fn all() -> Vec<StrategyKind> {
        vec![
            StrategyKind::Clarity,
            StrategyKind::Completeness,
            StrategyKind::Consistency,
            StrategyKind::Accuracy,
            StrategyKind::Readability,
        ]
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-strategy tuning, one entry per [`StrategyKind`] inside
/// [`crate::config::Settings`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
    #[serde(default)]
    pub llm_provider: Option<String>,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
}

fn default_true() -> bool {
    true
}

fn default_max_iterations() -> u32 {
    1
}

fn default_quality_threshold() -> f64 {
    0.8
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 0,
            max_iterations: default_max_iterations(),
            quality_threshold: default_quality_threshold(),
            llm_provider: None,
            parameters: HashMap::new(),
        }
    }
}

/// The contract every enhancement strategy implements. `enhance` must never
/// panic or leave `content` worse than returning it unchanged: callers treat
/// a strategy error as contained and fall back to the pre-strategy content.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Cheap local analysis used for logging/diagnostics, never for scoring.
    fn analyze(&self, content: &str) -> HashMap<String, Value>;

    /// Produce improved content. `llm` is `None` when no provider is
    /// configured or the budget guard denied the call; implementations must
    /// fall back to a deterministic local transform in that case.
    async fn enhance(
        &self,
        content: &str,
        config: &StrategyConfig,
        llm: Option<&SharedProvider>,
    ) -> Result<String>;
}

pub type SharedStrategy = std::sync::Arc<dyn Strategy>;

/// Owns one instance of each concrete strategy, looked up by kind.
pub struct StrategyRegistry {
    strategies: HashMap<StrategyKind, SharedStrategy>,
}

impl StrategyRegistry {
    pub fn with_defaults() -> Self {
        let mut strategies: HashMap<StrategyKind, SharedStrategy> = HashMap::new();
        strategies.insert(StrategyKind::Clarity, std::sync::Arc::new(clarity::ClarityStrategy));
        strategies.insert(
            StrategyKind::Completeness,
            std::sync::Arc::new(completeness::CompletenessStrategy),
        );
        strategies.insert(
            StrategyKind::Consistency,
            std::sync::Arc::new(consistency::ConsistencyStrategy),
        );
        strategies.insert(StrategyKind::Accuracy, std::sync::Arc::new(accuracy::AccuracyStrategy));
        strategies.insert(
            StrategyKind::Readability,
            std::sync::Arc::new(readability::ReadabilityStrategy),
        );
        Self { strategies }
    }

    pub fn get(&self, kind: StrategyKind) -> Option<SharedStrategy> {
        self.strategies.get(&kind).cloned()
    }

    pub fn register(&mut self, kind: StrategyKind, strategy: SharedStrategy) {
        self.strategies.insert(kind, strategy);
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_all_five_concrete_strategies() {
        let registry = StrategyRegistry::with_defaults();
        for kind in StrategyKind::all() {
            assert!(registry.get(kind).is_some(), "missing strategy for {kind}");
        }
    }

    #[test]
    fn all_excludes_the_sentinel() {
        assert!(!StrategyKind::all().contains(&StrategyKind::All));
    }
}
