//! LLM Capability Abstraction
//!
//! Defines the `LlmCapability` trait that every strategy's LLM-backed step
//! calls through. The pipeline never talks to a live model directly; it
//! depends on this trait the same way strategies are opaque transformers.
//!
//! ## Modules
//!
//! - `chain`: fallback provider chain with cascading attempts
//! - `circuit_breaker`: circuit breaker pattern for provider resilience
//! - `rate_limiter`: per-provider token-bucket rate limiting
//! - `local`: zero-cost stub/local provider used by tests and offline runs
//! - `remote`: HTTP-shaped provider demonstrating a real backend integration point
//! - `timeout`: unified timeout helpers

pub mod chain;
pub mod circuit_breaker;
pub mod local;
pub mod rate_limiter;
pub mod remote;
pub mod timeout;

pub use chain::{ChainConfig, ChainedProvider, ProviderChain, ProviderChainBuilder};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use local::LocalProvider;
pub use rate_limiter::RateLimiter;
pub use remote::RemoteProvider;

pub use crate::error::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;

// =============================================================================
// Generation Options
// =============================================================================

/// Per-call generation knobs. Strategies populate this from `StrategyConfig`
/// and `Settings.llm`; the capability is free to ignore fields it doesn't
/// support (a local stub has no notion of temperature).
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: usize,
    /// Short label identifying the calling strategy, used for cost attribution.
    pub strategy: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
            strategy: None,
        }
    }
}

// =============================================================================
// LLM Response with Usage Metrics
// =============================================================================

/// Complete LLM response including content, usage metrics, and provider identity.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub timing: ResponseTiming,
    pub metadata: ResponseMetadata,
}

impl LlmResponse {
    pub fn new(content: impl Into<String>, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
            timing: ResponseTiming::default(),
            metadata: ResponseMetadata {
                provider: provider.into(),
                model: model.into(),
            },
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_timing(mut self, timing: ResponseTiming) -> Self {
        self.timing = timing;
        self
    }
}

/// Token usage metrics for cost tracking
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Approximate token counts from character lengths using the
    /// chars-per-token heuristic shared with the cost model.
    pub fn estimate(input_chars: usize, output_chars: usize) -> Self {
        let per_token = crate::constants::budget::CHARS_PER_TOKEN;
        Self {
            input_tokens: (input_chars as f64 / per_token).ceil() as u32,
            output_tokens: (output_chars as f64 / per_token).ceil() as u32,
        }
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: std::time::Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

/// Response metadata
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    pub model: String,
    pub provider: String,
}

/// Shared LLM capability handle for concurrent access across strategies.
pub type SharedProvider = Arc<dyn LlmCapability + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for a single LLM provider entry in the chain.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider kind: "local", "remote"
    pub provider: String,
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_max_tokens() -> usize {
    4096
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: None,
            timeout_secs: 300,
            temperature: 0.7,
            api_key: None,
            api_base: None,
            max_tokens: 4096,
        }
    }
}

// =============================================================================
// LLM Capability Trait
// =============================================================================

/// The external generation surface every strategy calls through.
#[async_trait]
pub trait LlmCapability: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<LlmResponse>;

    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared capability from configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "local" => Ok(Arc::new(LocalProvider::new(config.clone()))),
        "remote" => Ok(Arc::new(RemoteProvider::new(config.clone())?)),
        other => Err(crate::error::EnhanceError::config(format!(
            "unknown provider '{other}', supported: local, remote"
        ))),
    }
}
