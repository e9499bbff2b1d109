//! Fallback Provider Chain with Circuit Breaker
//!
//! Cascading provider attempts with intelligent routing and resilience patterns.
//!
//! ## Strategy
//!
//! 1. Check circuit breaker state
//! 2. Try provider if circuit is closed/half-open
//! 3. On failure, classify error and update circuit breaker
//! 4. If rate-limited, use retry-after from response
//! 5. If fallback-eligible, try next provider
//! 6. Continue until success or all providers exhausted

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use dashmap::DashMap;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::constants::chain as chain_constants;

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use super::{GenerationOptions, LlmCapability, LlmResponse, ProviderConfig, SharedProvider};
use crate::error::{EnhanceError, ErrorCategory, ErrorClassifier, LlmError, Result};

/// Provider with metadata for chain routing
#[derive(Clone)]
pub struct ChainedProvider {
    pub provider: SharedProvider,
    pub priority: u8,
    pub max_retries: u8,
}

impl ChainedProvider {
    pub fn new(provider: SharedProvider) -> Self {
        Self {
            provider,
            priority: 100,
            max_retries: chain_constants::DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }
}

/// Configuration for the provider chain
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub max_total_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f32,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_total_attempts: chain_constants::MAX_TOTAL_ATTEMPTS,
            base_delay: Duration::from_millis(chain_constants::BASE_DELAY_MS),
            max_delay: Duration::from_secs(chain_constants::MAX_DELAY_SECS),
            backoff_factor: chain_constants::BACKOFF_FACTOR,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Result of a single chain attempt
#[derive(Debug)]
pub struct ChainAttemptResult {
    pub provider_name: String,
    pub attempt_number: usize,
    pub success: bool,
    pub error: Option<LlmError>,
    pub duration_ms: u64,
    pub circuit_state: CircuitState,
}

/// Execution statistics for the chain
#[derive(Debug, Default)]
pub struct ChainStats {
    pub total_attempts: usize,
    pub successful_provider: Option<String>,
    pub attempts: Vec<ChainAttemptResult>,
    pub total_duration_ms: u64,
    pub providers_skipped_circuit_open: usize,
}

/// Fallback provider chain with per-provider circuit breakers.
///
/// Uses `DashMap` for lock-free concurrent access to circuit breakers, the
/// same discipline used for the global cost model's per-provider tallies.
pub struct ProviderChain {
    providers: Vec<ChainedProvider>,
    config: ChainConfig,
    circuit_breakers: Arc<DashMap<String, CircuitBreaker>>,
}

impl ProviderChain {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            providers: Vec::new(),
            config,
            circuit_breakers: Arc::new(DashMap::new()),
        }
    }

    pub fn add_provider(mut self, provider: ChainedProvider) -> Self {
        self.providers.push(provider);
        self
    }

    /// Build a chain from raw provider configs, in priority order.
    pub fn from_configs(configs: &[ProviderConfig], chain_config: ChainConfig) -> Result<Self> {
        let mut chain = Self::new(chain_config);
        for (idx, config) in configs.iter().enumerate() {
            let provider = super::create_provider(config)?;
            chain.providers.push(ChainedProvider::new(provider).with_priority(idx as u8));
        }
        Ok(chain)
    }

    pub fn optimize_for_priority(&mut self) {
        self.providers.sort_by_key(|p| p.priority);
    }

    /// Execute with fallback chain and circuit breakers.
    #[instrument(skip(self, prompt, options), fields(providers = self.providers.len()))]
    pub async fn execute(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<(LlmResponse, ChainStats)> {
        let mut stats = ChainStats::default();
        let start_time = std::time::Instant::now();

        if self.providers.is_empty() {
            return Err(EnhanceError::config("no providers configured in chain"));
        }

        for provider_entry in &self.providers {
            let name = provider_entry.provider.name();
            self.circuit_breakers
                .entry(name.to_string())
                .or_insert_with(|| CircuitBreaker::new(name, self.config.circuit_breaker.clone()));
        }

        let mut last_error: Option<EnhanceError> = None;

        for provider_entry in &self.providers {
            let mut backoff = ExponentialBuilder::default()
                .with_min_delay(self.config.base_delay)
                .with_max_delay(self.config.max_delay)
                .with_factor(self.config.backoff_factor)
                .with_jitter()
                .build();
            let provider = &provider_entry.provider;
            let provider_name = provider.name().to_string();

            let circuit_state = self
                .circuit_breakers
                .get(&provider_name)
                .map(|cb| cb.state())
                .unwrap_or(CircuitState::Closed);

            if circuit_state == CircuitState::Open {
                debug!(provider = %provider_name, "skipping provider, circuit open");
                stats.providers_skipped_circuit_open += 1;
                continue;
            }

            for attempt in 1..=provider_entry.max_retries {
                if stats.total_attempts >= self.config.max_total_attempts {
                    break;
                }

                let allow = self
                    .circuit_breakers
                    .get(&provider_name)
                    .map(|cb| cb.allow_request())
                    .unwrap_or(true);

                if !allow {
                    debug!(provider = %provider_name, "circuit breaker blocked request");
                    break;
                }

                stats.total_attempts += 1;
                let attempt_start = std::time::Instant::now();

                match provider.generate(prompt, options).await {
                    Ok(response) => {
                        let duration_ms = attempt_start.elapsed().as_millis() as u64;

                        if let Some(cb) = self.circuit_breakers.get(&provider_name) {
                            cb.record_success();
                        }
                        let current_state = self
                            .circuit_breakers
                            .get(&provider_name)
                            .map(|cb| cb.state())
                            .unwrap_or(CircuitState::Closed);

                        stats.attempts.push(ChainAttemptResult {
                            provider_name: provider_name.clone(),
                            attempt_number: attempt as usize,
                            success: true,
                            error: None,
                            duration_ms,
                            circuit_state: current_state,
                        });
                        stats.successful_provider = Some(provider_name);
                        stats.total_duration_ms = start_time.elapsed().as_millis() as u64;

                        info!(
                            provider = %stats.successful_provider.as_deref().unwrap_or("unknown"),
                            attempts = stats.total_attempts,
                            "chain succeeded"
                        );

                        return Ok((response, stats));
                    }
                    Err(err) => {
                        let classified = ErrorClassifier::classify(&err.to_string(), &provider_name);
                        let duration_ms = attempt_start.elapsed().as_millis() as u64;

                        if let Some(cb) = self.circuit_breakers.get(&provider_name) {
                            cb.record_failure();
                        }
                        let current_state = self
                            .circuit_breakers
                            .get(&provider_name)
                            .map(|cb| cb.state())
                            .unwrap_or(CircuitState::Closed);

                        stats.attempts.push(ChainAttemptResult {
                            provider_name: provider_name.clone(),
                            attempt_number: attempt as usize,
                            success: false,
                            error: Some(classified.clone()),
                            duration_ms,
                            circuit_state: current_state,
                        });

                        warn!(
                            provider = %provider_name,
                            attempt = attempt,
                            ?current_state,
                            category = %classified.category,
                            "provider failed"
                        );

                        last_error = Some(err);

                        if current_state == CircuitState::Open {
                            info!(provider = %provider_name, "circuit opened, moving to next provider");
                            break;
                        }

                        match classified.category {
                            ErrorCategory::Auth => {
                                info!(provider = %provider_name, "auth error, trying next provider");
                                break;
                            }
                            ErrorCategory::TokenLimit => {
                                info!(provider = %provider_name, "token limit, trying next provider");
                                break;
                            }
                            ErrorCategory::BadRequest => {
                                warn!("bad request error, stopping chain");
                                stats.total_duration_ms = start_time.elapsed().as_millis() as u64;
                                return Err(last_error
                                    .unwrap_or_else(|| EnhanceError::config("bad request with unknown error")));
                            }
                            ErrorCategory::RateLimit => {
                                let wait = classified.retry_after.unwrap_or_else(|| {
                                    parse_rate_limit_delay(&classified.message)
                                        .unwrap_or(Duration::from_secs(30))
                                });
                                info!(wait_secs = wait.as_secs(), "rate limited, waiting before retry");
                                sleep(wait).await;
                            }
                            ErrorCategory::Network | ErrorCategory::Transient => {
                                if attempt < provider_entry.max_retries {
                                    let delay = backoff.next().unwrap_or(self.config.base_delay);
                                    debug!(delay_ms = delay.as_millis(), "retrying after backoff");
                                    sleep(delay).await;
                                }
                            }
                            ErrorCategory::ParseError => {
                                if attempt < provider_entry.max_retries {
                                    sleep(classified.recommended_delay()).await;
                                }
                            }
                            ErrorCategory::Unavailable => {
                                info!(provider = %provider_name, "provider unavailable, trying next");
                                break;
                            }
                            ErrorCategory::Unknown => {
                                if attempt < provider_entry.max_retries {
                                    let delay = backoff.next().unwrap_or(self.config.base_delay);
                                    sleep(delay).await;
                                }
                            }
                        }
                    }
                }
            }
        }

        stats.total_duration_ms = start_time.elapsed().as_millis() as u64;

        Err(last_error.unwrap_or_else(|| EnhanceError::config("all providers in chain failed")))
    }

    pub fn circuit_breaker_stats(&self) -> Vec<super::circuit_breaker::CircuitBreakerStats> {
        self.circuit_breakers.iter().map(|entry| entry.value().stats()).collect()
    }

    pub fn reset_circuit_breakers(&self) {
        for entry in self.circuit_breakers.iter() {
            entry.value().reset();
        }
    }

    pub fn circuit_state(&self, provider_name: &str) -> Option<CircuitState> {
        self.circuit_breakers.get(provider_name).map(|cb| cb.state())
    }
}

impl Clone for ProviderChain {
    fn clone(&self) -> Self {
        Self {
            providers: self.providers.clone(),
            config: self.config.clone(),
            circuit_breakers: Arc::clone(&self.circuit_breakers),
        }
    }
}

#[async_trait]
impl LlmCapability for ProviderChain {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<LlmResponse> {
        let (response, _stats) = self.execute(prompt, options).await?;
        Ok(response)
    }

    fn name(&self) -> &str {
        "provider-chain"
    }

    fn model(&self) -> &str {
        self.providers.first().map(|p| p.provider.model()).unwrap_or("unknown")
    }

    async fn health_check(&self) -> Result<bool> {
        for provider in &self.providers {
            if provider.provider.health_check().await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn parse_rate_limit_delay(message: &str) -> Option<Duration> {
    let lower = message.to_lowercase();

    if let Some(idx) = lower.find("retry") {
        let after_retry = &lower[idx..];
        for word in after_retry.split_whitespace() {
            if let Ok(secs) = word.parse::<u64>() {
                return Some(Duration::from_secs(secs.min(300)));
            }
        }
    }

    for pattern in &["wait ", "in "] {
        if let Some(idx) = lower.find(pattern) {
            let after_pattern = &lower[idx + pattern.len()..];
            for word in after_pattern.split_whitespace() {
                if let Ok(secs) = word.parse::<u64>() {
                    return Some(Duration::from_secs(secs.min(300)));
                }
            }
        }
    }

    None
}

/// Builder for creating provider chains
pub struct ProviderChainBuilder {
    providers: Vec<ChainedProvider>,
    config: ChainConfig,
}

impl ProviderChainBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            config: ChainConfig::default(),
        }
    }

    pub fn add_provider(mut self, provider: impl LlmCapability + 'static) -> Self {
        let chained = ChainedProvider::new(Arc::new(provider)).with_priority(self.providers.len() as u8);
        self.providers.push(chained);
        self
    }

    pub fn add_shared(mut self, provider: SharedProvider) -> Self {
        let chained = ChainedProvider::new(provider).with_priority(self.providers.len() as u8);
        self.providers.push(chained);
        self
    }

    pub fn add_with_config(mut self, provider: ChainedProvider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.config.circuit_breaker = config;
        self
    }

    pub fn build(self) -> ProviderChain {
        ProviderChain {
            providers: self.providers,
            config: self.config,
            circuit_breakers: Arc::new(DashMap::new()),
        }
    }
}

impl Default for ProviderChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockProvider {
        name: String,
        should_fail: bool,
        fail_count: std::sync::atomic::AtomicU32,
        max_failures: u32,
    }

    impl MockProvider {
        fn new(name: &str, should_fail: bool) -> Self {
            Self {
                name: name.to_string(),
                should_fail,
                fail_count: std::sync::atomic::AtomicU32::new(0),
                max_failures: 2,
            }
        }

        fn failing_then_success(name: &str, failures: u32) -> Self {
            Self {
                name: name.to_string(),
                should_fail: true,
                fail_count: std::sync::atomic::AtomicU32::new(0),
                max_failures: failures,
            }
        }
    }

    #[async_trait]
    impl LlmCapability for MockProvider {
        async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<LlmResponse> {
            if self.should_fail {
                let count = self.fail_count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if count < self.max_failures {
                    return Err(EnhanceError::config(format!("{} transient error", self.name)));
                }
            }
            Ok(LlmResponse::new(format!("ok from {}", self.name), self.name.clone(), "mock-model"))
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(!self.should_fail)
        }
    }

    #[tokio::test]
    async fn chain_succeeds_on_first_provider() {
        let chain = ProviderChainBuilder::new()
            .add_provider(MockProvider::new("primary", false))
            .add_provider(MockProvider::new("fallback", false))
            .build();

        let result = chain.generate("test", &GenerationOptions::default()).await;
        assert!(result.unwrap().content.contains("primary"));
    }

    #[tokio::test]
    async fn chain_falls_back_on_failure() {
        let always_fail = MockProvider {
            name: "primary".to_string(),
            should_fail: true,
            fail_count: std::sync::atomic::AtomicU32::new(0),
            max_failures: 100,
        };

        let chain = ProviderChainBuilder::new()
            .add_provider(always_fail)
            .add_provider(MockProvider::new("fallback", false))
            .with_config(ChainConfig {
                max_total_attempts: 10,
                circuit_breaker: CircuitBreakerConfig {
                    failure_threshold: 5,
                    ..Default::default()
                },
                ..Default::default()
            })
            .build();

        let (response, stats) = chain.execute("test", &GenerationOptions::default()).await.unwrap();

        assert!(response.content.contains("fallback"));
        assert!(stats.total_attempts > 1);
    }

    #[tokio::test]
    async fn chain_retries_then_succeeds() {
        let chain = ProviderChainBuilder::new()
            .add_provider(MockProvider::failing_then_success("flaky", 2))
            .build();

        let (response, stats) = chain.execute("test", &GenerationOptions::default()).await.unwrap();

        assert!(response.content.contains("flaky"));
        assert_eq!(stats.total_attempts, 3);
    }

    #[test]
    fn parse_rate_limit_delay_extracts_seconds() {
        let msg1 = "Rate limit exceeded. Please retry after 30 seconds.";
        assert_eq!(parse_rate_limit_delay(msg1), Some(Duration::from_secs(30)));

        let msg2 = "Too many requests. Please wait 60 seconds before trying again.";
        assert_eq!(parse_rate_limit_delay(msg2), Some(Duration::from_secs(60)));

        let msg3 = "Retry after 1000 seconds";
        assert_eq!(parse_rate_limit_delay(msg3), Some(Duration::from_secs(300)));

        let msg4 = "Rate limit exceeded";
        assert_eq!(parse_rate_limit_delay(msg4), None);
    }

    #[test]
    fn exponential_backoff_stays_within_configured_bounds() {
        let mut backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(5))
            .with_factor(2.0)
            .with_jitter()
            .build();

        for _ in 0..6 {
            let delay = backoff.next().expect("backoff iterator should keep yielding");
            assert!(delay <= Duration::from_secs(5));
        }
    }
}
