use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, ResultCache};
use crate::capability::{SharedEntropyCapability, SharedQualityCapability, SharedResultStore};
use crate::config::{PipelineConfig, Settings};
use crate::cost::CostModel;
use crate::document::Document;
use crate::error::Result;
use crate::history::{RollbackTarget, VersionHistory};
use crate::llm::{RateLimiter, SharedProvider};
use crate::quality::{self, QualityMetrics};
use crate::strategy::{StrategyConfig, StrategyKind, StrategyRegistry};

use super::{EnhancementResult, Improvement, TerminationReason};

/// Runs the pass/strategy loop for one document at a time. One
/// `Coordinator` can be shared (it is `Send + Sync`) across concurrently
/// enhanced documents; the mutable state it touches (history, cache, cost
/// model) is internally synchronized.
pub struct Coordinator {
    strategies: Arc<StrategyRegistry>,
    history: Arc<VersionHistory>,
    cost_model: Arc<CostModel>,
    cache: Option<Arc<ResultCache>>,
    llm: Option<SharedProvider>,
    rate_limiter: Option<RateLimiter>,
    entropy: Option<SharedEntropyCapability>,
    quality_capability: Option<SharedQualityCapability>,
    result_store: Option<SharedResultStore>,
    pipeline: PipelineConfig,
    strategy_configs: HashMap<String, StrategyConfig>,
}

impl Coordinator {
    pub fn new(
        settings: &Settings,
        strategies: Arc<StrategyRegistry>,
        history: Arc<VersionHistory>,
        cost_model: Arc<CostModel>,
        cache: Option<Arc<ResultCache>>,
        llm: Option<SharedProvider>,
    ) -> Self {
        let rate_limiter = llm
            .as_ref()
            .map(|provider| RateLimiter::new(provider.name(), settings.llm.rate_limit_per_minute));
        Self {
            strategies,
            history,
            cost_model,
            cache,
            llm,
            rate_limiter,
            entropy: None,
            quality_capability: None,
            result_store: None,
            pipeline: settings.pipeline.clone(),
            strategy_configs: settings.strategies.clone(),
        }
    }

    pub fn with_entropy_capability(mut self, capability: SharedEntropyCapability) -> Self {
        self.entropy = Some(capability);
        self
    }

    pub fn with_quality_capability(mut self, capability: SharedQualityCapability) -> Self {
        self.quality_capability = Some(capability);
        self
    }

    pub fn with_result_store(mut self, store: SharedResultStore) -> Self {
        self.result_store = Some(store);
        self
    }

    async fn measure(&self, content: &str) -> QualityMetrics {
        if let Some(capability) = &self.quality_capability {
            match capability.analyze(content).await {
                Ok(metrics) => return metrics,
                Err(e) => warn!(error = %e, "quality capability failed, falling back to local scorer"),
            }
        }
        quality::score(content)
    }

    fn document_id(&self, document: &Document) -> String {
        document
            .metadata
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| crate::hashutil::sha256_hex(document.content.as_bytes())[..16].to_string())
    }

    fn canonical_config(&self) -> String {
        serde_json::to_string(&self.pipeline).unwrap_or_default()
    }

    /// Enabled strategies sorted by ascending priority; ties break on
    /// `StrategyKind::all()` declaration order, which is itself stable.
    fn strategy_plan(&self) -> Vec<(StrategyKind, StrategyConfig)> {
        let mut plan: Vec<(StrategyKind, StrategyConfig)> = StrategyKind::all()
            .into_iter()
            .filter_map(|kind| {
                self.strategy_configs
                    .get(kind.as_str())
                    .filter(|cfg| cfg.enabled)
                    .map(|cfg| (kind, cfg.clone()))
            })
            .collect();
        plan.sort_by_key(|(_, cfg)| cfg.priority);
        plan
    }

    /// Bounds the whole pass/strategy loop by `pipeline.timeout`; a document
    /// that overruns the deadline comes back as a failed result rather than
    /// an error the caller has to unwrap.
    pub async fn enhance(&self, document: &Document) -> Result<EnhancementResult> {
        match crate::llm::timeout::with_timeout(self.pipeline.timeout, self.enhance_inner(document), "enhance").await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(document_id = %self.document_id(document), timeout = ?self.pipeline.timeout, "document enhancement timed out");
                Ok(EnhancementResult {
                    success: false,
                    errors: vec![e.tag()],
                    ..EnhancementResult::empty(&document.content)
                })
            }
        }
    }

    async fn enhance_inner(&self, document: &Document) -> Result<EnhancementResult> {
        let start = Instant::now();
        let document_id = self.document_id(document);
        let canonical_config = self.canonical_config();

        if self.pipeline.cache_enabled {
            if let Some(cache) = &self.cache {
                let key = CacheKey::new(&document.content, &canonical_config);
                if let Some(mut cached) = cache.get(&key) {
                    debug!(document_id = %document_id, "cache hit");
                    cached.metadata.insert("cache_hit".to_string(), json!(true));
                    return Ok(cached);
                }
            }
        }

        let q0 = self.measure(&document.content).await;
        self.history.add_version(&document_id, &document.content, q0.overall, None, "original");

        let plan = self.strategy_plan();
        if plan.is_empty() {
            let result = EnhancementResult {
                original_content: document.content.clone(),
                enhanced_content: document.content.clone(),
                quality_before: q0.overall,
                quality_after: q0.overall,
                processing_time_ms: start.elapsed().as_millis() as u64,
                ..EnhancementResult::empty(&document.content)
            };
            return Ok(result);
        }

        let mut content = document.content.clone();
        let mut current_quality = q0.clone();
        let mut total_cost = 0.0_f64;
        let mut improvements = Vec::new();
        let mut strategies_applied = Vec::new();
        let mut errors = Vec::new();
        let mut passes_executed = 0;
        let mut termination = TerminationReason::MaxPasses;
        let mut degraded_rollback = false;

        'passes: for pass in 1..=self.pipeline.max_passes {
            if current_quality.overall >= self.pipeline.quality_threshold {
                termination = TerminationReason::Threshold;
                break;
            }
            if total_cost >= self.pipeline.max_cost_per_document {
                termination = TerminationReason::Cost;
                break;
            }

            passes_executed = pass;
            let quality_before_pass = current_quality.overall;
            let provider_name = self.llm.as_ref().map(|p| p.name()).unwrap_or("local");
            let model_name = self.llm.as_ref().map(|p| p.model()).unwrap_or("local-echo");

            for (kind, strategy_config) in &plan {
                let estimate = self.cost_model.estimate(content.len(), Some(*kind), provider_name, model_name);
                if !self.cost_model.may_spend(estimate) {
                    warn!(strategy = %kind, "budget guard denied strategy, skipping");
                    errors.push(format!("budget:{kind}"));
                    continue;
                }

                let strategy = match self.strategies.get(*kind) {
                    Some(s) => s,
                    None => continue,
                };

                if let Some(limiter) = &self.rate_limiter {
                    if let Err(e) = limiter.acquire().await {
                        warn!(strategy = %kind, "rate limit exceeded, skipping");
                        errors.push(format!("strategy:{kind}:{}", e.tag()));
                        continue;
                    }
                }

                let quality_before_strategy = current_quality.overall;
                match strategy.enhance(&content, strategy_config, self.llm.as_ref()).await {
                    Ok(enhanced) => {
                        content = enhanced;
                        current_quality = self.measure(&content).await;
                        total_cost += estimate;
                        let tokens_used = (content.len() as f64 / crate::constants::budget::CHARS_PER_TOKEN) as u64;
                        self.cost_model.record(estimate, tokens_used, provider_name, model_name, *kind);
                        self.history.add_version(
                            &document_id,
                            &content,
                            current_quality.overall,
                            Some(kind.as_str().to_string()),
                            format!("applied {kind}"),
                        );
                        strategies_applied.push(kind.as_str().to_string());
                        improvements.push(Improvement {
                            strategy: kind.as_str().to_string(),
                            description: format!("{kind} pass {pass}"),
                            quality_delta: current_quality.overall - quality_before_strategy,
                        });
                        info!(strategy = %kind, pass, quality = current_quality.overall, "strategy applied");
                    }
                    Err(e) => {
                        warn!(strategy = %kind, error = %e, "strategy failed, continuing");
                        errors.push(format!("strategy:{kind}:{}", e.tag()));
                    }
                }
            }

            let pass_delta = current_quality.overall - quality_before_pass;
            let epsilon = self.pipeline.improvement_threshold / crate::constants::pipeline::DEGRADATION_DIVISOR;

            if pass_delta < -epsilon && self.pipeline.rollback_on_degradation {
                if let Some(rolled_back) = self.history.rollback(&document_id, RollbackTarget::Previous) {
                    content = rolled_back.content;
                    current_quality = self.measure(&content).await;
                    degraded_rollback = true;
                }
                termination = TerminationReason::Degradation;
                break 'passes;
            }

            if (0.0..self.pipeline.improvement_threshold).contains(&pass_delta) {
                termination = TerminationReason::Plateau;
                break 'passes;
            }

            if self.pipeline.use_entropy_optimizer {
                if let Some(entropy) = &self.entropy {
                    match entropy.optimize(&content, self.pipeline.quality_threshold).await {
                        Ok(optimized) => {
                            content = optimized;
                            current_quality = self.measure(&content).await;
                            self.history.add_version(
                                &document_id,
                                &content,
                                current_quality.overall,
                                Some("entropy".to_string()),
                                "entropy optimization pass",
                            );
                        }
                        Err(e) => {
                            warn!(error = %e, "entropy optimizer failed, continuing without it");
                            errors.push(format!("entropy:{}", e.tag()));
                        }
                    }
                }
            }
        }

        let improvement_percentage = {
            let denom = q0.overall.max(self.pipeline.improvement_threshold.max(1e-9));
            (current_quality.overall - q0.overall) / denom * 100.0
        };

        let mut metadata = HashMap::new();
        metadata.insert("termination_reason".to_string(), json!(termination.to_string()));
        metadata.insert("cache_hit".to_string(), json!(false));
        if degraded_rollback {
            metadata.insert("rolled_back".to_string(), json!(true));
        }
        if total_cost >= self.pipeline.max_cost_per_document {
            metadata.insert("budget_exceeded".to_string(), json!(true));
        }

        // Success means the document is in a state worth keeping: either a
        // strategy improved it, or a degradation was caught and rolled back
        // to the original. A pass that applied nothing (budget denial before
        // any strategy ran, an empty plan, zero max_passes) is not success.
        let success = !strategies_applied.is_empty() || degraded_rollback;

        let result = EnhancementResult {
            original_content: document.content.clone(),
            enhanced_content: content,
            improvements,
            quality_before: q0.overall,
            quality_after: current_quality.overall,
            improvement_percentage,
            strategies_applied,
            total_cost,
            processing_time_ms: start.elapsed().as_millis() as u64,
            passes_executed,
            success,
            errors,
            metadata,
            measured_at: chrono::Utc::now(),
        };

        if self.pipeline.cache_enabled && result.success {
            if let Some(cache) = &self.cache {
                let key = CacheKey::new(&document.content, &canonical_config);
                cache.put(key, result.clone());
            }
        }

        if let Some(store) = &self.result_store {
            if let Err(e) = store.put(&document_id, &result).await {
                warn!(document_id = %document_id, error = %e, "result store put failed, continuing");
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use std::collections::HashMap as Map;

    fn test_settings() -> Settings {
        Settings::from_mode(Mode::Basic, &Map::new()).unwrap()
    }

    fn test_coordinator(settings: &Settings) -> Coordinator {
        Coordinator::new(
            settings,
            Arc::new(StrategyRegistry::with_defaults()),
            VersionHistory::new(50),
            Arc::new(CostModel::new(100.0, 1000.0, settings.pipeline.max_cost_per_document, false)),
            Some(Arc::new(ResultCache::new(10, std::time::Duration::from_secs(60)))),
            None,
        )
    }

    #[tokio::test]
    async fn max_passes_zero_is_a_no_op() {
        let mut settings = test_settings();
        settings.pipeline.max_passes = 0;
        let coordinator = test_coordinator(&settings);
        let document = Document::new("Plain content here.");
        let result = coordinator.enhance(&document).await.unwrap();
        assert_eq!(result.passes_executed, 0);
        assert_eq!(result.enhanced_content, result.original_content);
    }

    #[tokio::test]
    async fn empty_content_succeeds_with_no_strategies_needed_or_valid_metrics() {
        let settings = test_settings();
        let coordinator = test_coordinator(&settings);
        let document = Document::new("");
        let result = coordinator.enhance(&document).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn cache_hit_returns_byte_identical_enhanced_content() {
        let settings = test_settings();
        let coordinator = test_coordinator(&settings);
        let document = Document::new("Some plain text to enhance about API and Api usage.");

        let first = coordinator.enhance(&document).await.unwrap();
        let second = coordinator.enhance(&document).await.unwrap();

        assert_eq!(first.enhanced_content, second.enhanced_content);
        assert_eq!(second.metadata.get("cache_hit").unwrap(), &json!(true));
    }

    #[tokio::test]
    async fn result_store_receives_completed_results() {
        use crate::capability::ResultStore;
        use std::sync::Mutex;

        struct RecordingStore {
            puts: Mutex<Vec<String>>,
        }

        #[async_trait::async_trait]
        impl ResultStore for RecordingStore {
            async fn put(&self, document_id: &str, _result: &EnhancementResult) -> Result<()> {
                self.puts.lock().unwrap().push(document_id.to_string());
                Ok(())
            }

            async fn get(&self, _document_id: &str) -> Result<Option<EnhancementResult>> {
                Ok(None)
            }
        }

        let settings = test_settings();
        let store = Arc::new(RecordingStore { puts: Mutex::new(Vec::new()) });
        let coordinator = test_coordinator(&settings).with_result_store(store.clone());
        let document = Document::new("Plain content about an Api to enhance.");
        coordinator.enhance(&document).await.unwrap();

        assert_eq!(store.puts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_rate_limit_skips_strategies_without_failing_the_document() {
        use crate::llm::{LocalProvider, ProviderConfig};

        let mut settings = test_settings();
        settings.llm.rate_limit_per_minute = 1;
        settings.pipeline.max_passes = 1;
        for name in ["completeness", "consistency", "accuracy", "readability"] {
            settings.strategies.get_mut(name).unwrap().enabled = false;
        }

        let coordinator = Coordinator::new(
            &settings,
            Arc::new(StrategyRegistry::with_defaults()),
            VersionHistory::new(50),
            Arc::new(CostModel::new(100.0, 1000.0, settings.pipeline.max_cost_per_document, false)),
            None,
            Some(Arc::new(LocalProvider::new(ProviderConfig::default()))),
        );

        // Burn the bucket's single token before the coordinator gets to use it.
        coordinator.rate_limiter.as_ref().unwrap().try_acquire();

        let document = Document::new("Text that would normally get enhanced by strategies.");
        let result = coordinator.enhance(&document).await.unwrap();

        assert!(!result.success, "nothing was applied, so there is no improvement to call a success");
        assert!(result.errors.iter().any(|e| e.contains("rate_limited")));
        assert_eq!(result.enhanced_content, result.original_content);
    }

    #[tokio::test]
    async fn budget_denial_stops_without_erroring() {
        let mut settings = test_settings();
        settings.pipeline.max_cost_per_document = 0.0;
        let coordinator = test_coordinator(&settings);
        let document = Document::new("Text that would normally get enhanced by strategies.");
        let result = coordinator.enhance(&document).await.unwrap();
        assert!(result.errors.is_empty());
        assert!(!result.success, "no strategy ran, so nothing was accrued to call a success");
        assert_eq!(result.enhanced_content, result.original_content);
    }

    struct SlowProvider;

    #[async_trait::async_trait]
    impl crate::llm::LlmCapability for SlowProvider {
        async fn generate(&self, _prompt: &str, _options: &crate::llm::GenerationOptions) -> Result<crate::llm::LlmResponse> {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            Ok(crate::llm::LlmResponse::new("irrelevant", "slow", "slow-model"))
        }

        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow-model"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn exceeding_the_configured_timeout_fails_without_erroring() {
        let mut settings = test_settings();
        settings.pipeline.timeout = std::time::Duration::from_millis(10);
        for name in ["completeness", "consistency", "accuracy", "readability"] {
            settings.strategies.get_mut(name).unwrap().enabled = false;
        }

        let coordinator = Coordinator::new(
            &settings,
            Arc::new(StrategyRegistry::with_defaults()),
            VersionHistory::new(50),
            Arc::new(CostModel::new(100.0, 1000.0, settings.pipeline.max_cost_per_document, false)),
            None,
            Some(Arc::new(SlowProvider)),
        );

        let document = Document::new("Text that would normally get enhanced by strategies.");
        let result = coordinator.enhance(&document).await.unwrap();

        assert!(!result.success);
        assert!(result.errors.iter().any(|e| e == "timeout"));
        assert_eq!(result.enhanced_content, result.original_content);
    }
}
