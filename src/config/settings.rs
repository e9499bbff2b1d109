//! Settings: the root configuration object, plus every struct it aggregates.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{cache, history, pipeline as pipeline_constants};
use crate::error::{EnhanceError, Result};
use crate::strategy::{StrategyConfig, StrategyKind};

use super::mode::Mode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_passes: u32,
    pub improvement_threshold: f64,
    pub quality_threshold: f64,
    pub rollback_on_degradation: bool,
    pub batch_size: u32,
    pub max_parallel_docs: u32,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub max_cost_per_document: f64,
    pub daily_budget: f64,
    pub monthly_budget: f64,
    pub cache_enabled: bool,
    #[serde(with = "duration_secs")]
    pub cache_ttl: Duration,
    pub cache_size: usize,
    pub use_entropy_optimizer: bool,
    pub use_quality_hook: bool,
}

impl PipelineConfig {
    /// The fields that never vary by mode - shared baseline a [`Mode`]
    /// profile starts from via `..PipelineConfig::bare_defaults()`.
    pub fn bare_defaults() -> Self {
        Self {
            max_passes: pipeline_constants::DEFAULT_MAX_PASSES,
            improvement_threshold: pipeline_constants::DEFAULT_IMPROVEMENT_THRESHOLD,
            quality_threshold: pipeline_constants::DEFAULT_QUALITY_THRESHOLD,
            rollback_on_degradation: true,
            batch_size: 10,
            max_parallel_docs: 5,
            timeout: Duration::from_secs(300),
            max_cost_per_document: 0.25,
            daily_budget: 10.0,
            monthly_budget: 200.0,
            cache_enabled: true,
            cache_ttl: Duration::from_secs(cache::DEFAULT_CACHE_TTL_SECS),
            cache_size: cache::DEFAULT_CACHE_SIZE,
            use_entropy_optimizer: false,
            use_quality_hook: false,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Mode::default().profile().pipeline
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub primary: String,
    pub fallbacks: Vec<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub synthesis: bool,
    pub rate_limit_per_minute: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            primary: "local".to_string(),
            fallbacks: Vec::new(),
            temperature: 0.7,
            max_tokens: 2048,
            synthesis: false,
            rate_limit_per_minute: crate::constants::rate_limit::DEFAULT_PER_MINUTE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// `history::MAX_VERSIONS_PER_DOCUMENT` is a hard ceiling the version store
/// enforces regardless of settings; it is not itself user-configurable.
pub const MAX_VERSIONS_PER_DOCUMENT: usize = history::MAX_VERSIONS_PER_DOCUMENT;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: Mode,
    pub strategies: HashMap<String, StrategyConfig>,
    pub pipeline: PipelineConfig,
    pub llm: LlmSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from_mode(Mode::default(), &HashMap::new()).expect("default mode never errors")
    }
}

impl Settings {
    /// Build settings for `mode`, applying `overrides` (raw key -> JSON
    /// value) on top of the mode's profile. Unknown keys are rejected.
    pub fn from_mode(mode: Mode, overrides: &HashMap<String, serde_json::Value>) -> Result<Self> {
        let profile = mode.profile();

        let mut strategies = HashMap::new();
        for (priority, kind) in StrategyKind::all().into_iter().enumerate() {
            strategies.insert(
                kind.as_str().to_string(),
                StrategyConfig {
                    priority: priority as u32,
                    ..StrategyConfig::default()
                },
            );
        }

        let mut settings = Settings {
            mode,
            strategies,
            pipeline: profile.pipeline,
            llm: LlmSettings {
                temperature: profile.temperature,
                synthesis: profile.llm_synthesis,
                rate_limit_per_minute: profile.rate_limit_per_minute,
                ..LlmSettings::default()
            },
            logging: LoggingSettings::default(),
        };

        settings.apply_overrides(overrides)?;
        Ok(settings)
    }

    fn apply_overrides(&mut self, overrides: &HashMap<String, serde_json::Value>) -> Result<()> {
        for (key, value) in overrides {
            self.apply_override(key, value)?;
        }
        Ok(())
    }

    fn apply_override(&mut self, key: &str, value: &serde_json::Value) -> Result<()> {
        match key {
            "pipeline.max_passes" => self.pipeline.max_passes = expect_u64(value, key)? as u32,
            "pipeline.improvement_threshold" => self.pipeline.improvement_threshold = expect_f64(value, key)?,
            "pipeline.quality_threshold" => self.pipeline.quality_threshold = expect_f64(value, key)?,
            "pipeline.rollback_on_degradation" => self.pipeline.rollback_on_degradation = expect_bool(value, key)?,
            "pipeline.batch_size" => self.pipeline.batch_size = expect_u64(value, key)? as u32,
            "pipeline.max_parallel_docs" => self.pipeline.max_parallel_docs = expect_u64(value, key)? as u32,
            "pipeline.max_cost_per_document" => self.pipeline.max_cost_per_document = expect_f64(value, key)?,
            "pipeline.daily_budget" => self.pipeline.daily_budget = expect_f64(value, key)?,
            "pipeline.monthly_budget" => self.pipeline.monthly_budget = expect_f64(value, key)?,
            "pipeline.cache_enabled" => self.pipeline.cache_enabled = expect_bool(value, key)?,
            "pipeline.cache_size" => self.pipeline.cache_size = expect_u64(value, key)? as usize,
            "pipeline.use_entropy_optimizer" => self.pipeline.use_entropy_optimizer = expect_bool(value, key)?,
            "pipeline.use_quality_hook" => self.pipeline.use_quality_hook = expect_bool(value, key)?,
            "llm.primary" => self.llm.primary = expect_str(value, key)?,
            "llm.temperature" => self.llm.temperature = expect_f64(value, key)? as f32,
            "llm.max_tokens" => self.llm.max_tokens = expect_u64(value, key)? as usize,
            "llm.synthesis" => self.llm.synthesis = expect_bool(value, key)?,
            "llm.rate_limit_per_minute" => self.llm.rate_limit_per_minute = expect_u64(value, key)? as u32,
            "logging.level" => self.logging.level = expect_str(value, key)?,
            "logging.json" => self.logging.json = expect_bool(value, key)?,
            other => {
                return Err(EnhanceError::config(format!("unknown config override key: {other}")));
            }
        }
        Ok(())
    }
}

fn expect_u64(value: &serde_json::Value, key: &str) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| EnhanceError::config(format!("override '{key}' must be a non-negative integer")))
}

fn expect_f64(value: &serde_json::Value, key: &str) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| EnhanceError::config(format!("override '{key}' must be a number")))
}

fn expect_bool(value: &serde_json::Value, key: &str) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| EnhanceError::config(format!("override '{key}' must be a boolean")))
}

fn expect_str(value: &serde_json::Value, key: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| EnhanceError::config(format!("override '{key}' must be a string")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_mode_applies_basic_profile() {
        let settings = Settings::from_mode(Mode::Basic, &HashMap::new()).unwrap();
        assert_eq!(settings.pipeline.max_passes, 2);
        assert_eq!(settings.strategies.len(), 5);
        assert_eq!(settings.llm.rate_limit_per_minute, 15);
    }

    #[test]
    fn override_changes_quality_threshold() {
        let mut overrides = HashMap::new();
        overrides.insert("pipeline.quality_threshold".to_string(), serde_json::json!(0.95));
        let settings = Settings::from_mode(Mode::Performance, &overrides).unwrap();
        assert!((settings.pipeline.quality_threshold - 0.95).abs() < 1e-9);
    }

    #[test]
    fn unknown_override_key_is_rejected() {
        let mut overrides = HashMap::new();
        overrides.insert("pipeline.nonexistent".to_string(), serde_json::json!(1));
        let err = Settings::from_mode(Mode::Basic, &overrides).unwrap_err();
        assert_eq!(err.tag(), "config");
    }

    #[test]
    fn strategies_are_sorted_by_declaration_priority() {
        let settings = Settings::from_mode(Mode::Basic, &HashMap::new()).unwrap();
        assert_eq!(settings.strategies.get("clarity").unwrap().priority, 0);
        assert_eq!(settings.strategies.get("readability").unwrap().priority, 4);
    }
}
