//! Local/Stub LLM Provider
//!
//! A zero-cost provider that transforms its prompt deterministically rather
//! than calling out to a real model. Used by default when no remote provider
//! is configured, and by the pipeline's seed tests, where determinism of the
//! termination reason and version sequence is required.

use async_trait::async_trait;
use std::time::Instant;

use super::{GenerationOptions, LlmCapability, LlmResponse, ProviderConfig, ResponseTiming, TokenUsage};
use crate::error::Result;

/// Deterministically echoes (optionally appending a fixed marker to) its prompt.
pub struct LocalProvider {
    model: String,
    /// Appended to the prompt on every call; lets tests assert on growth
    /// without depending on any particular transform.
    marker: String,
}

impl LocalProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            model: config.model.unwrap_or_else(|| "local-echo".to_string()),
            marker: String::new(),
        }
    }

    /// Build a provider that appends `marker` to every generated response,
    /// useful for tests that need to observe monotonic content growth.
    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            model: "local-echo".to_string(),
            marker: marker.into(),
        }
    }
}

#[async_trait]
impl LlmCapability for LocalProvider {
    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<LlmResponse> {
        let start = Instant::now();
        let content = if self.marker.is_empty() {
            prompt.to_string()
        } else {
            format!("{prompt}{}", self.marker)
        };
        let usage = TokenUsage::estimate(prompt.len(), content.len());

        Ok(LlmResponse::new(content, "local", self.model.clone())
            .with_usage(usage)
            .with_timing(ResponseTiming::from_duration(start.elapsed())))
    }

    fn name(&self) -> &str {
        "local"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_prompt_unchanged_by_default() {
        let provider = LocalProvider::new(ProviderConfig::default());
        let response = provider
            .generate("hello world", &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(response.content, "hello world");
    }

    #[tokio::test]
    async fn with_marker_appends_deterministically() {
        let provider = LocalProvider::with_marker("X");
        let response = provider
            .generate("hello", &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(response.content, "helloX");
    }

    #[tokio::test]
    async fn health_check_always_ok() {
        let provider = LocalProvider::new(ProviderConfig::default());
        assert!(provider.health_check().await.unwrap());
    }
}
