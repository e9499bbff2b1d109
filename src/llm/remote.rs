//! HTTP-backed LLM Provider
//!
//! Shaped like a real remote provider (OpenAI-compatible chat completion
//! endpoint) so the integration point for a production backend is concrete,
//! but not exercised by default - `Settings::llm.primary` defaults to
//! `local`. Wire this up with a real `api_base` and `api_key` to call a
//! live model.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{
    GenerationOptions, LlmCapability, LlmResponse, ProviderConfig, ResponseTiming, TokenUsage,
};
use crate::error::{EnhanceError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

pub struct RemoteProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for RemoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl RemoteProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .or_else(|| std::env::var("ENHANCE_LLM_API_KEY").ok())
            .ok_or_else(|| {
                EnhanceError::config(
                    "remote provider requires an API key: set ENHANCE_LLM_API_KEY or llm.api_key",
                )
            })?;

        let api_base = config.api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        url::Url::parse(&api_base)
            .map_err(|e| EnhanceError::config(format!("invalid llm.api_base '{api_base}': {e}")))?;
        let model = config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EnhanceError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn build_request(&self, prompt: &str, options: &GenerationOptions) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a document editing assistant. Respond with the improved document text only, no commentary.".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: options.temperature,
            max_tokens: Some(self.max_tokens),
        }
    }
}

#[async_trait]
impl LlmCapability for RemoteProvider {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<LlmResponse> {
        debug!(model = %self.model, temperature = options.temperature, "generating via remote provider");

        let start = Instant::now();
        let request = self.build_request(prompt, options);
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| EnhanceError::from(crate::error::ErrorClassifier::classify(&e.to_string(), "remote")))?;

        let elapsed = start.elapsed();

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EnhanceError::from(crate::error::ErrorClassifier::classify_http_status(
                status.as_u16(),
                &body,
                "remote",
            )));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            EnhanceError::from(crate::error::ErrorClassifier::classify(
                &format!("parse error: {e}"),
                "remote",
            ))
        })?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EnhanceError::config("no content in remote provider response"))?;

        Ok(LlmResponse::new(content, "remote", self.model.clone())
            .with_usage(usage)
            .with_timing(ResponseTiming::from_duration(elapsed)))
    }

    fn name(&self) -> &str {
        "remote"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.api_base);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => Ok(true),
            Ok(resp) => {
                warn!(status = %resp.status(), "remote provider health check failed");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "remote provider health check failed");
                Ok(false)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}
