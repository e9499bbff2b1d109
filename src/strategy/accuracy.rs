//! Flags unsourced claims, absolutist phrasing, and risky code primitives.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::Result;
use crate::llm::{GenerationOptions, SharedProvider};
use crate::textutil;

use super::{Strategy, StrategyConfig, StrategyKind};

pub struct AccuracyStrategy;

#[async_trait]
impl Strategy for AccuracyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Accuracy
    }

    fn analyze(&self, content: &str) -> HashMap<String, Value> {
        let mut out = HashMap::new();
        out.insert(
            "unsourced_claims".to_string(),
            json!(textutil::unsourced_claim_count(content)),
        );
        out.insert(
            "absolutist_phrases".to_string(),
            json!(textutil::absolutist_phrase_positions(content)),
        );
        out.insert(
            "dangerous_primitives".to_string(),
            json!(textutil::dangerous_primitive_count(content)),
        );
        out
    }

    async fn enhance(&self, content: &str, _config: &StrategyConfig, llm: Option<&SharedProvider>) -> Result<String> {
        if let Some(provider) = llm {
            let prompt = format!(
                "Review this document for accuracy. Annotate unsourced claims and absolutist statements with '[citation needed]', and flag any dangerous code primitives with a warning comment. Keep the rest of the document unchanged. Respond with only the revised document.\n\n{content}"
            );
            let response = provider
                .generate(
                    &prompt,
                    &GenerationOptions {
                        strategy: Some(StrategyKind::Accuracy.as_str().to_string()),
                        ..Default::default()
                    },
                )
                .await?;
            return Ok(response.content);
        }

        Ok(local_annotate(content))
    }
}

fn local_annotate(content: &str) -> String {
    let mut result = content.to_string();

    for phrase in textutil::absolutist_phrase_positions(content) {
        let annotated = format!("{phrase} [citation needed]");
        result = result.replacen(phrase, &annotated, 1);
    }

    if textutil::dangerous_primitive_count(&result) > 0 {
        result.push_str("\n\n<!-- warning: this document references code primitives that can execute arbitrary commands -->");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_fallback_annotates_absolutist_phrases() {
        let strategy = AccuracyStrategy;
        let result = strategy
            .enhance("This always works.", &StrategyConfig::default(), None)
            .await
            .unwrap();
        assert!(result.contains("[citation needed]"));
    }

    #[tokio::test]
    async fn local_fallback_flags_dangerous_primitives() {
        let strategy = AccuracyStrategy;
        let result = strategy
            .enhance("Run os.system(\"rm -rf /\") to clean up.", &StrategyConfig::default(), None)
            .await
            .unwrap();
        assert!(result.contains("warning"));
    }

    #[tokio::test]
    async fn local_fallback_is_a_no_op_on_plain_text() {
        let strategy = AccuracyStrategy;
        let input = "A calm, measured sentence with no strong claims.";
        let result = strategy
            .enhance(input, &StrategyConfig::default(), None)
            .await
            .unwrap();
        assert_eq!(result, input);
    }
}
