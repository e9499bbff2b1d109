//! Acronym casing, emphasis markers, and list bullets, standardized.

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;

use crate::error::Result;
use crate::llm::{GenerationOptions, SharedProvider};
use crate::textutil;

use super::{Strategy, StrategyConfig, StrategyKind};

const KNOWN_ACRONYMS: &[&str] = &["API", "URL", "HTTP", "JSON", "XML"];

static UNDERSCORE_BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__([^_]+)__").unwrap());
static UNDERSCORE_ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_([^_]+)_").unwrap());
static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(\s*)[-*+]\s+").unwrap());

pub struct ConsistencyStrategy;

#[async_trait]
impl Strategy for ConsistencyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Consistency
    }

    fn analyze(&self, content: &str) -> HashMap<String, Value> {
        let mut out = HashMap::new();
        out.insert(
            "mixed_case_acronyms".to_string(),
            json!(textutil::mixed_case_acronym_count(content)),
        );
        out.insert(
            "mixed_emphasis".to_string(),
            json!(textutil::has_mixed_emphasis_styles(content)),
        );
        out
    }

    async fn enhance(&self, content: &str, _config: &StrategyConfig, llm: Option<&SharedProvider>) -> Result<String> {
        if let Some(provider) = llm {
            let prompt = format!(
                "Standardize this document: use consistent casing for acronyms (API, URL, HTTP, JSON, XML), use only ** for bold and * for italics, and use a single list marker style throughout. Respond with only the revised document.\n\n{content}"
            );
            let response = provider
                .generate(
                    &prompt,
                    &GenerationOptions {
                        strategy: Some(StrategyKind::Consistency.as_str().to_string()),
                        ..Default::default()
                    },
                )
                .await?;
            return Ok(response.content);
        }

        Ok(local_standardize(content))
    }
}

fn local_standardize(content: &str) -> String {
    let mut result = standardize_acronyms(content);
    result = UNDERSCORE_BOLD.replace_all(&result, "**$1**").to_string();
    result = UNDERSCORE_ITALIC.replace_all(&result, "*$1*").to_string();
    result = LIST_MARKER.replace_all(&result, "$1- ").to_string();
    result
}

fn standardize_acronyms(content: &str) -> String {
    let mut result = content.to_string();
    for acronym in KNOWN_ACRONYMS {
        let words: Vec<String> = result
            .split_whitespace()
            .map(|w| {
                let cleaned: String = w.chars().filter(|c| c.is_alphabetic()).collect();
                if cleaned.eq_ignore_ascii_case(acronym) && cleaned != *acronym {
                    w.replace(&cleaned, acronym)
                } else {
                    w.to_string()
                }
            })
            .collect();
        result = words.join(" ");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_fallback_normalizes_emphasis() {
        let strategy = ConsistencyStrategy;
        let result = strategy
            .enhance("This is __bold__ and _italic_.", &StrategyConfig::default(), None)
            .await
            .unwrap();
        assert!(result.contains("**bold**"));
        assert!(result.contains("*italic*"));
        assert!(!result.contains("__"));
    }

    #[tokio::test]
    async fn local_fallback_normalizes_list_markers() {
        let strategy = ConsistencyStrategy;
        let result = strategy
            .enhance("- one\n* two\n+ three", &StrategyConfig::default(), None)
            .await
            .unwrap();
        assert_eq!(result, "- one\n- two\n- three");
    }

    #[test]
    fn analyze_counts_mixed_acronyms() {
        let strategy = ConsistencyStrategy;
        let out = strategy.analyze("Call the Api via http.");
        assert_eq!(out.get("mixed_case_acronyms").unwrap(), &json!(2));
    }
}
