//! Sentence simplification and jargon reduction.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::Result;
use crate::llm::{GenerationOptions, SharedProvider};
use crate::textutil;

use super::{Strategy, StrategyConfig, StrategyKind};

const MAX_SENTENCE_LENGTH: usize = 25;

/// word -> plainer replacement, used when no LLM is available.
const JARGON_TABLE: &[(&str, &str)] = &[
    ("utilize", "use"),
    ("leverage", "use"),
    ("facilitate", "help"),
    ("notwithstanding", "despite"),
    ("henceforth", "from now on"),
    ("aforementioned", "mentioned above"),
    ("pursuant to", "under"),
    ("heretofore", "until now"),
];

pub struct ClarityStrategy;

#[async_trait]
impl Strategy for ClarityStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Clarity
    }

    fn analyze(&self, content: &str) -> HashMap<String, Value> {
        let mut out = HashMap::new();
        out.insert(
            "avg_sentence_length".to_string(),
            json!(textutil::avg_sentence_length(content)),
        );
        out.insert(
            "complex_marker_ratio".to_string(),
            json!(textutil::complex_marker_ratio(content)),
        );
        out
    }

    async fn enhance(&self, content: &str, _config: &StrategyConfig, llm: Option<&SharedProvider>) -> Result<String> {
        if let Some(provider) = llm {
            let prompt = format!(
                "Rewrite the following document to use shorter sentences (no more than {MAX_SENTENCE_LENGTH} words) and replace jargon with plain language. Keep the meaning and structure intact. Respond with only the rewritten document.\n\n{content}"
            );
            let response = provider
                .generate(
                    &prompt,
                    &GenerationOptions {
                        strategy: Some(StrategyKind::Clarity.as_str().to_string()),
                        ..Default::default()
                    },
                )
                .await?;
            return Ok(response.content);
        }

        Ok(local_simplify(content))
    }
}

fn local_simplify(content: &str) -> String {
    let mut result = replace_jargon(content);
    result = split_long_sentences(&result);
    result
}

fn replace_jargon(content: &str) -> String {
    let mut result = content.to_string();
    for (jargon, plain) in JARGON_TABLE {
        result = replace_case_insensitive(&result, jargon, plain);
    }
    result
}

fn replace_case_insensitive(content: &str, from: &str, to: &str) -> String {
    let lower_content = content.to_lowercase();
    let lower_from = from.to_lowercase();
    if !lower_content.contains(&lower_from) {
        return content.to_string();
    }

    let mut result = String::with_capacity(content.len());
    let mut rest = content;
    let mut rest_lower = lower_content.as_str();
    while let Some(idx) = rest_lower.find(&lower_from) {
        result.push_str(&rest[..idx]);
        result.push_str(to);
        rest = &rest[idx + from.len()..];
        rest_lower = &rest_lower[idx + from.len()..];
    }
    result.push_str(rest);
    result
}

/// Break sentences longer than `MAX_SENTENCE_LENGTH` words at the nearest
/// comma past the midpoint, otherwise leave them - this is a best-effort
/// local fallback, not a grammar engine.
fn split_long_sentences(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for sentence in content.split_inclusive(|c| c == '.' || c == '!' || c == '?') {
        let word_count = textutil::word_count(sentence);
        if word_count <= MAX_SENTENCE_LENGTH {
            out.push_str(sentence);
            continue;
        }
        if let Some(comma_idx) = find_midpoint_comma(sentence) {
            let (first, second) = sentence.split_at(comma_idx + 1);
            out.push_str(first.trim_end_matches(','));
            out.push_str(". ");
            out.push_str(second.trim_start());
        } else {
            out.push_str(sentence);
        }
    }
    out
}

fn find_midpoint_comma(sentence: &str) -> Option<usize> {
    let commas: Vec<usize> = sentence.match_indices(',').map(|(i, _)| i).collect();
    if commas.is_empty() {
        return None;
    }
    let midpoint = sentence.len() / 2;
    commas
        .into_iter()
        .min_by_key(|idx| (*idx as isize - midpoint as isize).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_fallback_replaces_jargon() {
        let strategy = ClarityStrategy;
        let result = strategy
            .enhance("We should utilize this approach.", &StrategyConfig::default(), None)
            .await
            .unwrap();
        assert!(result.contains("use this approach"));
        assert!(!result.to_lowercase().contains("utilize"));
    }

    #[tokio::test]
    async fn local_fallback_never_shrinks_below_input() {
        let strategy = ClarityStrategy;
        let input = "A short sentence.";
        let result = strategy
            .enhance(input, &StrategyConfig::default(), None)
            .await
            .unwrap();
        assert!(result.len() >= input.len() - 5);
    }

    #[test]
    fn analyze_reports_sentence_length() {
        let strategy = ClarityStrategy;
        let out = strategy.analyze("Short sentence here.");
        assert!(out.contains_key("avg_sentence_length"));
    }
}
