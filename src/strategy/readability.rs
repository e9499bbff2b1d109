//! Table of contents, paragraph splitting, and (LLM-only) executive summaries.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::Result;
use crate::llm::{GenerationOptions, SharedProvider};
use crate::textutil;

use super::{Strategy, StrategyConfig, StrategyKind};

const TOC_WORD_THRESHOLD: usize = 500;
const TOC_SECTION_THRESHOLD: usize = 3;
const MAX_PARAGRAPH_WORDS: usize = 150;

pub struct ReadabilityStrategy;

#[async_trait]
impl Strategy for ReadabilityStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Readability
    }

    fn analyze(&self, content: &str) -> HashMap<String, Value> {
        let mut out = HashMap::new();
        out.insert(
            "reading_grade_level".to_string(),
            json!(textutil::flesch_kincaid_grade(content)),
        );
        out.insert(
            "has_table_of_contents".to_string(),
            json!(textutil::has_table_of_contents(content)),
        );
        out
    }

    async fn enhance(&self, content: &str, config: &StrategyConfig, llm: Option<&SharedProvider>) -> Result<String> {
        if let Some(provider) = llm {
            let wants_synthesis = config
                .parameters
                .get("synthesis")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            let instruction = if wants_synthesis {
                "Improve readability: add a table of contents if the document is long, split overly long paragraphs, and prepend a short executive summary."
            } else {
                "Improve readability: add a table of contents if the document is long, and split overly long paragraphs."
            };
            let prompt = format!("{instruction} Keep the rest of the document unchanged. Respond with only the revised document.\n\n{content}");
            let response = provider
                .generate(
                    &prompt,
                    &GenerationOptions {
                        strategy: Some(StrategyKind::Readability.as_str().to_string()),
                        ..Default::default()
                    },
                )
                .await?;
            return Ok(response.content);
        }

        Ok(local_improve_readability(content))
    }
}

fn local_improve_readability(content: &str) -> String {
    let mut result = split_long_paragraphs(content);

    let word_count = textutil::word_count(&result);
    let section_count = textutil::section_count(&result);
    if word_count > TOC_WORD_THRESHOLD
        && section_count >= TOC_SECTION_THRESHOLD
        && !textutil::has_table_of_contents(&result)
    {
        let toc = build_table_of_contents(&result);
        result = format!("## Table of Contents\n\n{toc}\n\n{result}");
    }

    result
}

fn build_table_of_contents(content: &str) -> String {
    content
        .lines()
        .filter(|line| line.trim_start().starts_with('#'))
        .map(|line| {
            let title = line.trim_start_matches('#').trim();
            format!("- {title}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_long_paragraphs(content: &str) -> String {
    let paragraphs: Vec<String> = content
        .split("\n\n")
        .map(|p| {
            if textutil::word_count(p) <= MAX_PARAGRAPH_WORDS {
                return p.to_string();
            }
            let sentences = textutil::split_sentences(p);
            if sentences.len() < 2 {
                return p.to_string();
            }
            let midpoint = sentences.len() / 2;
            let first_half = sentences[..midpoint].join(". ");
            let second_half = sentences[midpoint..].join(". ");
            format!("{first_half}.\n\n{second_half}.")
        })
        .collect();
    paragraphs.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_fallback_adds_toc_for_long_sectioned_documents() {
        let strategy = ReadabilityStrategy;
        let body = "word ".repeat(600);
        let content = format!("# A\n{body}\n\n## B\n{body}\n\n## C\n{body}");
        let result = strategy
            .enhance(&content, &StrategyConfig::default(), None)
            .await
            .unwrap();
        assert!(textutil::has_table_of_contents(&result));
    }

    #[tokio::test]
    async fn local_fallback_leaves_short_documents_untouched_by_toc() {
        let strategy = ReadabilityStrategy;
        let result = strategy
            .enhance("# A\nshort content", &StrategyConfig::default(), None)
            .await
            .unwrap();
        assert!(!textutil::has_table_of_contents(&result));
    }

    #[tokio::test]
    async fn local_fallback_splits_long_paragraphs() {
        let strategy = ReadabilityStrategy;
        let long_paragraph = "Sentence one is here. ".repeat(40);
        let result = strategy
            .enhance(&long_paragraph, &StrategyConfig::default(), None)
            .await
            .unwrap();
        assert!(result.contains("\n\n"));
    }
}
