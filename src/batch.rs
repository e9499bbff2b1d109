//! Batch & Stream Executor
//!
//! Runs a `Coordinator` over many documents with bounded parallelism. Every
//! document gets a result - a per-item failure never aborts its siblings -
//! and the output vector preserves input order regardless of completion
//! order, matching `futures::stream::buffered`'s ordering guarantee rather
//! than `buffer_unordered`'s.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::document::Document;
use crate::pipeline::{Coordinator, EnhancementResult};

pub struct BatchExecutor {
    coordinator: Arc<Coordinator>,
    max_parallel_docs: usize,
}

impl BatchExecutor {
    pub fn new(coordinator: Arc<Coordinator>, max_parallel_docs: usize) -> Self {
        Self {
            coordinator,
            max_parallel_docs: max_parallel_docs.max(1),
        }
    }

    /// Enhance every document, preserving order. A document that errors out
    /// (rather than merely producing a low-quality result) is mapped to a
    /// failed [`EnhancementResult`] so the output length always matches the
    /// input length.
    pub async fn enhance_batch(&self, documents: &[Document]) -> Vec<EnhancementResult> {
        stream::iter(documents.iter())
            .map(|document| {
                let coordinator = Arc::clone(&self.coordinator);
                let content = document.content.clone();
                async move {
                    match coordinator.enhance(document).await {
                        Ok(result) => result,
                        Err(e) => {
                            warn!(error = %e, "document enhancement failed, isolating");
                            let mut failed = EnhancementResult::empty(&content);
                            failed.success = false;
                            failed.errors.push(e.tag());
                            failed
                        }
                    }
                }
            })
            .buffered(self.max_parallel_docs)
            .collect()
            .await
    }

    /// Streaming variant with the same ordering/isolation guarantees,
    /// useful for callers that want to react to results as they complete
    /// rather than waiting for the whole batch.
    pub fn enhance_stream<'a>(
        &'a self,
        documents: &'a [Document],
    ) -> impl futures::Stream<Item = EnhancementResult> + 'a {
        stream::iter(documents.iter())
            .map(move |document| {
                let coordinator = Arc::clone(&self.coordinator);
                let content = document.content.clone();
                async move {
                    match coordinator.enhance(document).await {
                        Ok(result) => result,
                        Err(e) => {
                            let mut failed = EnhancementResult::empty(&content);
                            failed.success = false;
                            failed.errors.push(e.tag());
                            failed
                        }
                    }
                }
            })
            .buffered(self.max_parallel_docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResultCache;
    use crate::config::{Mode, Settings};
    use crate::cost::CostModel;
    use crate::history::VersionHistory;
    use crate::strategy::StrategyRegistry;

    fn test_executor(max_parallel_docs: usize) -> BatchExecutor {
        let settings = Settings::from_mode(Mode::Basic, &std::collections::HashMap::new()).unwrap();
        let coordinator = Coordinator::new(
            &settings,
            Arc::new(StrategyRegistry::with_defaults()),
            VersionHistory::new(50),
            Arc::new(CostModel::new(100.0, 1000.0, settings.pipeline.max_cost_per_document, false)),
            Some(Arc::new(ResultCache::new(50, std::time::Duration::from_secs(60)))),
            None,
        );
        BatchExecutor::new(Arc::new(coordinator), max_parallel_docs)
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let executor = test_executor(4);
        let documents: Vec<Document> = (0..5).map(|i| Document::new(format!("document number {i}"))).collect();
        let results = executor.enhance_batch(&documents).await;
        assert_eq!(results.len(), 5);
        for (i, result) in results.iter().enumerate() {
            assert!(result.original_content.contains(&i.to_string()));
        }
    }

    #[tokio::test]
    async fn batch_never_drops_a_document() {
        let executor = test_executor(1);
        let documents: Vec<Document> = (0..3).map(|i| Document::new(format!("doc {i}"))).collect();
        let results = executor.enhance_batch(&documents).await;
        assert_eq!(results.len(), documents.len());
    }
}
