//! Optional external capabilities the coordinator consults if configured.
//! Each is behind `Option<Arc<dyn Trait>>`; absence degrades gracefully
//! rather than failing the enhancement.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::EnhancementResult;
use crate::quality::QualityMetrics;

/// Replaces the local heuristic scorer in [`crate::quality::score`] with a
/// richer analysis (e.g. a real NLP pipeline). Returns a full
/// [`QualityMetrics`] the coordinator uses as-is.
#[async_trait]
pub trait QualityCapability: Send + Sync {
    async fn analyze(&self, content: &str) -> Result<QualityMetrics>;
}

/// Post-pass content optimizer invoked after each pass when
/// `pipeline.use_entropy_optimizer` is set. Named for the class of
/// information-density optimizers it stands in for.
#[async_trait]
pub trait EntropyCapability: Send + Sync {
    async fn optimize(&self, content: &str, target_quality: f64) -> Result<String>;
}

/// Pluggable persistence for completed results. The default is a no-op -
/// the coordinator and batch executor hold results in memory and return
/// them to the caller regardless of whether a store is configured.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn put(&self, document_id: &str, result: &EnhancementResult) -> Result<()>;
    async fn get(&self, document_id: &str) -> Result<Option<EnhancementResult>>;
}

pub struct NoopResultStore;

#[async_trait]
impl ResultStore for NoopResultStore {
    async fn put(&self, _document_id: &str, _result: &EnhancementResult) -> Result<()> {
        Ok(())
    }

    async fn get(&self, _document_id: &str) -> Result<Option<EnhancementResult>> {
        Ok(None)
    }
}

pub type SharedQualityCapability = Arc<dyn QualityCapability>;
pub type SharedEntropyCapability = Arc<dyn EntropyCapability>;
pub type SharedResultStore = Arc<dyn ResultStore>;
