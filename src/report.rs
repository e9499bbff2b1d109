//! Metrics & Reporting
//!
//! Two halves: a per-document [`ImprovementReport`] (textual/JSON export)
//! and a process-wide [`MetricsCollector`] of atomic counters tracking
//! enhancement outcomes across documents.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::pipeline::EnhancementResult;
use crate::quality::QualityMetrics;

// =============================================================================
// Per-document report
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionDelta {
    pub clarity: f64,
    pub completeness: f64,
    pub consistency: f64,
    pub accuracy: f64,
    pub readability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassDelta {
    pub pass: u32,
    pub quality_delta: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovementReport {
    pub document_id: String,
    pub initial_metrics: QualityMetrics,
    pub final_metrics: QualityMetrics,
    pub passes: u32,
    pub strategies_applied: Vec<String>,
    pub dimension_deltas: DimensionDelta,
    pub processing_time_ms: u64,
    pub total_cost: f64,
    pub met_quality_threshold: bool,
    pub significant_improvement: bool,
    pub per_pass_deltas: Vec<PassDelta>,
}

impl ImprovementReport {
    pub fn build(
        document_id: impl Into<String>,
        initial_metrics: QualityMetrics,
        final_metrics: QualityMetrics,
        result: &EnhancementResult,
        quality_threshold: f64,
        improvement_threshold: f64,
    ) -> Self {
        let dimension_deltas = DimensionDelta {
            clarity: final_metrics.clarity - initial_metrics.clarity,
            completeness: final_metrics.completeness - initial_metrics.completeness,
            consistency: final_metrics.consistency - initial_metrics.consistency,
            accuracy: final_metrics.accuracy - initial_metrics.accuracy,
            readability: final_metrics.readability - initial_metrics.readability,
        };

        let overall_delta = final_metrics.overall - initial_metrics.overall;

        // One coarse per-pass delta entry per executed pass, distributing
        // the total delta evenly; the coordinator only records the
        // before/after quality per strategy, not per pass, in the result.
        let per_pass_deltas = if result.passes_executed == 0 {
            Vec::new()
        } else {
            let per_pass = overall_delta / result.passes_executed as f64;
            (1..=result.passes_executed)
                .map(|pass| PassDelta { pass, quality_delta: per_pass })
                .collect()
        };

        Self {
            document_id: document_id.into(),
            met_quality_threshold: final_metrics.overall >= quality_threshold,
            significant_improvement: overall_delta >= improvement_threshold,
            initial_metrics,
            final_metrics,
            passes: result.passes_executed,
            strategies_applied: result.strategies_applied.clone(),
            dimension_deltas,
            processing_time_ms: result.processing_time_ms,
            total_cost: result.total_cost,
            per_pass_deltas,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Matches the textual summary template: a header line, an overall
    /// improvement block, and one line per scored dimension.
    pub fn generate_summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Enhancement Report for Document {}\n", self.document_id));
        out.push_str(&"=".repeat(40));
        out.push('\n');
        out.push_str(&format!(
            "Overall Quality: {:.1}% -> {:.1}% ({:+.1}%)\n",
            self.initial_metrics.overall * 100.0,
            self.final_metrics.overall * 100.0,
            (self.final_metrics.overall - self.initial_metrics.overall) * 100.0,
        ));
        out.push_str(&format!("Passes Executed: {}\n", self.passes));
        out.push_str(&format!("Strategies Applied: {}\n", self.strategies_applied.join(", ")));
        out.push_str(&format!("Processing Time: {}ms\n", self.processing_time_ms));
        out.push_str(&format!("Total Cost: ${:.4}\n", self.total_cost));
        out.push_str(&format!("Met Quality Threshold: {}\n", self.met_quality_threshold));
        out.push('\n');
        out.push_str("Dimension Changes:\n");
        out.push_str(&format!("  Clarity:       {:+.1}%\n", self.dimension_deltas.clarity * 100.0));
        out.push_str(&format!("  Completeness:  {:+.1}%\n", self.dimension_deltas.completeness * 100.0));
        out.push_str(&format!("  Consistency:   {:+.1}%\n", self.dimension_deltas.consistency * 100.0));
        out.push_str(&format!("  Accuracy:      {:+.1}%\n", self.dimension_deltas.accuracy * 100.0));
        out.push_str(&format!("  Readability:   {:+.1}%\n", self.dimension_deltas.readability * 100.0));
        out
    }
}

// =============================================================================
// Process-wide aggregate metrics
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub total_documents_processed: u64,
    pub successful_enhancements: u64,
    pub average_improvement: f64,
    pub success_rate: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_ratio: f64,
    pub parallel_ops: u64,
    pub fast_path_ops: u64,
}

/// Lock-free counters for the life of the process. `sum_improvement` is
/// stored scaled by `1_000_000` (fixed point) so fractional deltas can live
/// in an `AtomicU64` without losing precision at the percentage scale.
pub struct MetricsCollector {
    total_documents_processed: AtomicU64,
    successful_enhancements: AtomicU64,
    sum_improvement_scaled: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    parallel_ops: AtomicU64,
    fast_path_ops: AtomicU64,
}

const IMPROVEMENT_SCALE: f64 = 1_000_000.0;

pub type SharedMetrics = Arc<MetricsCollector>;

pub fn create_shared_metrics() -> SharedMetrics {
    Arc::new(MetricsCollector::new())
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            total_documents_processed: AtomicU64::new(0),
            successful_enhancements: AtomicU64::new(0),
            sum_improvement_scaled: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            parallel_ops: AtomicU64::new(0),
            fast_path_ops: AtomicU64::new(0),
        }
    }

    pub fn record_result(&self, result: &EnhancementResult, significant_improvement: bool, improvement_threshold: f64) {
        self.total_documents_processed.fetch_add(1, Ordering::Relaxed);
        if significant_improvement || result.improvement_percentage >= improvement_threshold * 100.0 {
            self.successful_enhancements.fetch_add(1, Ordering::Relaxed);
        }

        let scaled = (result.improvement_percentage.max(0.0) * IMPROVEMENT_SCALE) as u64;
        self.sum_improvement_scaled.fetch_add(scaled, Ordering::Relaxed);

        if result.metadata.get("cache_hit").and_then(|v| v.as_bool()).unwrap_or(false) {
            self.record_cache_hit();
        } else {
            self.record_cache_miss();
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parallel_op(&self) {
        self.parallel_ops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fast_path_op(&self) {
        self.fast_path_ops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> MetricsSummary {
        let total = self.total_documents_processed.load(Ordering::Relaxed);
        let successful = self.successful_enhancements.load(Ordering::Relaxed);
        let sum_improvement = self.sum_improvement_scaled.load(Ordering::Relaxed) as f64 / IMPROVEMENT_SCALE;
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);

        MetricsSummary {
            total_documents_processed: total,
            successful_enhancements: successful,
            average_improvement: if total > 0 { sum_improvement / total as f64 } else { 0.0 },
            success_rate: if total > 0 { successful as f64 / total as f64 } else { 0.0 },
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_ratio: if hits + misses > 0 { hits as f64 / (hits + misses) as f64 } else { 0.0 },
            parallel_ops: self.parallel_ops.load(Ordering::Relaxed),
            fast_path_ops: self.fast_path_ops.load(Ordering::Relaxed),
        }
    }

    pub fn display(&self) -> String {
        let summary = self.summary();
        format!(
            "Documents processed: {}\nSuccess rate: {:.1}%\nAverage improvement: {:.1}%\nCache hit ratio: {:.1}% ({} hits / {} misses)\nParallel ops: {}\nFast-path ops: {}",
            summary.total_documents_processed,
            summary.success_rate * 100.0,
            summary.average_improvement,
            summary.cache_hit_ratio * 100.0,
            summary.cache_hits,
            summary.cache_misses,
            summary.parallel_ops,
            summary.fast_path_ops,
        )
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metrics(overall: f64) -> QualityMetrics {
        QualityMetrics {
            overall,
            clarity: overall,
            completeness: overall,
            consistency: overall,
            accuracy: overall,
            readability: overall,
            word_count: 10,
            sentence_count: 2,
            paragraph_count: 1,
            avg_sentence_length: 5.0,
            reading_grade_level: 8.0,
            has_introduction: false,
            has_conclusion: false,
            has_table_of_contents: false,
            section_count: 0,
            jargon_ratio: 0.0,
            passive_voice_ratio: 0.0,
            complexity_score: 0.0,
            measured_at: chrono::Utc::now(),
            measurement_id: uuid::Uuid::new_v4(),
        }
    }

    fn sample_result() -> EnhancementResult {
        let mut result = EnhancementResult::empty("content");
        result.passes_executed = 2;
        result.strategies_applied = vec!["clarity".to_string(), "readability".to_string()];
        result.improvement_percentage = 20.0;
        result.metadata.insert("cache_hit".to_string(), serde_json::json!(false));
        result
    }

    #[test]
    fn report_text_contains_document_id_and_header() {
        let report = ImprovementReport::build("doc-1", sample_metrics(0.5), sample_metrics(0.8), &sample_result(), 0.8, 0.05);
        let text = report.generate_summary();
        assert!(text.starts_with("Enhancement Report for Document doc-1"));
        assert!(text.contains("Met Quality Threshold: true"));
    }

    #[test]
    fn report_json_round_trips_through_serde() {
        let report = ImprovementReport::build("doc-2", sample_metrics(0.4), sample_metrics(0.5), &sample_result(), 0.8, 0.05);
        let json = report.to_json().unwrap();
        let parsed: ImprovementReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.document_id, "doc-2");
    }

    #[test]
    fn metrics_collector_tracks_success_rate_and_cache_ratio() {
        let metrics = MetricsCollector::new();
        let mut hit_result = sample_result();
        hit_result.metadata.insert("cache_hit".to_string(), serde_json::json!(true));

        metrics.record_result(&sample_result(), true, 0.05);
        metrics.record_result(&hit_result, false, 0.05);

        let summary = metrics.summary();
        assert_eq!(summary.total_documents_processed, 2);
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.cache_misses, 1);
        assert!((summary.cache_hit_ratio - 0.5).abs() < 1e-9);
    }
}
