//! Quality Scorer
//!
//! Five weighted dimensions over plain text, combined into a single
//! `overall` score. No external NLP dependency by default; an optional
//! `QualityCapability` (see [`crate::capability`]) can replace the local
//! heuristics with a richer analysis without changing the weights.

mod scorer;

pub use scorer::score;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const WEIGHT_CLARITY: f64 = 0.25;
pub const WEIGHT_COMPLETENESS: f64 = 0.20;
pub const WEIGHT_CONSISTENCY: f64 = 0.15;
pub const WEIGHT_ACCURACY: f64 = 0.20;
pub const WEIGHT_READABILITY: f64 = 0.20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub overall: f64,
    pub clarity: f64,
    pub completeness: f64,
    pub consistency: f64,
    pub accuracy: f64,
    pub readability: f64,

    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub avg_sentence_length: f64,
    pub reading_grade_level: f64,

    pub has_introduction: bool,
    pub has_conclusion: bool,
    pub has_table_of_contents: bool,
    pub section_count: usize,

    pub jargon_ratio: f64,
    pub passive_voice_ratio: f64,
    pub complexity_score: f64,

    pub measured_at: DateTime<Utc>,
    pub measurement_id: Uuid,
}

impl QualityMetrics {
    /// Recompute `overall` from the five dimensions, clamped to `[0, 1]`.
    pub fn weighted_overall(
        clarity: f64,
        completeness: f64,
        consistency: f64,
        accuracy: f64,
        readability: f64,
    ) -> f64 {
        let raw = WEIGHT_CLARITY * clarity
            + WEIGHT_COMPLETENESS * completeness
            + WEIGHT_CONSISTENCY * consistency
            + WEIGHT_ACCURACY * accuracy
            + WEIGHT_READABILITY * readability;
        raw.clamp(0.0, 1.0)
    }
}
