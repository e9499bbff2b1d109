use chrono::Utc;
use uuid::Uuid;

use crate::textutil;

use super::QualityMetrics;

/// Measure `content` and return a fully populated [`QualityMetrics`].
pub fn score(content: &str) -> QualityMetrics {
    let word_count = textutil::word_count(content);
    if word_count == 0 {
        return empty_content_metrics();
    }

    let sentence_count = textutil::sentence_count(content);
    let paragraph_count = textutil::paragraph_count(content);
    let avg_sentence_length = textutil::avg_sentence_length(content);
    let reading_grade_level = textutil::flesch_kincaid_grade(content);

    let has_introduction = textutil::has_introduction(content);
    let has_conclusion = textutil::has_conclusion(content);
    let has_table_of_contents = textutil::has_table_of_contents(content);
    let section_count = textutil::section_count(content);

    let clarity = score_clarity(avg_sentence_length, content);
    let completeness = score_completeness(has_introduction, has_conclusion, section_count, word_count, content);
    let consistency = score_consistency(content);
    let accuracy = score_accuracy(content);
    let readability = score_readability(reading_grade_level, avg_sentence_length);

    let overall = QualityMetrics::weighted_overall(clarity, completeness, consistency, accuracy, readability);

    let jargon_ratio = textutil::complex_marker_ratio(content);
    let passive_voice_ratio = estimate_passive_voice_ratio(content);
    let complexity_score = 1.0 - clarity;

    QualityMetrics {
        overall,
        clarity,
        completeness,
        consistency,
        accuracy,
        readability,
        word_count,
        sentence_count,
        paragraph_count,
        avg_sentence_length,
        reading_grade_level,
        has_introduction,
        has_conclusion,
        has_table_of_contents,
        section_count,
        jargon_ratio,
        passive_voice_ratio,
        complexity_score,
        measured_at: Utc::now(),
        measurement_id: Uuid::new_v4(),
    }
}

/// Every dimension at the same floor - there is nothing to measure, so
/// nothing earns a bonus a real document would have to demonstrate.
fn empty_content_metrics() -> QualityMetrics {
    let floor = 0.4;
    QualityMetrics {
        overall: floor,
        clarity: floor,
        completeness: floor,
        consistency: floor,
        accuracy: floor,
        readability: floor,
        word_count: 0,
        sentence_count: 0,
        paragraph_count: 0,
        avg_sentence_length: 0.0,
        reading_grade_level: 0.0,
        has_introduction: false,
        has_conclusion: false,
        has_table_of_contents: false,
        section_count: 0,
        jargon_ratio: 0.0,
        passive_voice_ratio: 0.0,
        complexity_score: 1.0 - floor,
        measured_at: Utc::now(),
        measurement_id: Uuid::new_v4(),
    }
}

fn score_clarity(avg_sentence_length: f64, content: &str) -> f64 {
    let mut clarity: f64 = 1.0;
    if avg_sentence_length > 25.0 {
        clarity -= 0.2;
    } else if avg_sentence_length > 20.0 {
        clarity -= 0.1;
    }
    if textutil::complex_marker_ratio(content) > 0.3 {
        clarity -= 0.15;
    }
    clarity.max(0.3)
}

fn score_completeness(
    has_introduction: bool,
    has_conclusion: bool,
    section_count: usize,
    word_count: usize,
    content: &str,
) -> f64 {
    let mut completeness: f64 = 0.5;
    if has_introduction {
        completeness += 0.15;
    }
    if has_conclusion {
        completeness += 0.15;
    }

    let expected_sections = word_count as f64 / 500.0;
    if section_count as f64 >= expected_sections {
        completeness += 0.2;
    } else if section_count as f64 >= expected_sections / 2.0 {
        completeness += 0.1;
    }

    if textutil::has_example_marker(content) {
        completeness += 0.1;
    }

    completeness.min(1.0)
}

fn score_consistency(content: &str) -> f64 {
    let mut consistency = 1.0;
    consistency -= 0.05 * textutil::mixed_case_acronym_count(content) as f64;
    if textutil::has_mixed_emphasis_styles(content) {
        consistency -= 0.1;
    }
    consistency.max(0.4)
}

fn score_accuracy(content: &str) -> f64 {
    let mut accuracy = 0.8;

    let hedges = textutil::uncertainty_hedge_count(content);
    let hedge_penalty = (0.05 * hedges.saturating_sub(2) as f64).min(0.15);
    accuracy -= hedge_penalty;

    let unsourced = textutil::unsourced_claim_count(content);
    let unsourced_penalty = (0.05 * unsourced as f64).min(0.2);
    accuracy -= unsourced_penalty;

    accuracy.max(0.3)
}

fn score_readability(grade: f64, avg_sentence_length: f64) -> f64 {
    let grade_factor: f64 = if (8.0..=12.0).contains(&grade) {
        1.0
    } else if grade < 6.0 {
        0.7
    } else if grade > 15.0 {
        0.6
    } else {
        0.85
    };

    let sentence_factor = if (15.0..=20.0).contains(&avg_sentence_length) {
        1.0
    } else {
        0.85
    };

    (1.0 * grade_factor * sentence_factor).clamp(0.0, 1.0)
}

/// Rough passive-voice estimate: sentences containing a "to be" verb
/// followed by a past participle marker ("-ed"/"-en").
fn estimate_passive_voice_ratio(content: &str) -> f64 {
    let sentences = textutil::split_sentences(content);
    if sentences.is_empty() {
        return 0.0;
    }
    let be_verbs = ["is", "are", "was", "were", "been", "being", "be"];
    let passive_count = sentences
        .iter()
        .filter(|s| {
            let lower = s.to_lowercase();
            let words: Vec<&str> = lower.split_whitespace().collect();
            words.windows(2).any(|pair| {
                be_verbs.contains(&pair[0]) && (pair[1].ends_with("ed") || pair[1].ends_with("en"))
            })
        })
        .count();
    passive_count as f64 / sentences.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_scores_stay_in_bounds() {
        let metrics = score("");
        assert_eq!(metrics.word_count, 0);
        assert!((0.3..=0.5).contains(&metrics.overall));
    }

    #[test]
    fn overall_matches_weighted_formula() {
        let metrics = score("Some reasonably plain text. It has two sentences.");
        let expected = QualityMetrics::weighted_overall(
            metrics.clarity,
            metrics.completeness,
            metrics.consistency,
            metrics.accuracy,
            metrics.readability,
        );
        assert!((metrics.overall - expected).abs() < 1e-9);
    }

    #[test]
    fn all_dimensions_stay_within_unit_interval() {
        let samples = [
            "",
            "Short.",
            "# Introduction\n\nThis is an overview of the system.\n\n## Details\n\nMore text here with API and Api mixed. **bold** and __also__.\n\n## Conclusion\n\nIn summary, this works.",
        ];
        for sample in samples {
            let metrics = score(sample);
            for dim in [
                metrics.overall,
                metrics.clarity,
                metrics.completeness,
                metrics.consistency,
                metrics.accuracy,
                metrics.readability,
            ] {
                assert!((0.0..=1.0).contains(&dim), "dimension out of bounds: {dim}");
            }
        }
    }

    #[test]
    fn long_sentences_reduce_clarity() {
        let long = "word ".repeat(30) + ".";
        let short = "Short sentence here. Another short one.";
        assert!(score_clarity(textutil::avg_sentence_length(&long), &long) < score_clarity(textutil::avg_sentence_length(short), short));
    }

    #[test]
    fn mixed_emphasis_lowers_consistency() {
        let mixed = "**bold** and __also bold__ text.";
        let plain = "**bold** text only.";
        assert!(score_consistency(mixed) < score_consistency(plain));
    }

    proptest::proptest! {
        /// No arbitrary input can push a dimension (or the weighted overall)
        /// outside [0, 1] - every `score_*` clamp has to hold regardless of
        /// how pathological the text is.
        #[test]
        fn dimensions_never_leave_unit_interval(content in "\\PC{0,500}") {
            let metrics = score(&content);
            for dim in [
                metrics.overall,
                metrics.clarity,
                metrics.completeness,
                metrics.consistency,
                metrics.accuracy,
                metrics.readability,
            ] {
                proptest::prop_assert!((0.0..=1.0).contains(&dim));
            }
        }
    }
}
