//! Shared plain-text analysis helpers used by both the quality scorer and
//! the enhancement strategies. Everything here is a pure function over
//! `&str` - no I/O, no state - so the scorer and the strategies can agree
//! on what counts as a sentence, a section, or a hedge without duplicating
//! the detection logic.

const COMPLEX_MARKERS: &[&str] = &[
    "notwithstanding",
    "henceforth",
    "aforementioned",
    "pursuant to",
    "in accordance with",
    "heretofore",
];

const UNCERTAINTY_HEDGES: &[&str] = &[
    "might be",
    "could be",
    "possibly",
    "perhaps",
    "it seems",
    "may be",
    "arguably",
];

const UNSOURCED_CLAIM_MARKERS: &[&str] = &[
    "studies show",
    "experts say",
    "it is well known",
    "research suggests",
    "many believe",
];

const MIXED_CASE_ACRONYMS: &[(&str, &str)] = &[
    ("API", "api"),
    ("URL", "url"),
    ("HTTP", "http"),
    ("JSON", "json"),
    ("XML", "xml"),
];

const EXAMPLE_MARKERS: &[&str] = &["for example", "e.g.", "for instance", "such as"];

const ABSOLUTIST_PHRASES: &[&str] = &["always", "never", "everyone knows", "undeniably", "without exception"];

const DANGEROUS_PRIMITIVES: &[&str] = &["eval(", "exec(", "os.system(", "rm -rf", "unsafe {"];

/// Split on sentence-ending punctuation. Deliberately simple: this is a
/// heuristic scorer, not an NLP pipeline.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split(|c| c == '.' || c == '!' || c == '?')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

pub fn split_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

pub fn word_count(text: &str) -> usize {
    split_words(text).len()
}

pub fn sentence_count(text: &str) -> usize {
    split_sentences(text).len()
}

pub fn paragraph_count(text: &str) -> usize {
    split_paragraphs(text).len()
}

pub fn avg_sentence_length(text: &str) -> f64 {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return 0.0;
    }
    let total_words: usize = sentences.iter().map(|s| word_count(s)).sum();
    total_words as f64 / sentences.len() as f64
}

/// Markdown `#`/`##`/... headings, or numbered headings as a fallback.
pub fn section_count(text: &str) -> usize {
    let heading_lines = text
        .lines()
        .filter(|line| line.trim_start().starts_with('#'))
        .count();
    if heading_lines > 0 {
        return heading_lines;
    }
    text.lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            trimmed
                .chars()
                .next()
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false)
                && trimmed.contains('.')
        })
        .count()
}

pub fn has_introduction(text: &str) -> bool {
    let lower = text.to_lowercase();
    let head = &lower[..lower.len().min(400)];
    head.contains("introduction") || head.contains("overview") || head.contains("this document")
}

pub fn has_conclusion(text: &str) -> bool {
    let lower = text.to_lowercase();
    let tail_start = lower.len().saturating_sub(400);
    let tail = &lower[tail_start..];
    tail.contains("conclusion") || tail.contains("summary") || tail.contains("in summary")
}

pub fn has_table_of_contents(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("table of contents") || lower.contains("\n## contents")
}

pub fn has_example_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    EXAMPLE_MARKERS.iter().any(|m| lower.contains(m))
}

pub fn complex_marker_ratio(text: &str) -> f64 {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return 0.0;
    }
    let lower = text.to_lowercase();
    let hits = COMPLEX_MARKERS.iter().filter(|m| lower.contains(*m)).count();
    hits as f64 / sentences.len() as f64
}

pub fn mixed_case_acronym_count(text: &str) -> usize {
    MIXED_CASE_ACRONYMS
        .iter()
        .filter(|(correct, lower)| {
            text.contains(lower) && !text.contains(correct) || mixed_variant_present(text, correct)
        })
        .count()
}

fn mixed_variant_present(text: &str, correct: &str) -> bool {
    // Any casing of the acronym other than all-upper or all-lower counts as mixed.
    text.split_whitespace().any(|word| {
        let cleaned: String = word.chars().filter(|c| c.is_alphabetic()).collect();
        cleaned.eq_ignore_ascii_case(correct) && cleaned != correct && cleaned.to_lowercase() != cleaned
    })
}

pub fn has_mixed_emphasis_styles(text: &str) -> bool {
    text.contains("__") && text.contains("**")
}

pub fn uncertainty_hedge_count(text: &str) -> usize {
    let lower = text.to_lowercase();
    UNCERTAINTY_HEDGES.iter().filter(|h| lower.contains(*h)).count()
}

pub fn unsourced_claim_count(text: &str) -> usize {
    let lower = text.to_lowercase();
    UNSOURCED_CLAIM_MARKERS.iter().filter(|m| lower.contains(*m)).count()
}

pub fn absolutist_phrase_positions(text: &str) -> Vec<&str> {
    let lower = text.to_lowercase();
    ABSOLUTIST_PHRASES
        .iter()
        .filter(|p| lower.contains(**p))
        .copied()
        .collect()
}

pub fn dangerous_primitive_count(text: &str) -> usize {
    DANGEROUS_PRIMITIVES.iter().filter(|p| text.contains(*p)).count()
}

/// Vowel-group heuristic: count transitions into a vowel as a syllable,
/// with a floor of one syllable per word.
pub fn count_syllables(word: &str) -> usize {
    let word = word.to_lowercase();
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut prev_was_vowel = false;
    for c in word.chars() {
        let v = is_vowel(c);
        if v && !prev_was_vowel {
            count += 1;
        }
        prev_was_vowel = v;
    }
    if word.ends_with('e') && count > 1 {
        count -= 1;
    }
    count.max(1)
}

/// Local Flesch-Kincaid grade-level approximation:
/// `0.39 * (words/sentence) + 11.8 * (syllables/word) - 15.59`
pub fn flesch_kincaid_grade(text: &str) -> f64 {
    let sentences = split_sentences(text).len().max(1);
    let words = split_words(text);
    let word_n = words.len().max(1);
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();

    let words_per_sentence = word_n as f64 / sentences as f64;
    let syllables_per_word = syllables as f64 / word_n as f64;

    (0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentence_split_ignores_empty_fragments() {
        assert_eq!(split_sentences("Hi. There!  "), vec!["Hi", "There"]);
    }

    #[test]
    fn avg_sentence_length_is_zero_for_empty_text() {
        assert_eq!(avg_sentence_length(""), 0.0);
    }

    #[test]
    fn section_count_detects_markdown_headings() {
        assert_eq!(section_count("# A\ntext\n## B\ntext\n## C"), 3);
    }

    #[test]
    fn mixed_emphasis_detects_both_styles() {
        assert!(has_mixed_emphasis_styles("**bold** and __also bold__"));
        assert!(!has_mixed_emphasis_styles("**bold** only"));
    }

    #[test]
    fn syllable_count_has_floor_of_one() {
        assert_eq!(count_syllables("strengths"), 1);
        assert_eq!(count_syllables("banana"), 3);
    }

    #[test]
    fn flesch_kincaid_grade_is_non_negative() {
        assert!(flesch_kincaid_grade("The cat sat.") >= 0.0);
    }
}
