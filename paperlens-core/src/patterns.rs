//! Shared text-scanning primitives.
//!
//! All four extraction units and the orchestrator's derived-field pass are
//! thin configurations over the helpers here: keyword vocabularies matched
//! case-insensitively, year-token scanning, and greedy JSON span location
//! inside free-form model output.

use regex::Regex;
use std::sync::LazyLock;

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("year pattern compiles"));

/// Greedy `[ ... ]` span: first opening bracket to the last closer.
pub fn json_array_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Greedy `{ ... }` span.
pub fn json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Keywords from `vocabulary` present in `text` as case-insensitive
/// substrings, in vocabulary order.
pub fn keyword_hits<'a>(text: &str, vocabulary: &[&'a str]) -> Vec<&'a str> {
    let lower = text.to_lowercase();
    vocabulary
        .iter()
        .filter(|kw| lower.contains(&kw.to_lowercase()))
        .copied()
        .collect()
}

/// Fraction of `vocabulary` present in `text`, in `[0, 1]`.
pub fn keyword_fraction(text: &str, vocabulary: &[&str]) -> f64 {
    if vocabulary.is_empty() {
        return 0.0;
    }
    let hits = keyword_hits(text, vocabulary).len();
    crate::types::clamp_unit(hits as f64 / vocabulary.len() as f64)
}

/// Number of keywords from `vocabulary` found in `text`.
pub fn keyword_score(text: &str, vocabulary: &[&str]) -> usize {
    keyword_hits(text, vocabulary).len()
}

/// The first `19xx`/`20xx` token anywhere in the text.
pub fn first_year(text: &str) -> Option<i32> {
    YEAR_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

/// All distinct `19xx`/`20xx` tokens within `[min_year, max_year]`, sorted
/// ascending.
pub fn years_in_range(text: &str, min_year: i32, max_year: i32) -> Vec<i32> {
    let mut years: Vec<i32> = YEAR_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<i32>().ok())
        .filter(|y| (min_year..=max_year).contains(y))
        .collect();
    years.sort_unstable();
    years.dedup();
    years
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_array_span_greedy() {
        let text = "Here you go:\n[{\"a\": 1}, {\"b\": [2]}]\nHope that helps!";
        assert_eq!(json_array_span(text), Some("[{\"a\": 1}, {\"b\": [2]}]"));
    }

    #[test]
    fn test_json_object_span() {
        let text = "Result: {\"primary_field\": \"NLP\"} done";
        assert_eq!(json_object_span(text), Some("{\"primary_field\": \"NLP\"}"));
    }

    #[test]
    fn test_json_spans_none_without_brackets() {
        assert_eq!(json_array_span("no structured output here"), None);
        assert_eq!(json_object_span("no structured output here"), None);
        assert_eq!(json_array_span("]["), None);
    }

    #[test]
    fn test_keyword_hits_case_insensitive() {
        let hits = keyword_hits("We PROPOSE a Novel method", &["novel", "propose", "first"]);
        assert_eq!(hits, vec!["novel", "propose"]);
    }

    #[test]
    fn test_keyword_fraction() {
        let frac = keyword_fraction("code and dataset on github", &["code", "dataset", "github", "implementation", "reproducible"]);
        assert!((frac - 0.6).abs() < 1e-9);
        assert_eq!(keyword_fraction("anything", &[]), 0.0);
    }

    #[test]
    fn test_first_year() {
        assert_eq!(first_year("...in 2021 we show..."), Some(2021));
        assert_eq!(first_year("published 1998, revised 2003"), Some(1998));
        assert_eq!(first_year("no year here"), None);
        // 5-digit runs are not years
        assert_eq!(first_year("id 201234567"), None);
    }

    #[test]
    fn test_years_in_range_sorted_dedup() {
        let years = years_in_range("2017 then 1998, 2017 again, 1850 and 2099", 1950, 2026);
        assert_eq!(years, vec![1998, 2017]);
    }

    #[test]
    fn test_truncate_chars_boundary_safe() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte characters are not split
        assert_eq!(truncate_chars("摘要abc", 2), "摘要");
    }
}
