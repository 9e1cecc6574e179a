//! Document parser: raw extracted text -> `ParsedDocument`.
//!
//! Works on plain document text (pages separated by form-feed characters,
//! as produced by the upstream text-extraction step). All structuring is
//! layout-heuristic: title band, author-marker lines, abstract span, and
//! canonical section windows. A parse failure is fatal for the whole
//! pipeline; missing individual sections are not.

use chrono::Utc;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::patterns::truncate_chars;
use crate::types::{DocumentMetadata, ParsedDocument};

/// Sentinel title when no first-page line falls in the plausible band.
pub const UNKNOWN_TITLE: &str = "Unknown Title";
/// Sentinel author list when no author-marker line is found.
pub const UNKNOWN_AUTHORS: &str = "Unknown Authors";
/// Sentinel abstract when no marker pair is found.
pub const ABSTRACT_NOT_FOUND: &str = "Abstract not found";

/// Tokens indicating an author line, matched case-insensitively as
/// substrings.
const AUTHOR_TOKENS: &[&str] = &["author", "by", "et al"];

/// Heuristic document parser.
pub struct DocumentParser {
    config: ParserConfig,
    abstract_re: Regex,
    section_patterns: Vec<(&'static str, Regex)>,
}

impl DocumentParser {
    pub fn new(config: ParserConfig) -> Self {
        // Abstract: text bounded by an abstract marker and the next section
        // marker (multilingual, as in scanned preprints).
        let abstract_re = Regex::new(
            r"(?is)(?:abstract|摘要)(.*?)(?:introduction|引言|\n1[\s.])",
        )
        .expect("abstract pattern compiles");

        let section_patterns = vec![
            ("abstract", r"(?i)\babstract\b|摘要"),
            ("introduction", r"(?i)\bintroduction\b|引言"),
            ("methodology", r"(?i)\bmethod(?:s|ology)?\b|方法"),
            ("results", r"(?i)\bresults?\b|结果"),
            ("discussion", r"(?i)\bdiscussion\b|讨论"),
            ("conclusion", r"(?i)\bconclusions?\b|结论"),
        ]
        .into_iter()
        .map(|(name, pat)| (name, Regex::new(pat).expect("section pattern compiles")))
        .collect();

        Self {
            config,
            abstract_re,
            section_patterns,
        }
    }

    /// Parse a text file. Pages are form-feed separated.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedDocument, ParseError> {
        if !path.exists() {
            return Err(ParseError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| ParseError::UnreadableSource {
            message: format!("{}: {e}", path.display()),
        })?;
        self.parse_text(&text)
    }

    /// Parse raw document text. Pages are form-feed separated; a single
    /// page without separators is fine.
    pub fn parse_text(&self, text: &str) -> Result<ParsedDocument, ParseError> {
        let pages: Vec<&str> = text.split('\u{0c}').collect();
        self.parse_pages(&pages)
    }

    /// Parse pre-split per-page text.
    pub fn parse_pages(&self, pages: &[&str]) -> Result<ParsedDocument, ParseError> {
        let full_text: String = pages
            .iter()
            .map(|p| format!("{p}\n"))
            .collect::<Vec<_>>()
            .join("");

        if full_text.trim().is_empty() {
            return Err(ParseError::EmptyDocument);
        }

        let first_page_lines: Vec<&str> = pages
            .first()
            .map(|p| p.lines().map(str::trim).filter(|l| !l.is_empty()).collect())
            .unwrap_or_default();

        let metadata = DocumentMetadata {
            title: self.extract_title(&first_page_lines),
            authors: self.extract_authors(&first_page_lines),
            abstract_text: self.extract_abstract(&full_text),
            page_count: pages.len(),
            extracted_at: Utc::now(),
        };

        let sections = self.identify_sections(&full_text);

        Ok(ParsedDocument {
            metadata,
            sections,
            full_text,
        })
    }

    /// First leading line whose length lies within the plausible title band.
    fn extract_title(&self, first_page_lines: &[&str]) -> String {
        for line in first_page_lines.iter().take(self.config.title_scan_lines) {
            let len = line.chars().count();
            if len >= self.config.title_min_chars && len <= self.config.title_max_chars {
                return line.to_string();
            }
        }
        UNKNOWN_TITLE.to_string()
    }

    /// Leading lines containing an author-indicating token, capped.
    fn extract_authors(&self, first_page_lines: &[&str]) -> Vec<String> {
        let mut authors = Vec::new();
        for line in first_page_lines.iter().take(self.config.author_scan_lines) {
            let lower = line.to_lowercase();
            if AUTHOR_TOKENS.iter().any(|token| lower.contains(token)) {
                authors.push(line.to_string());
                if authors.len() == self.config.max_authors {
                    break;
                }
            }
        }
        if authors.is_empty() {
            vec![UNKNOWN_AUTHORS.to_string()]
        } else {
            authors
        }
    }

    /// Text bounded by the abstract marker and the next section marker,
    /// truncated to the configured maximum.
    fn extract_abstract(&self, full_text: &str) -> String {
        if let Some(caps) = self.abstract_re.captures(full_text) {
            if let Some(body) = caps.get(1) {
                let trimmed = body.as_str().trim();
                if !trimmed.is_empty() {
                    return truncate_chars(trimmed, self.config.abstract_max_chars).to_string();
                }
            }
        }
        ABSTRACT_NOT_FOUND.to_string()
    }

    /// First match per canonical section name -> fixed-size window from the
    /// match start. Unmatched names are absent, never an error.
    fn identify_sections(&self, full_text: &str) -> HashMap<String, String> {
        let mut sections = HashMap::new();
        for (name, pattern) in &self.section_patterns {
            if let Some(m) = pattern.find(full_text) {
                let window =
                    truncate_chars(&full_text[m.start()..], self.config.section_window_chars);
                sections.insert(name.to_string(), window.to_string());
            }
        }
        sections
    }
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parser() -> DocumentParser {
        DocumentParser::default()
    }

    const SAMPLE: &str = "Deep Residual Learning for Image Recognition\n\
        Kaiming He, Xiangyu Zhang, by Microsoft Research\n\
        \n\
        ABSTRACT Deeper neural networks are more difficult to train. We \
        present a residual learning framework.\n\
        INTRODUCTION Deep convolutional neural networks have led to a \
        series of breakthroughs.\n\
        METHODS We reformulate the layers as learning residual functions.\n\
        RESULTS Our 152-layer residual net wins.\n\
        CONCLUSION Residual learning is effective.\n";

    #[test]
    fn test_parse_extracts_title() {
        let doc = parser().parse_text(SAMPLE).unwrap();
        assert_eq!(
            doc.metadata.title,
            "Deep Residual Learning for Image Recognition"
        );
    }

    #[test]
    fn test_title_sentinel_when_no_plausible_line() {
        // All lines are either too short or far too long
        let long = "x".repeat(300);
        let text = format!("short\nno\n{long}\nok\n");
        let doc = parser().parse_text(&text).unwrap();
        assert_eq!(doc.metadata.title, UNKNOWN_TITLE);
    }

    #[test]
    fn test_author_lines_detected() {
        let doc = parser().parse_text(SAMPLE).unwrap();
        assert_eq!(doc.metadata.authors.len(), 1);
        assert!(doc.metadata.authors[0].contains("Microsoft Research"));
    }

    #[test]
    fn test_author_sentinel() {
        let text = "A Title That Is Long Enough\nSecond line here\n";
        let doc = parser().parse_text(text).unwrap();
        assert_eq!(doc.metadata.authors, vec![UNKNOWN_AUTHORS.to_string()]);
    }

    #[test]
    fn test_abstract_bounded_by_introduction() {
        let doc = parser().parse_text(SAMPLE).unwrap();
        assert!(doc
            .metadata
            .abstract_text
            .starts_with("Deeper neural networks"));
        assert!(!doc.metadata.abstract_text.contains("breakthroughs"));
    }

    #[test]
    fn test_abstract_sentinel() {
        let text = "A Title That Is Long Enough\nJust body text with no markers.\n";
        let doc = parser().parse_text(text).unwrap();
        assert_eq!(doc.metadata.abstract_text, ABSTRACT_NOT_FOUND);
    }

    #[test]
    fn test_abstract_truncated_to_cap() {
        let body = "w ".repeat(600);
        let text = format!("Title Line Long Enough Here\nABSTRACT {body} INTRODUCTION rest\n");
        let doc = parser().parse_text(&text).unwrap();
        assert!(doc.metadata.abstract_text.chars().count() <= 500);
    }

    #[test]
    fn test_sections_present_and_windowed() {
        let doc = parser().parse_text(SAMPLE).unwrap();
        let abstract_section = doc.sections.get("abstract").unwrap();
        assert!(abstract_section.starts_with("ABSTRACT"));
        assert!(doc.sections.contains_key("introduction"));
        assert!(doc.sections.contains_key("methodology"));
        assert!(doc.sections.contains_key("results"));
        assert!(doc.sections.contains_key("conclusion"));
        // No discussion marker in the sample
        assert!(!doc.sections.contains_key("discussion"));
    }

    #[test]
    fn test_section_window_size_bound() {
        let filler = "a".repeat(5000);
        let text = format!("Title Line Long Enough Here\nINTRODUCTION {filler}\n");
        let doc = parser().parse_text(&text).unwrap();
        let intro = doc.sections.get("introduction").unwrap();
        assert_eq!(intro.chars().count(), 2000);
    }

    #[test]
    fn test_empty_document_fails() {
        let err = parser().parse_text("   \n  ").unwrap_err();
        assert!(matches!(err, ParseError::EmptyDocument));
    }

    #[test]
    fn test_missing_file_fails() {
        let err = parser()
            .parse_file(Path::new("/nonexistent/paper.txt"))
            .unwrap_err();
        assert!(matches!(err, ParseError::FileNotFound { .. }));
    }

    #[test]
    fn test_page_count_from_form_feeds() {
        let text = "Page One Title Long Enough\nbody\u{0c}page two\u{0c}page three";
        let doc = parser().parse_text(text).unwrap();
        assert_eq!(doc.metadata.page_count, 3);
        assert!(doc.full_text.contains("page three"));
    }
}
