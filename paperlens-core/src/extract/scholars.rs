//! Scholar identification unit.
//!
//! Generative strategy asks for a JSON list of scholars; the heuristic
//! fallback scans for `Name et al.` and `Name, YYYY` citation patterns.

use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::backend::TextGenerator;
use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::extract::{run_generative, Decoded};
use crate::patterns::truncate_chars;
use crate::types::{ScholarInfo, ScholarRole};

const UNIT: &str = "scholars";

/// Name candidates collected by the heuristic scan before the scholar cap.
const NAME_CAP: usize = 10;
/// Maximum scholars returned by the heuristic path.
const SCHOLAR_CAP: usize = 5;

const PROMPT_HEADER: &str = "You are an expert at identifying key scholars cited in \
scholarly papers. List the most important researchers referenced in the text below. \
Respond with ONLY a JSON array; each element must have the fields: \"name\" (string), \
\"representative_works\" (array of strings), \"role\" (one of \"founder\", \"pioneer\", \
\"contributor\"); optionally \"affiliation\" (string), \"h_index\" (integer), \
\"citation_count\" (integer).\n\n";

/// Identifies cited scholars in document text.
pub struct ScholarIdentifier {
    backend: Arc<dyn TextGenerator>,
    budget_chars: usize,
    timeout_secs: u64,
    citation_patterns: Vec<Regex>,
}

impl ScholarIdentifier {
    pub fn new(backend: Arc<dyn TextGenerator>, config: &ExtractionConfig) -> Self {
        let citation_patterns = vec![
            Regex::new(r"([A-Z][a-z]+\s+[A-Z][a-z]+)\s+et\s+al").expect("et-al pattern compiles"),
            Regex::new(r"([A-Z][a-z]+\s+[A-Z][a-z]+),\s+(?:19|20)\d{2}")
                .expect("name-year pattern compiles"),
        ];
        Self {
            backend,
            budget_chars: config.summary_budget_chars,
            timeout_secs: config.unit_timeout_secs,
            citation_patterns,
        }
    }

    /// Identify scholars, preferring the generative strategy.
    pub async fn extract(
        &self,
        title: &str,
        abstract_text: &str,
        text: &str,
    ) -> Result<Vec<ScholarInfo>, ExtractionError> {
        let truncated = truncate_chars(text, self.budget_chars);
        let prompt = format!(
            "{PROMPT_HEADER}Title: {title}\nAbstract: {abstract_text}\nContent:\n{truncated}"
        );

        match run_generative(
            self.backend.as_ref(),
            UNIT,
            &prompt,
            self.timeout_secs,
            validate_scholar,
        )
        .await
        {
            Ok(scholars) => Ok(scholars),
            Err(e) => {
                debug!(error = %e, "Generative scholar identification failed; using heuristic");
                Ok(self.heuristic(text))
            }
        }
    }

    /// Deterministic fallback: citation-pattern scan with first-seen-order
    /// name dedup. Pure function of the text.
    pub fn heuristic(&self, text: &str) -> Vec<ScholarInfo> {
        let mut names: Vec<String> = Vec::new();
        for pattern in &self.citation_patterns {
            for caps in pattern.captures_iter(text) {
                if names.len() >= NAME_CAP {
                    break;
                }
                if let Some(name) = caps.get(1) {
                    let name = name.as_str().trim();
                    if name.chars().count() > 5 && !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                }
            }
        }

        names
            .into_iter()
            .take(SCHOLAR_CAP)
            .map(|name| ScholarInfo {
                name,
                affiliation: None,
                h_index: None,
                citation_count: None,
                representative_works: Vec::new(),
                role: ScholarRole::Contributor,
            })
            .collect()
    }
}

/// Strict per-element validation of a generative answer.
fn validate_scholar(value: &Value) -> Decoded<ScholarInfo> {
    match serde_json::from_value::<ScholarInfo>(value.clone()) {
        Ok(scholar) => {
            if scholar.name.trim().is_empty() {
                return Decoded::Rejected("empty name".to_string());
            }
            Decoded::Ok(scholar)
        }
        Err(e) => Decoded::Rejected(e.to_string()),
    }
}
