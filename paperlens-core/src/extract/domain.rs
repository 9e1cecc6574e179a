//! Research-domain classification unit.
//!
//! Generative strategy asks for a single JSON object; the heuristic
//! fallback scores fixed keyword buckets over the title and abstract.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::backend::TextGenerator;
use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::extract::{run_generative, Decoded};
use crate::patterns::{keyword_score, truncate_chars};
use crate::types::{clamp_unit, DomainInfo};

const UNIT: &str = "domain";

/// Keyword buckets mapping vocabulary to a primary field. Evaluated in
/// order; the first strictly-highest score wins.
const DOMAIN_BUCKETS: &[(&str, &[&str])] = &[
    (
        "Computer Vision",
        &["image", "vision", "visual", "detect", "segment", "pose"],
    ),
    (
        "Natural Language Processing",
        &["language", "nlp", "text", "semantic", "parsing", "translation"],
    ),
    (
        "Machine Learning",
        &["learning", "neural", "network", "deep", "model", "algorithm"],
    ),
    (
        "Reinforcement Learning",
        &["reinforcement", "reward", "policy", "agent"],
    ),
];

/// Confidence assigned to heuristic classifications.
const HEURISTIC_CONFIDENCE: f64 = 0.6;
/// Keyword list cap for the heuristic path.
const HEURISTIC_KEYWORD_CAP: usize = 10;

const PROMPT_HEADER: &str = "You are an expert at classifying scholarly papers by research \
field. Analyze the paper below and respond with ONLY a JSON object with the fields: \
\"primary_field\" (string), \"sub_fields\" (array of 3-5 strings), \"keywords\" (array of \
5-10 strings), \"related_fields\" (array of 2-3 strings), \"confidence\" (number between \
0 and 1).\n\n";

/// Classifies a document's research domain.
pub struct DomainClassifier {
    backend: Arc<dyn TextGenerator>,
    budget_chars: usize,
    timeout_secs: u64,
}

impl DomainClassifier {
    pub fn new(backend: Arc<dyn TextGenerator>, config: &ExtractionConfig) -> Self {
        Self {
            backend,
            budget_chars: config.summary_budget_chars,
            timeout_secs: config.unit_timeout_secs,
        }
    }

    /// Classify the document, preferring the generative strategy. Returns
    /// `None` only for degenerate input on the heuristic path.
    pub async fn extract(
        &self,
        title: &str,
        abstract_text: &str,
        text: &str,
    ) -> Result<Option<DomainInfo>, ExtractionError> {
        let truncated = truncate_chars(text, self.budget_chars);
        let prompt = format!(
            "{PROMPT_HEADER}Title: {title}\nAbstract: {abstract_text}\nContent:\n{truncated}"
        );

        match run_generative(
            self.backend.as_ref(),
            UNIT,
            &prompt,
            self.timeout_secs,
            validate_domain,
        )
        .await
        {
            Ok(mut infos) => Ok(Some(infos.remove(0))),
            Err(e) => {
                debug!(error = %e, "Generative domain classification failed; using heuristic");
                Ok(Self::heuristic(title, abstract_text))
            }
        }
    }

    /// Deterministic fallback: keyword-bucket scoring over title+abstract.
    /// Pure function of its input; `None` when no bucket scores at all.
    pub fn heuristic(title: &str, abstract_text: &str) -> Option<DomainInfo> {
        let combined = format!("{title} {abstract_text}");

        let mut best: Option<(&str, usize)> = None;
        for (field, vocabulary) in DOMAIN_BUCKETS {
            let score = keyword_score(&combined, vocabulary);
            if score > 0 && best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((field, score));
            }
        }
        let (primary_field, _) = best?;

        let keywords: Vec<String> = combined
            .split_whitespace()
            .filter(|w| w.chars().count() > 4)
            .take(HEURISTIC_KEYWORD_CAP)
            .map(|w| w.to_string())
            .collect();

        Some(DomainInfo {
            primary_field: primary_field.to_string(),
            sub_fields: Vec::new(),
            keywords,
            related_fields: Vec::new(),
            confidence: HEURISTIC_CONFIDENCE,
        })
    }
}

/// Strict validation of a generative answer object.
fn validate_domain(value: &Value) -> Decoded<DomainInfo> {
    match serde_json::from_value::<DomainInfo>(value.clone()) {
        Ok(mut info) => {
            if info.primary_field.trim().is_empty() {
                return Decoded::Rejected("empty primary_field".to_string());
            }
            info.confidence = clamp_unit(info.confidence);
            Decoded::Ok(info)
        }
        Err(e) => Decoded::Rejected(e.to_string()),
    }
}
