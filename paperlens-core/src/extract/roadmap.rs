//! Technology-roadmap unit.
//!
//! Generative strategy asks for a JSON list of roadmap nodes; the heuristic
//! fallback anchors nodes on year tokens found in the text, bounded to a
//! sane historical range.

use chrono::{Datelike, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::backend::TextGenerator;
use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::extract::{run_generative, Decoded};
use crate::patterns::{truncate_chars, years_in_range};
use crate::types::{clamp_unit, TechRoadmapNode};

const UNIT: &str = "roadmap";

/// Lower bound for heuristic year anchors.
const MIN_YEAR: i32 = 1950;
/// Maximum roadmap nodes produced by the heuristic path.
const NODE_CAP: usize = 5;

const PROMPT_HEADER: &str = "You are an expert at tracing technology evolution in research \
fields. From the paper below, reconstruct the development roadmap of its core method. \
Respond with ONLY a JSON array ordered by ascending year; each element must have the \
fields: \"method_name\" (string), \"year\" (integer), \"key_papers\" (array of strings), \
\"improvement_description\" (string), \"impact_score\" (number between 0 and 1).\n\n";

/// Builds a technology-evolution roadmap from document text.
pub struct RoadmapBuilder {
    backend: Arc<dyn TextGenerator>,
    budget_chars: usize,
    timeout_secs: u64,
}

impl RoadmapBuilder {
    pub fn new(backend: Arc<dyn TextGenerator>, config: &ExtractionConfig) -> Self {
        Self {
            backend,
            budget_chars: config.summary_budget_chars,
            timeout_secs: config.unit_timeout_secs,
        }
    }

    /// Build the roadmap, preferring the generative strategy.
    pub async fn extract(
        &self,
        title: &str,
        abstract_text: &str,
        text: &str,
    ) -> Result<Vec<TechRoadmapNode>, ExtractionError> {
        let truncated = truncate_chars(text, self.budget_chars);
        let prompt = format!(
            "{PROMPT_HEADER}Title: {title}\nAbstract: {abstract_text}\nContent:\n{truncated}"
        );

        match run_generative(
            self.backend.as_ref(),
            UNIT,
            &prompt,
            self.timeout_secs,
            validate_node,
        )
        .await
        {
            Ok(mut nodes) => {
                nodes.sort_by_key(|n| n.year);
                Ok(nodes)
            }
            Err(e) => {
                debug!(error = %e, "Generative roadmap building failed; using heuristic");
                Ok(Self::heuristic(title, text))
            }
        }
    }

    /// Deterministic fallback: one node per distinct in-range year token,
    /// ascending. The newest node carries the paper itself as a key paper.
    /// Pure function of its input.
    pub fn heuristic(title: &str, text: &str) -> Vec<TechRoadmapNode> {
        let max_year = Utc::now().year();
        let years = years_in_range(text, MIN_YEAR, max_year);

        let count = years.len().min(NODE_CAP);
        years
            .into_iter()
            .take(NODE_CAP)
            .enumerate()
            .map(|(i, year)| TechRoadmapNode {
                method_name: format!("Method {}", i + 1),
                year,
                key_papers: if i + 1 == count {
                    vec![title.to_string()]
                } else {
                    Vec::new()
                },
                improvement_description: "Incremental improvement over prior work".to_string(),
                impact_score: clamp_unit(0.5 + 0.1 * i as f64),
            })
            .collect()
    }
}

/// Strict per-element validation of a generative answer.
fn validate_node(value: &Value) -> Decoded<TechRoadmapNode> {
    match serde_json::from_value::<TechRoadmapNode>(value.clone()) {
        Ok(mut node) => {
            if node.method_name.trim().is_empty() {
                return Decoded::Rejected("empty method_name".to_string());
            }
            node.impact_score = clamp_unit(node.impact_score);
            Decoded::Ok(node)
        }
        Err(e) => Decoded::Rejected(e.to_string()),
    }
}
