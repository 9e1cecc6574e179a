//! Formula extraction unit.
//!
//! Generative strategy asks for a JSON list of math models; the heuristic
//! fallback collects LaTeX-delimited spans from the raw text.

use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::backend::TextGenerator;
use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::extract::{run_generative, Decoded};
use crate::patterns::truncate_chars;
use crate::types::{clamp_unit, FormulaType, MathModel};

const UNIT: &str = "formulas";

/// Maximum formulas collected by the heuristic path.
const HEURISTIC_CAP: usize = 10;

const PROMPT_HEADER: &str = "You are an expert at extracting mathematical content from \
scholarly papers. Identify the important mathematical models, formulas, and algorithms \
in the text below. Respond with ONLY a JSON array; each element must have the fields: \
\"formula_name\" (string), \"latex\" (string, LaTeX), \"description\" (string), \
\"formula_type\" (one of \"equation\", \"theorem\", \"algorithm\", \"property\"), \
\"location\" (string), \"importance\" (number between 0 and 1).\n\nText:\n";

/// Extracts mathematical models from document text.
pub struct FormulaExtractor {
    backend: Arc<dyn TextGenerator>,
    budget_chars: usize,
    timeout_secs: u64,
    latex_re: Regex,
}

impl FormulaExtractor {
    pub fn new(backend: Arc<dyn TextGenerator>, config: &ExtractionConfig) -> Self {
        Self {
            backend,
            budget_chars: config.full_text_budget_chars,
            timeout_secs: config.unit_timeout_secs,
            // Display spans first so `$$...$$` is not consumed as two
            // empty inline spans.
            latex_re: Regex::new(r"\$\$(.+?)\$\$|\$([^$\n]+)\$")
                .expect("latex pattern compiles"),
        }
    }

    /// Extract math models, preferring the generative strategy.
    pub async fn extract(
        &self,
        _title: &str,
        _abstract_text: &str,
        text: &str,
    ) -> Result<Vec<MathModel>, ExtractionError> {
        let truncated = truncate_chars(text, self.budget_chars);
        let prompt = format!("{PROMPT_HEADER}{truncated}");

        match run_generative(
            self.backend.as_ref(),
            UNIT,
            &prompt,
            self.timeout_secs,
            validate_model,
        )
        .await
        {
            Ok(models) => Ok(models),
            Err(e) => {
                debug!(error = %e, "Generative formula extraction failed; using heuristic");
                Ok(self.heuristic(text))
            }
        }
    }

    /// Deterministic fallback: LaTeX-delimited spans in discovery order.
    /// Pure function of the text; returns empty for degenerate input.
    pub fn heuristic(&self, text: &str) -> Vec<MathModel> {
        let mut models = Vec::new();
        for caps in self.latex_re.captures_iter(text) {
            if models.len() >= HEURISTIC_CAP {
                break;
            }
            let (latex, offset) = match (caps.get(1), caps.get(2)) {
                (Some(display), _) => (display.as_str().trim(), display.start()),
                (None, Some(inline)) => (inline.as_str().trim(), inline.start()),
                (None, None) => continue,
            };
            if latex.is_empty() {
                continue;
            }
            models.push(MathModel {
                formula_name: format!("Formula {}", models.len() + 1),
                latex: latex.to_string(),
                description: "Extracted formula".to_string(),
                formula_type: FormulaType::Equation,
                location: format!("text offset {offset}"),
                importance: 0.5,
            });
        }
        models
    }
}

/// Strict per-element validation of a generative answer.
fn validate_model(value: &Value) -> Decoded<MathModel> {
    match serde_json::from_value::<MathModel>(value.clone()) {
        Ok(mut model) => {
            if model.latex.trim().is_empty() {
                return Decoded::Rejected("empty latex field".to_string());
            }
            model.importance = clamp_unit(model.importance);
            Decoded::Ok(model)
        }
        Err(e) => Decoded::Rejected(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockTextGenerator;
    use serde_json::json;

    fn extractor(backend: MockTextGenerator) -> FormulaExtractor {
        FormulaExtractor::new(Arc::new(backend), &ExtractionConfig::default())
    }

    #[tokio::test]
    async fn test_generative_path() {
        let response = json!([{
            "formula_name": "Cross-entropy loss",
            "latex": "\\mathcal{L} = -\\sum y \\log(\\hat{y})",
            "description": "Classification loss",
            "formula_type": "equation",
            "location": "Section 3.2",
            "importance": 0.9
        }])
        .to_string();
        let unit = extractor(MockTextGenerator::with_response(&response));
        let models = unit.extract("t", "a", "body").await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].formula_name, "Cross-entropy loss");
        assert_eq!(models[0].formula_type, FormulaType::Equation);
    }

    #[tokio::test]
    async fn test_generative_importance_clamped() {
        let response = json!([{
            "formula_name": "F",
            "latex": "x",
            "description": "d",
            "formula_type": "theorem",
            "location": "p1",
            "importance": 3.5
        }])
        .to_string();
        let unit = extractor(MockTextGenerator::with_response(&response));
        let models = unit.extract("t", "a", "body").await.unwrap();
        assert_eq!(models[0].importance, 1.0);
    }

    #[tokio::test]
    async fn test_backend_failure_falls_back_to_heuristic() {
        let unit = extractor(MockTextGenerator::failing());
        let text = "Energy: $E=mc^2$ and loss $$\\mathcal{L}=-\\sum y\\log\\hat y$$ end";
        let models = unit.extract("t", "a", text).await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].latex, "E=mc^2");
        assert_eq!(models[1].latex, "\\mathcal{L}=-\\sum y\\log\\hat y");
    }

    #[tokio::test]
    async fn test_hung_backend_falls_back_to_heuristic() {
        let config = ExtractionConfig {
            unit_timeout_secs: 1,
            ..ExtractionConfig::default()
        };
        let unit = FormulaExtractor::new(Arc::new(crate::backend::StalledTextGenerator), &config);
        let models = unit.extract("t", "a", "inline $E=mc^2$ here").await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].latex, "E=mc^2");
    }

    #[tokio::test]
    async fn test_garbage_response_falls_back_to_heuristic() {
        let unit = extractor(MockTextGenerator::with_response("no formulas found, sorry"));
        let models = unit.extract("t", "a", "inline $a+b$ here").await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].latex, "a+b");
    }

    #[test]
    fn test_heuristic_idempotent() {
        let unit = extractor(MockTextGenerator::new());
        let text = "span $x^2$ and $$y = mx + b$$";
        let first = unit.heuristic(text);
        let second = unit.heuristic(text);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.latex, b.latex);
            assert_eq!(a.location, b.location);
        }
    }

    #[test]
    fn test_heuristic_empty_input() {
        let unit = extractor(MockTextGenerator::new());
        assert!(unit.heuristic("").is_empty());
        assert!(unit.heuristic("plain prose with no math").is_empty());
    }

    #[test]
    fn test_heuristic_cap() {
        let unit = extractor(MockTextGenerator::new());
        let text = (0..20).map(|i| format!("${i}+x$ ")).collect::<String>();
        assert_eq!(unit.heuristic(&text).len(), 10);
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let v = json!({ "latex": "x" });
        assert!(matches!(validate_model(&v), Decoded::Rejected(_)));
    }

    #[test]
    fn test_validate_rejects_empty_latex() {
        let v = json!({
            "formula_name": "F", "latex": "  ", "description": "d",
            "formula_type": "equation", "location": "p", "importance": 0.5
        });
        assert!(matches!(validate_model(&v), Decoded::Rejected(_)));
    }
}
