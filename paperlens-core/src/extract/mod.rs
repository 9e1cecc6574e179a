//! Extraction units: generative-then-heuristic fallback.
//!
//! Each of the four units (formulas, domain, scholars, roadmap) shares one
//! protocol: truncate the input to the unit's character budget, ask the
//! generative backend for a JSON answer, recover and strictly decode the
//! JSON span element by element, and fall through to a deterministic
//! heuristic strategy when the backend fails, times out, or yields nothing
//! decodable. The heuristic strategies are pure functions of their input
//! and never fail, so every unit always returns a value.

pub mod domain;
pub mod formulas;
pub mod roadmap;
pub mod scholars;

pub use domain::DomainClassifier;
pub use formulas::FormulaExtractor;
pub use roadmap::RoadmapBuilder;
pub use scholars::ScholarIdentifier;

use crate::backend::TextGenerator;
use crate::error::{ExtractionError, LlmError};
use crate::patterns::{json_array_span, json_object_span};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Outcome of validating one decoded element: kept, or rejected with a
/// reason (rejected elements never abort the batch).
pub enum Decoded<T> {
    Ok(T),
    Rejected(String),
}

/// Run the generative strategy for one unit.
///
/// Calls the backend under a timeout, locates a JSON array or object in the
/// free-form response, and validates each element individually. Returns an
/// error when the call fails or nothing validates; the caller then falls
/// through to the unit's heuristic strategy.
pub(crate) async fn run_generative<T>(
    backend: &dyn TextGenerator,
    unit: &'static str,
    prompt: &str,
    timeout_secs: u64,
    validate: impl Fn(&Value) -> Decoded<T>,
) -> Result<Vec<T>, ExtractionError> {
    let response = match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        backend.complete(prompt),
    )
    .await
    {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => return Err(ExtractionError::Backend { unit, source: e }),
        Err(_) => {
            return Err(ExtractionError::Backend {
                unit,
                source: LlmError::Timeout { timeout_secs },
            })
        }
    };

    let parsed =
        recover_json(&response).ok_or(ExtractionError::NoDecodableOutput { unit })?;

    let elements: Vec<Value> = match parsed {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => return Err(ExtractionError::NoDecodableOutput { unit }),
    };

    let mut results = Vec::new();
    for element in &elements {
        match validate(element) {
            Decoded::Ok(item) => results.push(item),
            Decoded::Rejected(reason) => {
                warn!(unit = unit, reason = %reason, "Dropping non-conforming element");
            }
        }
    }

    if results.is_empty() {
        Err(ExtractionError::NoDecodableOutput { unit })
    } else {
        Ok(results)
    }
}

/// Recover a JSON value from free-form model text: try the greedy array
/// span first (units mostly request lists), then the greedy object span.
/// An array span that fails to parse (e.g. brackets belonging to arrays
/// nested inside an object) falls through to the object attempt.
fn recover_json(response: &str) -> Option<Value> {
    if let Some(span) = json_array_span(response) {
        if let Ok(v) = serde_json::from_str(span) {
            return Some(v);
        }
    }
    if let Some(span) = json_object_span(response) {
        if let Ok(v) = serde_json::from_str(span) {
            return Some(v);
        }
    }
    None
}
