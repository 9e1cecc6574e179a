//! Fundamental data types for the Paperlens analysis pipeline.
//!
//! The aggregate root is [`PaperAnalysis`]; everything else is either an
//! intermediate produced by the document parser ([`ParsedDocument`]) or one
//! of the typed results produced by the four extraction units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Clamp a score into the `[0, 1]` range.
///
/// Every float score field in the data model passes through this before it
/// is stored. NaN clamps to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// The inbound document reference handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaperSource {
    /// A local file containing extracted document text. Pages are
    /// form-feed (`\x0c`) separated.
    File { path: PathBuf },
    /// An arXiv identifier, e.g. `"1234.5678"`.
    Arxiv { id: String },
    /// A DOI, e.g. `"10.1000/xyz123"`.
    Doi { id: String },
    /// Title only; no document body is available.
    TitleOnly { title: String },
}

impl PaperSource {
    /// Content-addressed cache key for externally identified documents.
    ///
    /// File and title-only sources have no stable external identity and are
    /// never cached.
    pub fn cache_key(&self) -> Option<String> {
        match self {
            PaperSource::Arxiv { id } => Some(format!("paper:arxiv:{id}")),
            PaperSource::Doi { id } => Some(format!("paper:doi:{id}")),
            PaperSource::File { .. } | PaperSource::TitleOnly { .. } => None,
        }
    }
}

/// Metadata recovered from the head of a document by layout heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub page_count: usize,
    pub extracted_at: DateTime<Utc>,
}

/// A document after heuristic structuring. Immutable once built; the
/// orchestrator shares it by reference across the four extraction units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub metadata: DocumentMetadata,
    /// Canonical section name -> fixed-window text excerpt. Sections whose
    /// marker was not found are simply absent.
    pub sections: HashMap<String, String>,
    pub full_text: String,
}

/// Category of an extracted mathematical model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaType {
    Equation,
    Theorem,
    Algorithm,
    Property,
}

/// A mathematical model extracted from the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MathModel {
    pub formula_name: String,
    pub latex: String,
    pub description: String,
    pub formula_type: FormulaType,
    pub location: String,
    /// Importance score in `[0, 1]`.
    pub importance: f64,
}

/// Research-domain classification for the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainInfo {
    pub primary_field: String,
    pub sub_fields: Vec<String>,
    pub keywords: Vec<String>,
    pub related_fields: Vec<String>,
    /// Classification confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Role a cited scholar plays in the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScholarRole {
    Founder,
    Pioneer,
    Contributor,
}

/// A scholar identified in the document's citations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScholarInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_count: Option<u64>,
    #[serde(default)]
    pub representative_works: Vec<String>,
    pub role: ScholarRole,
}

/// One node on the technology-evolution roadmap, ordered by ascending year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechRoadmapNode {
    pub method_name: String,
    pub year: i32,
    #[serde(default)]
    pub key_papers: Vec<String>,
    pub improvement_description: String,
    /// Impact score in `[0, 1]`.
    pub impact_score: f64,
}

/// Pipeline state for one analysis run.
///
/// `Failed` is reachable from `Parsing` only; extraction-unit failures are
/// contained and never flip the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Parsing,
    Analyzing,
    Assembling,
    Completed,
    Failed,
}

impl AnalysisStatus {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Parsing => "parsing",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Assembling => "assembling",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// The aggregate analysis record: one per successful pipeline run,
/// immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperAnalysis {
    pub paper_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub year: i32,

    pub math_models: Vec<MathModel>,
    pub domain_info: Option<DomainInfo>,
    pub key_scholars: Vec<ScholarInfo>,
    pub tech_roadmap: Vec<TechRoadmapNode>,

    pub innovation_points: Vec<String>,
    pub limitations: Vec<String>,
    /// Reproducibility score in `[0, 1]`.
    pub reproducibility_score: f64,

    pub citations_count: u64,
    pub references_count: u64,

    pub status: AnalysisStatus,
    pub created_at: DateTime<Utc>,
    pub analysis_duration_seconds: f64,
    pub summary: String,
}

/// Registry entry for one asynchronous analysis task.
///
/// Mutated only by the single orchestrator run owning its `task_id`;
/// uniqueness of ids at submission rules out concurrent writers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub status: AnalysisStatus,
    /// Coarse progress in `0..=100`.
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<PaperAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TaskRecord {
    /// A fresh record in the `Pending` state.
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: AnalysisStatus::Pending,
            progress: 0,
            result: None,
            error: None,
            created_at: Utc::now(),
        }
    }
}
