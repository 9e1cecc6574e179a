//! Analysis orchestrator: drives the end-to-end pipeline.
//!
//! Pipeline states: Pending -> Parsing -> Analyzing -> Assembling ->
//! Completed, with Failed reachable from Parsing only. A parser failure is
//! fatal; extraction-unit failures are contained at the fan-out boundary
//! and replaced with each unit's typed empty default, so a degraded
//! analysis still completes. Any unexpected fault during assembly
//! propagates to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::TextGenerator;
use crate::cache::ResultCache;
use crate::config::AnalystConfig;
use crate::error::PipelineError;
use crate::extract::{DomainClassifier, FormulaExtractor, RoadmapBuilder, ScholarIdentifier};
use crate::parser::{DocumentParser, UNKNOWN_TITLE};
use crate::patterns::{first_year, keyword_fraction, keyword_hits, truncate_chars};
use crate::registry::{TaskRegistry, TaskUpdate};
use crate::types::{
    AnalysisStatus, DocumentMetadata, DomainInfo, MathModel, PaperAnalysis, PaperSource,
    ParsedDocument, ScholarInfo, TechRoadmapNode,
};

/// Keywords signaling a claimed contribution.
const INNOVATION_KEYWORDS: &[&str] = &["novel", "new", "propose", "first", "innovative"];
/// Keywords signaling acknowledged weaknesses.
const LIMITATION_KEYWORDS: &[&str] = &["limitation", "challenge", "future work"];
/// Keywords signaling reproducibility support.
const REPRODUCIBILITY_KEYWORDS: &[&str] =
    &["code", "dataset", "github", "implementation", "reproducible"];

/// Cap on derived innovation/limitation lines.
const DERIVED_LINE_CAP: usize = 5;
/// Title truncation length in the summary template.
const SUMMARY_TITLE_CHARS: usize = 50;

/// Typed results of the four-unit fan-out after failure reduction.
struct UnitResults {
    math_models: Vec<MathModel>,
    domain_info: Option<DomainInfo>,
    key_scholars: Vec<ScholarInfo>,
    tech_roadmap: Vec<TechRoadmapNode>,
}

/// Coordinates parsing, concurrent extraction, and result assembly.
pub struct Orchestrator {
    config: AnalystConfig,
    parser: DocumentParser,
    formulas: FormulaExtractor,
    domain: DomainClassifier,
    scholars: ScholarIdentifier,
    roadmap: RoadmapBuilder,
    registry: Arc<dyn TaskRegistry>,
    cache: Arc<dyn ResultCache>,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn TextGenerator>,
        config: AnalystConfig,
        registry: Arc<dyn TaskRegistry>,
        cache: Arc<dyn ResultCache>,
    ) -> Self {
        let parser = DocumentParser::new(config.parser.clone());
        let formulas = FormulaExtractor::new(backend.clone(), &config.extraction);
        let domain = DomainClassifier::new(backend.clone(), &config.extraction);
        let scholars = ScholarIdentifier::new(backend.clone(), &config.extraction);
        let roadmap = RoadmapBuilder::new(backend, &config.extraction);
        Self {
            config,
            parser,
            formulas,
            domain,
            scholars,
            roadmap,
            registry,
            cache,
        }
    }

    /// Generate a unique task id for a new submission.
    pub fn new_task_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Run the full pipeline for one document.
    ///
    /// The only errors this returns are a fatal parse failure and an
    /// assembly fault; extraction failures degrade the result instead.
    pub async fn analyze(&self, source: &PaperSource) -> Result<PaperAnalysis, PipelineError> {
        let started = Instant::now();

        let document = self.parse_source(source)?;
        info!(
            title = %document.metadata.title,
            pages = document.metadata.page_count,
            "Document parsed; starting concurrent extraction"
        );

        let units = self.run_units(&document).await;
        self.assemble(&document, units, started)
    }

    /// Run the pipeline with cache consultation: a hit short-circuits
    /// parsing and extraction entirely; a successful run populates the
    /// cache when the source has a stable external identity.
    pub async fn analyze_with_cache(
        &self,
        source: &PaperSource,
    ) -> Result<PaperAnalysis, PipelineError> {
        let cache_key = source.cache_key().filter(|_| self.config.cache.enabled);

        if let Some(ref key) = cache_key {
            if let Some(value) = self.cache.get(key).await {
                match serde_json::from_value::<PaperAnalysis>(value) {
                    Ok(analysis) => {
                        info!(key = %key, "Cache hit; skipping analysis");
                        return Ok(analysis);
                    }
                    Err(e) => {
                        warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    }
                }
            }
        }

        let analysis = self.analyze(source).await?;

        if let Some(ref key) = cache_key {
            let value =
                serde_json::to_value(&analysis).map_err(|e| PipelineError::Assembly {
                    message: format!("Failed to encode analysis for caching: {e}"),
                })?;
            self.cache
                .set(key, value, Duration::from_secs(self.config.cache.ttl_secs))
                .await;
        }

        Ok(analysis)
    }

    /// Drive one registered task end to end, checkpointing the registry at
    /// coarse progress points. Never returns an error: failures land in the
    /// task record.
    pub async fn execute_task(&self, task_id: &str, source: &PaperSource) {
        self.registry.create(task_id).await;

        let cache_key = source.cache_key().filter(|_| self.config.cache.enabled);
        if let Some(ref key) = cache_key {
            if let Some(value) = self.cache.get(key).await {
                if let Ok(analysis) = serde_json::from_value::<PaperAnalysis>(value) {
                    info!(task = task_id, key = %key, "Cache hit; task completed immediately");
                    self.registry
                        .update(task_id, TaskUpdate::completed(analysis))
                        .await;
                    return;
                }
            }
        }

        let started = Instant::now();
        self.registry
            .update(task_id, TaskUpdate::status(AnalysisStatus::Parsing, 10))
            .await;

        let document = match self.parse_source(source) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(task = task_id, error = %e, "Task failed during parsing");
                self.registry
                    .update(task_id, TaskUpdate::failed(e.to_string()))
                    .await;
                return;
            }
        };

        self.registry
            .update(task_id, TaskUpdate::status(AnalysisStatus::Analyzing, 40))
            .await;
        let units = self.run_units(&document).await;

        self.registry
            .update(task_id, TaskUpdate::status(AnalysisStatus::Assembling, 80))
            .await;
        match self.assemble(&document, units, started) {
            Ok(analysis) => {
                if let Some(ref key) = cache_key {
                    if let Ok(value) = serde_json::to_value(&analysis) {
                        self.cache
                            .set(key, value, Duration::from_secs(self.config.cache.ttl_secs))
                            .await;
                    }
                }
                self.registry
                    .update(task_id, TaskUpdate::completed(analysis))
                    .await;
            }
            Err(e) => {
                self.registry
                    .update(task_id, TaskUpdate::failed(e.to_string()))
                    .await;
            }
        }
    }

    /// Resolve a `PaperSource` into a parsed document.
    ///
    /// File sources go through the full layout heuristics. External-id and
    /// title-only sources have no fetched body in this core (document
    /// retrieval is a transport concern) and yield a metadata-only stub.
    fn parse_source(&self, source: &PaperSource) -> Result<ParsedDocument, PipelineError> {
        match source {
            PaperSource::File { path } => Ok(self.parser.parse_file(path)?),
            PaperSource::Arxiv { id } | PaperSource::Doi { id } => {
                Ok(Self::stub_document(&format!("Paper {id}")))
            }
            PaperSource::TitleOnly { title } => Ok(Self::stub_document(title)),
        }
    }

    fn stub_document(title: &str) -> ParsedDocument {
        let title = if title.trim().is_empty() {
            UNKNOWN_TITLE.to_string()
        } else {
            title.to_string()
        };
        ParsedDocument {
            metadata: DocumentMetadata {
                title,
                authors: Vec::new(),
                abstract_text: String::new(),
                page_count: 0,
                extracted_at: chrono::Utc::now(),
            },
            sections: Default::default(),
            full_text: String::new(),
        }
    }

    /// Fan the four extraction units out concurrently and reduce their
    /// typed results, mapping any unit failure to that unit's empty
    /// default. One unit's failure never cancels or delays the others.
    async fn run_units(&self, document: &ParsedDocument) -> UnitResults {
        let title = document.metadata.title.as_str();
        let abstract_text = document.metadata.abstract_text.as_str();
        let text = document.full_text.as_str();

        let (math_models, domain_info, key_scholars, tech_roadmap) = tokio::join!(
            self.formulas.extract(title, abstract_text, text),
            self.domain.extract(title, abstract_text, text),
            self.scholars.extract(title, abstract_text, text),
            self.roadmap.extract(title, abstract_text, text),
        );

        UnitResults {
            math_models: math_models.unwrap_or_else(|e| {
                warn!(unit = "formulas", error = %e, "Extraction unit failed; using empty default");
                Vec::new()
            }),
            domain_info: domain_info.unwrap_or_else(|e| {
                warn!(unit = "domain", error = %e, "Extraction unit failed; using empty default");
                None
            }),
            key_scholars: key_scholars.unwrap_or_else(|e| {
                warn!(unit = "scholars", error = %e, "Extraction unit failed; using empty default");
                Vec::new()
            }),
            tech_roadmap: tech_roadmap.unwrap_or_else(|e| {
                warn!(unit = "roadmap", error = %e, "Extraction unit failed; using empty default");
                Vec::new()
            }),
        }
    }

    /// Build the aggregate record and its derived fields.
    fn assemble(
        &self,
        document: &ParsedDocument,
        units: UnitResults,
        started: Instant,
    ) -> Result<PaperAnalysis, PipelineError> {
        let full_text = &document.full_text;
        let duration = started.elapsed().as_secs_f64();

        let analysis = PaperAnalysis {
            paper_id: Uuid::new_v4().to_string(),
            title: document.metadata.title.clone(),
            authors: document.metadata.authors.clone(),
            abstract_text: document.metadata.abstract_text.clone(),
            year: extract_year(full_text),
            math_models: units.math_models,
            domain_info: units.domain_info,
            key_scholars: units.key_scholars,
            tech_roadmap: units.tech_roadmap,
            innovation_points: derive_lines(full_text, INNOVATION_KEYWORDS, "Mentions"),
            limitations: derive_lines(full_text, LIMITATION_KEYWORDS, "Discusses"),
            reproducibility_score: keyword_fraction(full_text, REPRODUCIBILITY_KEYWORDS),
            citations_count: 0,
            references_count: 0,
            status: AnalysisStatus::Completed,
            created_at: chrono::Utc::now(),
            analysis_duration_seconds: duration,
            summary: summarize(&document.metadata.title),
        };

        info!(
            paper_id = %analysis.paper_id,
            duration_secs = format!("{duration:.2}"),
            "Analysis assembled"
        );
        Ok(analysis)
    }
}

/// One descriptive line per signaling keyword present in the text, capped.
fn derive_lines(full_text: &str, vocabulary: &[&str], verb: &str) -> Vec<String> {
    keyword_hits(full_text, vocabulary)
        .into_iter()
        .take(DERIVED_LINE_CAP)
        .map(|kw| format!("{verb} '{kw}'"))
        .collect()
}

/// First plausible year token in the text, defaulting to the current year.
fn extract_year(full_text: &str) -> i32 {
    use chrono::Datelike;
    first_year(full_text).unwrap_or_else(|| chrono::Utc::now().year())
}

/// Fixed-template summary embedding a truncated title.
fn summarize(title: &str) -> String {
    format!(
        "Analysis of paper: {}...",
        truncate_chars(title, SUMMARY_TITLE_CHARS)
    )
}
