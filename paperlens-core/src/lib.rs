//! # Paperlens Core
//!
//! Core library for the Paperlens academic-paper analysis engine.
//! Provides the document parser, the four extraction units (formulas,
//! domain, scholars, roadmap), the analysis orchestrator, and the task
//! registry and result cache it collaborates with.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod parser;
pub mod patterns;
pub mod providers;
pub mod registry;
pub mod types;

// Re-export commonly used types at the crate root.
pub use backend::{MockTextGenerator, StalledTextGenerator, TextGenerator};
pub use cache::{InMemoryResultCache, ResultCache};
pub use config::{load_config, AnalystConfig, LlmConfig};
pub use error::{PaperlensError, PipelineError, Result};
pub use orchestrator::Orchestrator;
pub use parser::DocumentParser;
pub use registry::{InMemoryTaskRegistry, TaskRegistry, TaskUpdate};
pub use types::{
    AnalysisStatus, DocumentMetadata, DomainInfo, FormulaType, MathModel, PaperAnalysis,
    PaperSource, ParsedDocument, ScholarInfo, ScholarRole, TaskRecord, TechRoadmapNode,
};
