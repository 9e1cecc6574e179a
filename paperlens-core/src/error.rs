//! Error types for the Paperlens analysis core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering parsing, extraction, generative-backend, and pipeline domains.
//!
//! Propagation policy: `ParseError` and `PipelineError::Assembly` are fatal
//! and surface to the caller; `ExtractionError` is contained at the unit
//! boundary and reduced to the unit's typed empty default. The core performs
//! no automatic retries anywhere.

use std::path::PathBuf;

/// Top-level error type for the Paperlens core library.
#[derive(Debug, thiserror::Error)]
pub enum PaperlensError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the document parser. Always fatal for the pipeline: no
/// partial analysis is produced without a parsed document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Source file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read source: {message}")]
    UnreadableSource { message: String },

    #[error("Document contains no extractable text")]
    EmptyDocument,

    #[error("Unsupported source kind: {kind}")]
    UnsupportedSource { kind: String },
}

/// Errors from generative-backend interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from a single extraction unit. Never fatal: the orchestrator
/// replaces a failed unit's output with that unit's empty default.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Unit '{unit}' backend call failed: {source}")]
    Backend {
        unit: &'static str,
        #[source]
        source: LlmError,
    },

    #[error("Unit '{unit}' produced no decodable output")]
    NoDecodableOutput { unit: &'static str },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors the pipeline itself can return from `analyze`.
///
/// Distinguishes the two fatal conditions: a parser failure (no document to
/// analyze) and an unexpected fault while assembling the aggregate. Tolerated
/// per-unit extraction failures never appear here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Document parsing failed: {0}")]
    Parse(#[from] ParseError),

    #[error("Result assembly failed: {message}")]
    Assembly { message: String },
}

/// A type alias for results using the top-level `PaperlensError`.
pub type Result<T> = std::result::Result<T, PaperlensError>;
