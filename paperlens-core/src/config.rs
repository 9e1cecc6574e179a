//! Configuration system for Paperlens.
//!
//! Uses `figment` for layered configuration: defaults -> config file ->
//! environment. Configuration is loaded from
//! `~/.config/paperlens/config.toml` and/or an explicit path, with
//! `PAPERLENS_`-prefixed environment variables (double-underscore nesting)
//! layered on top.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level configuration for the analysis engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalystConfig {
    pub llm: LlmConfig,
    pub parser: ParserConfig,
    pub extraction: ExtractionConfig,
    pub cache: CacheConfig,
    pub registry: RegistryConfig,
}

/// Configuration for the generative-text backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name. Anything OpenAI-compatible (OpenAI, Azure, Ollama,
    /// vLLM, LM Studio) routes to the same client.
    pub provider: String,
    /// Model identifier sent in the request body.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Explicit API key; takes precedence over `api_key_env` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override (e.g. `http://localhost:11434/v1` for Ollama).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "PAPERLENS_API_KEY".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.3,
            max_tokens: 4096,
            request_timeout_secs: 120,
        }
    }
}

/// Tunables for the document parser's layout heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Number of leading first-page lines scanned for a title.
    pub title_scan_lines: usize,
    /// Minimum plausible title length in characters.
    pub title_min_chars: usize,
    /// Maximum plausible title length in characters.
    pub title_max_chars: usize,
    /// Number of leading first-page lines scanned for author markers.
    pub author_scan_lines: usize,
    /// Maximum number of author lines collected.
    pub max_authors: usize,
    /// Maximum abstract length in characters.
    pub abstract_max_chars: usize,
    /// Size of the text window captured after each section marker.
    pub section_window_chars: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            title_scan_lines: 5,
            title_min_chars: 10,
            title_max_chars: 200,
            author_scan_lines: 15,
            max_authors: 5,
            abstract_max_chars: 500,
            section_window_chars: 2000,
        }
    }
}

/// Tunables shared by the four extraction units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Character budget for full-document units (formula extraction).
    pub full_text_budget_chars: usize,
    /// Character budget for title/abstract-centric units.
    pub summary_budget_chars: usize,
    /// Per-unit backend call timeout in seconds. A timed-out call falls
    /// back to the unit's heuristic strategy.
    pub unit_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            full_text_budget_chars: 20_000,
            summary_budget_chars: 10_000,
            unit_timeout_secs: 60,
        }
    }
}

/// Configuration for the result cache collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Default time-to-live for cached analyses, in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
        }
    }
}

/// Configuration for the task registry collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Maximum retained task records; the oldest are evicted beyond this.
    pub max_records: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_records: 1024 }
    }
}

/// Default user-level config file location.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "paperlens")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load the configuration with layering: defaults -> user config file ->
/// explicit file -> environment (`PAPERLENS_`, `__` for nesting).
pub fn load_config(explicit_path: Option<&Path>) -> Result<AnalystConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AnalystConfig::default()));

    if let Some(user_config) = default_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(path) = explicit_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("PAPERLENS_").split("__"));

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AnalystConfig::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.temperature, 0.3);
        assert_eq!(config.extraction.full_text_budget_chars, 20_000);
        assert_eq!(config.extraction.summary_budget_chars, 10_000);
        assert_eq!(config.extraction.unit_timeout_secs, 60);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert!(config.cache.enabled);
        assert_eq!(config.registry.max_records, 1024);
        assert_eq!(config.parser.title_min_chars, 10);
        assert_eq!(config.parser.title_max_chars, 200);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[llm]\nmodel = \"qwen2.5:14b\"\nbase_url = \"http://localhost:11434/v1\"\n\n[cache]\nttl_secs = 60"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.llm.model, "qwen2.5:14b");
        assert_eq!(
            config.llm.base_url.as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(config.cache.ttl_secs, 60);
        // Untouched sections keep their defaults
        assert_eq!(config.parser.section_window_chars, 2000);
    }

    #[test]
    fn test_env_override_with_nesting() {
        std::env::set_var("PAPERLENS_EXTRACTION__UNIT_TIMEOUT_SECS", "7");
        let config = load_config(None).unwrap();
        std::env::remove_var("PAPERLENS_EXTRACTION__UNIT_TIMEOUT_SECS");
        assert_eq!(config.extraction.unit_timeout_secs, 7);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = AnalystConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let back: AnalystConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.llm.model, config.llm.model);
        assert_eq!(back.registry.max_records, config.registry.max_records);
    }
}
