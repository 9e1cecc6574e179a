//! Generative-backend implementations.
//!
//! The only wire implementation is `OpenAiCompatibleBackend`, which covers
//! OpenAI, Azure, Ollama, vLLM, LM Studio, and any endpoint following the
//! OpenAI chat completions format. Use [`create_backend`] to instantiate
//! from config.
//!
//! No retry logic lives here: the analysis core never retries a backend
//! call. A failed call makes the calling unit fall through to its
//! heuristic strategy instead.

pub mod openai_compat;

use crate::backend::TextGenerator;
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::sync::Arc;

pub use openai_compat::OpenAiCompatibleBackend;

/// Resolve the API key for a backend: explicit config value first, then the
/// configured environment variable. Local providers (Ollama-style base URLs)
/// fall back to a dummy bearer token.
pub fn resolve_api_key(config: &LlmConfig) -> Result<String, LlmError> {
    if let Some(ref key) = config.api_key {
        return Ok(key.clone());
    }
    if let Ok(key) = std::env::var(&config.api_key_env) {
        return Ok(key);
    }

    let is_local = config
        .base_url
        .as_ref()
        .map(|u| u.contains("localhost") || u.contains("127.0.0.1"))
        .unwrap_or(false);
    if is_local {
        tracing::debug!("No API key set for local provider; using dummy bearer token");
        return Ok("local".to_string());
    }

    Err(LlmError::AuthFailed {
        provider: format!("env var '{}' not set", config.api_key_env),
    })
}

/// Create a generative backend from configuration.
///
/// Every configured provider name routes to the OpenAI-compatible client;
/// the distinction lives in `base_url` and `model`.
pub fn create_backend(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>, LlmError> {
    let api_key = resolve_api_key(config)?;
    Ok(Arc::new(OpenAiCompatibleBackend::new_with_key(
        config, api_key,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig {
            provider: "openai".to_string(),
            model: "test-model".to_string(),
            api_key_env: "PAPERLENS_TEST_API_KEY".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.3,
            max_tokens: 1024,
            request_timeout_secs: 30,
        }
    }

    #[test]
    fn test_resolve_api_key_prefers_explicit() {
        let mut config = test_config();
        config.api_key = Some("sk-explicit".to_string());
        std::env::set_var("PAPERLENS_TEST_API_KEY", "sk-env");
        assert_eq!(resolve_api_key(&config).unwrap(), "sk-explicit");
        std::env::remove_var("PAPERLENS_TEST_API_KEY");
    }

    #[test]
    fn test_resolve_api_key_local_dummy() {
        let mut config = test_config();
        config.api_key_env = "PAPERLENS_NONEXISTENT_KEY".to_string();
        config.base_url = Some("http://localhost:11434/v1".to_string());
        assert_eq!(resolve_api_key(&config).unwrap(), "local");
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let mut config = test_config();
        config.api_key_env = "PAPERLENS_NONEXISTENT_KEY".to_string();
        let err = resolve_api_key(&config).unwrap_err();
        match err {
            LlmError::AuthFailed { provider } => {
                assert!(provider.contains("PAPERLENS_NONEXISTENT_KEY"));
            }
            other => panic!("Expected AuthFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_create_backend() {
        let mut config = test_config();
        config.api_key = Some("sk-test".to_string());
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.model_name(), "test-model");
    }
}
