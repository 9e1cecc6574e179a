//! OpenAI-compatible generative backend.
//!
//! Talks to any endpoint that follows the OpenAI chat completions API
//! format. Requests are non-streaming single-turn prompts; the extraction
//! units do their own JSON recovery on the returned text.

use crate::backend::TextGenerator;
use crate::config::LlmConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// OpenAI-compatible chat completions client.
pub struct OpenAiCompatibleBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    timeout_secs: u64,
}

impl OpenAiCompatibleBackend {
    /// Create a backend with an explicitly provided API key.
    pub fn new_with_key(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.request_timeout_secs,
        })
    }

    /// Parse an OpenAI-format response body into the completion text.
    fn parse_response(body: &Value) -> Result<String, LlmError> {
        let message = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| LlmError::ResponseParse {
                message: "No choices in response".to_string(),
            })?;

        message
            .get("content")
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::ResponseParse {
                message: "No text content in message".to_string(),
            })
    }

    /// Map an HTTP error status to a typed backend error.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => {
                debug!(body = %body, "Authentication failed");
                LlmError::AuthFailed {
                    provider: "OpenAI-compatible".to_string(),
                }
            }
            429 => {
                // Try to parse "try again in Xs" out of the error message
                let retry_secs = serde_json::from_str::<Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.get("error")?
                            .get("message")?
                            .as_str()
                            .map(|s| s.to_string())
                    })
                    .and_then(|msg| {
                        msg.split("in ")
                            .last()
                            .and_then(|s| s.trim_end_matches('s').parse::<u64>().ok())
                    })
                    .unwrap_or(5);
                LlmError::RateLimited {
                    retry_after_secs: retry_secs,
                }
            }
            status if status >= 500 => LlmError::ApiRequest {
                message: format!("Server error ({status}): {body}"),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {status}: {body}"),
            },
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleBackend {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": false,
        });

        debug!(url = %url, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    LlmError::ApiRequest {
                        message: format!("Request failed: {e}"),
                    }
                }
            })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| LlmError::ApiRequest {
            message: format!("Failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON: {e}"),
            })?;

        Self::parse_response(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig {
            provider: "openai".to_string(),
            model: "test-model".to_string(),
            api_key_env: "UNUSED".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.3,
            max_tokens: 1024,
            request_timeout_secs: 30,
        }
    }

    #[test]
    fn test_default_base_url() {
        let backend =
            OpenAiCompatibleBackend::new_with_key(&test_config(), "sk-test".into()).unwrap();
        assert_eq!(backend.base_url, "https://api.openai.com/v1");
        assert_eq!(backend.model_name(), "test-model");
    }

    #[test]
    fn test_parse_response_text() {
        let body = json!({
            "choices": [{
                "message": { "role": "assistant", "content": "[]" },
                "finish_reason": "stop"
            }]
        });
        assert_eq!(OpenAiCompatibleBackend::parse_response(&body).unwrap(), "[]");
    }

    #[test]
    fn test_parse_response_no_choices() {
        let body = json!({ "choices": [] });
        let err = OpenAiCompatibleBackend::parse_response(&body).unwrap_err();
        assert!(matches!(err, LlmError::ResponseParse { .. }));
    }

    #[test]
    fn test_parse_response_null_content() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        });
        let err = OpenAiCompatibleBackend::parse_response(&body).unwrap_err();
        assert!(matches!(err, LlmError::ResponseParse { .. }));
    }

    #[test]
    fn test_map_http_error_auth() {
        let err =
            OpenAiCompatibleBackend::map_http_error(reqwest::StatusCode::UNAUTHORIZED, "denied");
        assert!(matches!(err, LlmError::AuthFailed { .. }));
    }

    #[test]
    fn test_map_http_error_rate_limit_parses_retry() {
        let body = r#"{"error":{"message":"Rate limit reached, try again in 21s"}}"#;
        let err =
            OpenAiCompatibleBackend::map_http_error(reqwest::StatusCode::TOO_MANY_REQUESTS, body);
        match err {
            LlmError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 21),
            other => panic!("Expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_map_http_error_server() {
        let err = OpenAiCompatibleBackend::map_http_error(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
        );
        match err {
            LlmError::ApiRequest { message } => assert!(message.contains("Server error")),
            other => panic!("Expected ApiRequest, got {:?}", other),
        }
    }
}
