//! Generative-text backend abstraction.
//!
//! Defines the `TextGenerator` trait the extraction units talk to. The
//! backend is treated as an opaque, possibly-failing remote collaborator:
//! nothing in the core assumes its output is deterministic or
//! schema-conformant. See `providers` for the OpenAI-compatible client.

use crate::error::LlmError;
use async_trait::async_trait;

/// Trait for generative-text backends.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send a prompt and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// Mock backend for tests: returns queued responses in order, or a fixed
/// fallback message when the queue is empty.
pub struct MockTextGenerator {
    model: String,
    responses: std::sync::Mutex<Vec<Result<String, LlmError>>>,
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A mock that always returns the given text.
    ///
    /// Queues multiple copies so it can serve the whole four-unit fan-out.
    pub fn with_response(text: &str) -> Self {
        let backend = Self::new();
        for _ in 0..8 {
            backend.queue_ok(text);
        }
        backend
    }

    /// A mock whose every call fails with a connection error.
    pub fn failing() -> Self {
        let backend = Self::new();
        for _ in 0..8 {
            backend.queue_err(LlmError::Connection {
                message: "mock backend unavailable".to_string(),
            });
        }
        backend
    }

    /// Queue a successful response for the next `complete` call.
    pub fn queue_ok(&self, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .push(Ok(text.to_string()));
    }

    /// Queue an error for the next `complete` call.
    pub fn queue_err(&self, err: LlmError) {
        self.responses.lock().unwrap().push(Err(err));
    }

    /// Number of calls served so far is not tracked; remaining queue depth is.
    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

impl Default for MockTextGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("Mock backend: no queued responses available.".to_string())
        } else {
            responses.remove(0)
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Test backend whose calls never resolve, for exercising the per-unit
/// call timeout.
pub struct StalledTextGenerator;

#[async_trait]
impl TextGenerator for StalledTextGenerator {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        std::future::pending::<()>().await;
        unreachable!("stalled backend never completes")
    }

    fn model_name(&self) -> &str {
        "stalled-model"
    }
}
