//! Completion service abstraction
//!
//! A common interface over the hosted language model used for tutoring
//! replies and quiz generation.

mod chat;
mod error;
mod gemini;

pub use chat::{ChatMessage, ChatRole, ChatSession};
pub use error::{CompletionError, CompletionErrorKind};
pub use gemini::{GeminiModel, GeminiService};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Common interface to the hosted completion API
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// One-shot prompt completion
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Complete the next turn of a chat transcript
    async fn converse(&self, history: &[ChatMessage]) -> Result<String, CompletionError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Configuration for the completion service
#[derive(Debug, Clone, Default)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    /// Model ID; defaults to gemini-flash
    pub model: Option<String>,
    /// Optional gateway base URL; implies implicit authentication
    pub gateway: Option<String>,
}

impl CompletionConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").ok(),
            model: std::env::var("GEMINI_MODEL").ok(),
            gateway: std::env::var("LLM_GATEWAY").ok(),
        }
    }

    /// Build the configured service, if credentials are available
    pub fn build(&self) -> Option<Arc<dyn CompletionService>> {
        let model = self
            .model
            .as_deref()
            .and_then(GeminiModel::from_id)
            .unwrap_or(GeminiModel::Flash);

        // Gateway mode authenticates at the gateway; direct mode needs a key.
        let api_key = if self.gateway.is_some() {
            self.api_key
                .clone()
                .unwrap_or_else(|| "implicit".to_string())
        } else {
            match self.api_key.clone() {
                Some(key) if !key.is_empty() => key,
                _ => return None,
            }
        };

        let service = GeminiService::new(api_key, model, self.gateway.as_deref());
        Some(Arc::new(LoggingService::new(Arc::new(service))))
    }
}

/// Logging wrapper for completion services
pub struct LoggingService {
    inner: Arc<dyn CompletionService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn CompletionService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }

    fn log(&self, op: &str, duration: Duration, result: &Result<String, CompletionError>) {
        match result {
            Ok(text) => {
                tracing::info!(
                    model = %self.model_id,
                    op,
                    duration_ms = %duration.as_millis(),
                    reply_chars = text.len(),
                    "Completion request finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    op,
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    "Completion request failed"
                );
            }
        }
    }
}

#[async_trait]
impl CompletionService for LoggingService {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(prompt).await;
        self.log("complete", start.elapsed(), &result);
        result
    }

    async fn converse(&self, history: &[ChatMessage]) -> Result<String, CompletionError> {
        let start = std::time::Instant::now();
        let result = self.inner.converse(history).await;
        self.log("converse", start.elapsed(), &result);
        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
