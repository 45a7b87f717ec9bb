//! Google Gemini provider implementation

use super::chat::{ChatMessage, ChatRole};
use super::error::CompletionError;
use super::CompletionService;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiModel {
    Flash,
    Pro,
}

impl GeminiModel {
    pub fn api_name(self) -> &'static str {
        match self {
            GeminiModel::Flash => "gemini-1.5-flash",
            GeminiModel::Pro => "gemini-1.5-pro",
        }
    }

    pub fn model_id(self) -> &'static str {
        match self {
            GeminiModel::Flash => "gemini-flash",
            GeminiModel::Pro => "gemini-pro",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "gemini-flash" => Some(GeminiModel::Flash),
            "gemini-pro" => Some(GeminiModel::Pro),
            _ => None,
        }
    }
}

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    base_url: String,
    model_id: &'static str,
}

impl GeminiService {
    pub fn new(api_key: String, model: GeminiModel, gateway: Option<&str>) -> Self {
        let base_url = match gateway {
            Some(gw) => {
                // Gateway format: auth happens at the gateway
                format!(
                    "{}/gemini/v1/models/{}-latest:generateContent",
                    gw.trim_end_matches('/'),
                    model.api_name()
                )
            }
            None => {
                // Direct Gemini API
                format!(
                    "https://generativelanguage.googleapis.com/v1/models/{}-latest:generateContent",
                    model.api_name()
                )
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            base_url,
            model_id: model.model_id(),
        }
    }

    fn translate_history(history: &[ChatMessage]) -> Vec<GeminiContent> {
        history
            .iter()
            .map(|msg| GeminiContent {
                role: Some(
                    match msg.role {
                        ChatRole::User => "user",
                        ChatRole::Model => "model",
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart {
                    text: msg.text.clone(),
                }],
            })
            .collect()
    }

    async fn generate(&self, contents: Vec<GeminiContent>) -> Result<String, CompletionError> {
        let request = GeminiRequest { contents };

        let url = if self.api_key == "implicit" {
            // Gateway mode - key in URL not needed
            self.base_url.clone()
        } else {
            // Direct mode - add API key to URL
            format!("{}?key={}", self.base_url, self.api_key)
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    CompletionError::network(format!("Connection failed: {e}"))
                } else {
                    CompletionError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CompletionError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<GeminiErrorResponse>(&body) {
                let message = error_resp.error.message;
                return Err(match status.as_u16() {
                    400 => CompletionError::invalid_request(format!("Invalid request: {message}")),
                    401 | 403 => CompletionError::auth(format!("Authentication failed: {message}")),
                    429 => CompletionError::rate_limit(format!("Rate limit exceeded: {message}")),
                    500..=599 => CompletionError::server_error(format!("Server error: {message}")),
                    _ => CompletionError::unknown(format!("HTTP {status}: {message}")),
                });
            }
            return Err(CompletionError::unknown(format!(
                "HTTP {status} error: {body}"
            )));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| CompletionError::unknown(format!("Failed to parse response: {e}")))?;

        Self::normalize_response(parsed)
    }

    fn normalize_response(resp: GeminiResponse) -> Result<String, CompletionError> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::unknown("No candidates in response"))?;

        let text = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(CompletionError::unknown("Empty response from model"));
        }
        Ok(text)
    }
}

#[async_trait]
impl CompletionService for GeminiService {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let contents = vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: prompt.to_string(),
            }],
        }];
        self.generate(contents).await
    }

    async fn converse(&self, history: &[ChatMessage]) -> Result<String, CompletionError> {
        self.generate(Self::translate_history(history)).await
    }

    fn model_id(&self) -> &str {
        self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    #[allow(dead_code)]
    code: Option<i32>,
    #[allow(dead_code)]
    status: Option<String>,
}
