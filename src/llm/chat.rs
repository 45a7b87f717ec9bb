//! Multi-turn chat sessions
//!
//! The hosted completion API is stateless; a chat handle carries the
//! transcript and replays it on every turn.

use super::error::CompletionError;
use super::CompletionService;
use std::fmt;
use std::sync::Arc;

/// Role of a chat transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

/// One entry of a chat transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Opaque handle to an in-progress chat
pub struct ChatSession {
    service: Arc<dyn CompletionService>,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    /// Open a chat seeded with a priming transcript
    pub fn start(service: Arc<dyn CompletionService>, priming: Vec<ChatMessage>) -> Self {
        Self {
            service,
            history: priming,
        }
    }

    /// Submit the next user turn and return the model's reply
    pub async fn send(&mut self, text: &str) -> Result<String, CompletionError> {
        self.history.push(ChatMessage::user(text));
        let reply = match self.service.converse(&self.history).await {
            Ok(reply) => reply,
            Err(e) => {
                // Keep the transcript consistent if the call fails
                self.history.pop();
                return Err(e);
            }
        };
        self.history.push(ChatMessage::model(reply.clone()));
        Ok(reply)
    }

    /// Number of transcript entries, priming included
    #[allow(dead_code)] // Used in tests
    pub fn turns(&self) -> usize {
        self.history.len()
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("model", &self.service.model_id())
            .field("turns", &self.history.len())
            .finish()
    }
}
