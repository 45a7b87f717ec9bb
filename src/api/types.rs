//! API request and response types

use crate::state_machine::SelectionAction;
use serde::{Deserialize, Serialize};

/// Inbound free text, slash command, or menu label
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
    /// Display name, recorded on first contact
    #[serde(default)]
    pub username: Option<String>,
}

/// Inbound selection event (a button press)
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub action: SelectionAction,
    pub subject: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Response for queued events
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
