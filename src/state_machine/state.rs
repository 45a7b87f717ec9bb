//! Conversation state and per-user session types

use crate::llm::ChatSession;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Subjects offered when no deployment-specific catalog is configured.
pub const DEFAULT_CATALOG: &[&str] = &["ICT", "English", "Math", "Physics"];

/// Conversation state: which multi-turn flow, if any, a session is inside.
///
/// The resting states wait for the next user event. The `*Checking`,
/// `*Saving`, `*Loading`, `*Entry`, `TutorStarting`, and `TutorAsking`
/// states exist only while a collaborator call is in flight; the runtime
/// consumes them within the same unit of work, so user events never
/// observe them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// No flow active
    #[default]
    Idle,

    /// `/start` from a guest; profile lookup in flight
    StartChecking,

    /// Registration: waiting for the email address
    RegisterAwaitEmail,
    /// Registration: duplicate-email lookup in flight
    RegisterChecking { email: String },
    /// Registration: profile insert in flight
    RegisterSaving { email: String },

    /// Login: waiting for the email address
    LoginAwaitEmail,
    /// Login: profile fetch in flight
    LoginChecking { email: String },

    /// `/addsubject`: profile fetch in flight
    AddMenuLoading,
    /// `/mysubjects`: profile fetch in flight
    SubjectsLoading,
    /// `/quizme`: profile fetch in flight
    QuizEntry,

    /// `/tutor`: profile fetch in flight
    TutorEntry,
    /// Waiting for the user to pick one of their subjects
    TutorSelectSubject {
        /// The subjects shown on the menu; selections are validated
        /// against this list
        offered: Vec<String>,
    },
    /// Subject picked; waiting for the first question
    TutorAwaitQuestion { subject: String },
    /// First question sent; chat bootstrap in flight
    TutorStarting { subject: String },
    /// Steady state: questions forwarded to the active chat
    Tutoring { subject: String },
    /// Follow-up question in flight
    TutorAsking { subject: String },
}

impl ConvState {
    /// Check whether the session is anywhere inside the tutoring flow
    pub fn in_tutor_flow(&self) -> bool {
        matches!(
            self,
            ConvState::TutorEntry
                | ConvState::TutorSelectSubject { .. }
                | ConvState::TutorAwaitQuestion { .. }
                | ConvState::TutorStarting { .. }
                | ConvState::Tutoring { .. }
                | ConvState::TutorAsking { .. }
        )
    }
}

/// Ephemeral per-user session state. Created lazily on a user's first
/// event and never persisted.
#[derive(Debug, Default)]
pub struct Session {
    /// Set by a successful login; checked by the authentication gate
    pub authenticated: bool,
    /// Subject of the active tutoring flow
    pub selected_subject: Option<String>,
    /// Handle to the active tutoring chat
    pub chat: Option<ChatSession>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the chat handle and selected subject
    pub fn clear_tutor(&mut self) {
        self.selected_subject = None;
        self.chat = None;
    }

    /// Full reset, as on logout
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Immutable configuration for one user's session
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: String,
    /// Display name captured from the frontend, if any
    pub username: Option<String>,
    /// The fixed subject catalog for this deployment
    pub catalog: Arc<Vec<String>>,
}

impl SessionContext {
    pub fn new(
        user_id: impl Into<String>,
        username: Option<String>,
        catalog: Arc<Vec<String>>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username,
            catalog,
        }
    }

    /// The built-in catalog, for tests and deployments that don't override it
    #[allow(dead_code)] // Used in tests
    pub fn default_catalog() -> Arc<Vec<String>> {
        Arc::new(DEFAULT_CATALOG.iter().map(|s| (*s).to_string()).collect())
    }
}
