//! Effects produced by state transitions

use super::event::SelectionAction;
use serde::{Deserialize, Serialize};

/// Effects to be executed by the session runtime after a transition.
///
/// Store and completion effects that branch the flow produce result events
/// (`ProfileFetched`, `EmailChecked`, ...); self-contained effects such as
/// `AddSubject` carry their own fixed reply and produce nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a message to the user
    Reply {
        text: String,
        keyboard: Option<Keyboard>,
    },
    /// Update the control that produced the current selection event
    EditControl {
        text: String,
        keyboard: Option<Keyboard>,
    },

    /// Fetch the caller's own profile -> `ProfileFetched`
    FetchProfile,
    /// Look up any profile registered under this email -> `EmailChecked`
    CheckEmail { email: String },
    /// Create the caller's profile -> `ProfileCreated` / `StoreFailed`
    CreateProfile { email: String },
    /// Union-add a subject and confirm on the control
    AddSubject { subject: String },
    /// Difference-remove a subject and re-render the list on the control
    RemoveSubject { subject: String },
    /// One-shot quiz generation; replies with the generated text
    GenerateQuiz { subject: String },

    /// Start a tutoring chat and submit the first question
    /// -> `TutorStarted` / `TutorFailed`
    StartTutorChat { subject: String, question: String },
    /// Forward a question to the active chat -> `TutorAnswered` / `TutorFailed`
    AskTutor { question: String },

    /// Mark the session authenticated (or not)
    SetAuthenticated(bool),
    /// Record the tutoring subject in the session
    SetSubject { subject: String },
    /// Drop the chat handle and selected subject
    ClearTutorState,
    /// Full session reset, as on logout
    ResetSession,
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply {
            text: text.into(),
            keyboard: None,
        }
    }

    /// Reply that restores the main menu
    pub fn reply_menu(text: impl Into<String>) -> Self {
        Effect::Reply {
            text: text.into(),
            keyboard: Some(Keyboard::MainMenu),
        }
    }

    /// Reply that hides any persistent keyboard on the client
    pub fn reply_hide(text: impl Into<String>) -> Self {
        Effect::Reply {
            text: text.into(),
            keyboard: Some(Keyboard::Hide),
        }
    }

    pub fn reply_with(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Effect::Reply {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    pub fn edit(text: impl Into<String>) -> Self {
        Effect::EditControl {
            text: text.into(),
            keyboard: None,
        }
    }
}

/// Keyboard data attached to an outbound message. Rendering is the
/// frontend's concern; this is structure only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Keyboard {
    /// The persistent main menu (Tutor / Quiz Me / My Subjects / Add Subject)
    MainMenu,
    /// Remove any persistent keyboard
    Hide,
    /// Inline buttons attached to a single message
    Inline { rows: Vec<Vec<InlineButton>> },
}

/// A single inline button: a label plus the selection event it fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub label: String,
    pub action: SelectionAction,
    pub subject: String,
}

impl InlineButton {
    pub fn new(
        label: impl Into<String>,
        action: SelectionAction,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            action,
            subject: subject.into(),
        }
    }
}

impl Keyboard {
    /// One button per subject, all firing the same action
    pub fn subject_menu(action: SelectionAction, subjects: &[String]) -> Self {
        let rows = subjects
            .iter()
            .map(|s| vec![InlineButton::new(s.clone(), action, s.clone())])
            .collect();
        Keyboard::Inline { rows }
    }

    /// The subject list: a label button paired with a removal control per row
    pub fn removal_list(subjects: &[String]) -> Self {
        let rows = subjects
            .iter()
            .map(|s| {
                vec![
                    InlineButton::new(s.clone(), SelectionAction::Noop, s.clone()),
                    InlineButton::new("❌ Remove", SelectionAction::Remove, s.clone()),
                ]
            })
            .collect();
        Keyboard::Inline { rows }
    }
}
