//! Events that drive a session's state machine

use crate::db::UserProfile;
use serde::{Deserialize, Serialize};

/// Named commands on the chat surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Start,
    Register,
    Login,
    Logout,
    Cancel,
    MySubjects,
    AddSubject,
    QuizMe,
    Tutor,
    Done,
}

impl Command {
    /// Parse a bare command name (no leading slash)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "start" => Some(Command::Start),
            "register" => Some(Command::Register),
            "login" => Some(Command::Login),
            "logout" => Some(Command::Logout),
            "cancel" => Some(Command::Cancel),
            "mysubjects" => Some(Command::MySubjects),
            "addsubject" => Some(Command::AddSubject),
            "quizme" => Some(Command::QuizMe),
            "tutor" => Some(Command::Tutor),
            "done" => Some(Command::Done),
            _ => None,
        }
    }

    /// Main-menu button labels double as command aliases
    pub fn from_menu_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Tutor" => Some(Command::Tutor),
            "Quiz Me" => Some(Command::QuizMe),
            "My Subjects" => Some(Command::MySubjects),
            "Add Subject" => Some(Command::AddSubject),
            _ => None,
        }
    }

    /// Whether the authentication gate protects this command
    pub fn requires_login(self) -> bool {
        matches!(
            self,
            Command::MySubjects | Command::AddSubject | Command::QuizMe | Command::Tutor
        )
    }
}

/// Action tag carried by a selection event. A closed set, decoded once at
/// the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionAction {
    /// Add the subject to the caller's profile
    Add,
    /// Remove the subject from the caller's profile
    Remove,
    /// Choose the subject for a tutoring session
    Tutor,
    /// Generate a quiz on the subject
    Quiz,
    /// Label-only buttons; carries no operation
    Noop,
}

impl SelectionAction {
    /// Every mutating or service-reaching action is gated
    pub fn requires_login(self) -> bool {
        !matches!(self, SelectionAction::Noop)
    }
}

/// Events that trigger state transitions.
///
/// The first group arrives from users via the dispatcher; the rest are
/// produced by effect execution and consumed within the same unit of work.
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Command(Command),
    Text {
        text: String,
    },
    Selection {
        action: SelectionAction,
        subject: String,
    },

    // Identity store results
    ProfileFetched {
        profile: Option<UserProfile>,
    },
    EmailChecked {
        registered: bool,
    },
    ProfileCreated,
    StoreFailed {
        message: String,
    },

    // Completion service results
    TutorStarted {
        answer: String,
    },
    TutorAnswered {
        answer: String,
    },
    TutorFailed {
        message: String,
    },
}
