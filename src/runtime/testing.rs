//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O, plus a
//! harness that drives a runtime directly so tests can inspect state and
//! session fields between events.

use super::traits::ProfileStore;
use super::{OutboundEvent, SessionRuntime};
use crate::db::UserProfile;
use crate::llm::{ChatMessage, CompletionError, CompletionService};
use crate::state_machine::{Command, Event, SelectionAction, SessionContext};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

// ============================================================================
// In-Memory Profile Store
// ============================================================================

/// In-memory identity store with an injectable failure switch
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: Mutex<HashMap<String, UserProfile>>,
    failing: AtomicBool,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent store call fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn profile(&self, user_id: &str) -> Option<UserProfile> {
        self.profiles.lock().unwrap().get(user_id).cloned()
    }

    fn check(&self) -> Result<(), String> {
        if self.failing.load(Ordering::SeqCst) {
            Err("injected store failure".to_string())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, String> {
        self.check()?;
        Ok(self.profiles.lock().unwrap().get(user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>, String> {
        self.check()?;
        let email = email.to_lowercase();
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn create(
        &self,
        user_id: &str,
        email: &str,
        username: &str,
    ) -> Result<UserProfile, String> {
        self.check()?;
        let now = Utc::now();
        let profile = UserProfile {
            id: user_id.to_string(),
            email: email.to_lowercase(),
            username: username.to_string(),
            subjects: vec![],
            created_at: now,
            updated_at: now,
        };
        self.profiles
            .lock()
            .unwrap()
            .insert(user_id.to_string(), profile.clone());
        Ok(profile)
    }

    async fn add_subject(&self, user_id: &str, subject: &str) -> Result<UserProfile, String> {
        self.check()?;
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| format!("Profile not found: {user_id}"))?;
        if !profile.subjects.iter().any(|s| s == subject) {
            profile.subjects.push(subject.to_string());
        }
        Ok(profile.clone())
    }

    async fn remove_subject(&self, user_id: &str, subject: &str) -> Result<UserProfile, String> {
        self.check()?;
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| format!("Profile not found: {user_id}"))?;
        profile.subjects.retain(|s| s != subject);
        Ok(profile.clone())
    }
}

// ============================================================================
// Mock Completion Service
// ============================================================================

/// Mock completion service returning queued replies
#[derive(Default)]
pub struct MockCompletionService {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    /// Record of one-shot prompts
    pub prompts: Mutex<Vec<String>>,
    /// Record of the transcripts seen by `converse`
    pub transcripts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockCompletionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, text: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
    }

    /// Queue an error
    pub fn queue_error(&self, error: CompletionError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    fn pop(&self) -> Result<String, CompletionError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::network("No mock reply queued")))
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.pop()
    }

    async fn converse(&self, history: &[ChatMessage]) -> Result<String, CompletionError> {
        self.transcripts.lock().unwrap().push(history.to_vec());
        self.pop()
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Test Harness
// ============================================================================

/// Drives a `SessionRuntime` directly, without spawning, so tests can
/// assert on conversation state and session fields between events.
pub struct TestBot {
    pub runtime: SessionRuntime<Arc<InMemoryProfileStore>>,
    pub store: Arc<InMemoryProfileStore>,
    rx: broadcast::Receiver<OutboundEvent>,
}

impl TestBot {
    pub fn new(completions: Option<Arc<dyn CompletionService>>) -> Self {
        let store = Arc::new(InMemoryProfileStore::new());
        let (broadcast_tx, rx) = broadcast::channel(128);
        let context = SessionContext::new(
            "test-user",
            Some("tester".to_string()),
            SessionContext::default_catalog(),
        );
        let runtime = SessionRuntime::new(context, store.clone(), completions, broadcast_tx);
        Self { runtime, store, rx }
    }

    pub async fn command(&mut self, command: Command) {
        self.runtime.process_event(Event::Command(command)).await;
    }

    pub async fn text(&mut self, text: &str) {
        self.runtime
            .process_event(Event::Text {
                text: text.to_string(),
            })
            .await;
    }

    pub async fn select(&mut self, action: SelectionAction, subject: &str) {
        self.runtime
            .process_event(Event::Selection {
                action,
                subject: subject.to_string(),
            })
            .await;
    }

    /// Drain everything broadcast since the last call
    pub fn replies(&mut self) -> Vec<OutboundEvent> {
        let mut events = vec![];
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Texts of drained replies and control edits, in order
    pub fn reply_texts(&mut self) -> Vec<String> {
        self.replies()
            .into_iter()
            .map(|event| match event {
                OutboundEvent::Reply { text, .. } | OutboundEvent::EditControl { text, .. } => text,
            })
            .collect()
    }

    /// Register and log in as `email`
    pub async fn log_in(&mut self, email: &str) {
        self.command(Command::Register).await;
        self.text(email).await;
        self.command(Command::Login).await;
        self.text(email).await;
        self.replies(); // drain the bookkeeping replies
        assert!(
            self.runtime.session().authenticated,
            "login should have succeeded"
        );
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::ConvState;

    #[tokio::test]
    async fn registration_and_login_journey() {
        let mut bot = TestBot::new(None);

        bot.command(Command::Register).await;
        bot.text("  Ada@Example.COM ").await;
        let texts = bot.reply_texts();
        assert!(texts.iter().any(|t| t.contains("Registration complete")));

        let profile = bot.store.profile("test-user").unwrap();
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.username, "tester");
        assert!(profile.subjects.is_empty());

        bot.command(Command::Login).await;
        bot.text("ADA@example.com").await;
        assert!(bot.runtime.session().authenticated);
        assert!(bot
            .reply_texts()
            .iter()
            .any(|t| t.contains("Login successful")));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let mut bot = TestBot::new(None);
        bot.command(Command::Register).await;
        bot.text("ada@example.com").await;

        bot.command(Command::Register).await;
        bot.text("ADA@EXAMPLE.COM").await;
        let texts = bot.reply_texts();
        assert!(texts.iter().any(|t| t.contains("already registered")));
        assert_eq!(bot.runtime.state(), &ConvState::Idle);
    }

    #[tokio::test]
    async fn login_with_unregistered_identifier_fails() {
        let mut bot = TestBot::new(None);
        bot.command(Command::Login).await;
        bot.text("ghost@example.com").await;
        assert!(!bot.runtime.session().authenticated);
        assert!(bot
            .reply_texts()
            .iter()
            .any(|t| t.contains("Incorrect email or user not registered")));
    }

    #[tokio::test]
    async fn gated_commands_require_login() {
        let mut bot = TestBot::new(None);
        for command in [
            Command::MySubjects,
            Command::AddSubject,
            Command::QuizMe,
            Command::Tutor,
        ] {
            bot.command(command).await;
            let texts = bot.reply_texts();
            assert!(
                texts.iter().any(|t| t.contains("logged in")),
                "{command:?} should have been denied"
            );
            assert_eq!(bot.runtime.state(), &ConvState::Idle);
        }
        assert!(bot.store.profile("test-user").is_none());
    }

    #[tokio::test]
    async fn subject_management_scenario() {
        let mut bot = TestBot::new(None);
        bot.log_in("a@b.com").await;

        bot.select(SelectionAction::Add, "Math").await;
        assert_eq!(bot.store.profile("test-user").unwrap().subjects, ["Math"]);

        // Adding again leaves the set unchanged
        bot.select(SelectionAction::Add, "Math").await;
        assert_eq!(bot.store.profile("test-user").unwrap().subjects, ["Math"]);

        // Removing an absent subject is a no-op
        bot.select(SelectionAction::Remove, "Physics").await;
        assert_eq!(bot.store.profile("test-user").unwrap().subjects, ["Math"]);

        bot.select(SelectionAction::Remove, "Math").await;
        assert!(bot.store.profile("test-user").unwrap().subjects.is_empty());
        assert!(bot
            .reply_texts()
            .iter()
            .any(|t| t.contains("no subjects left")));
    }

    #[tokio::test]
    async fn tutor_flow_holds_chat_and_subject_until_done() {
        let llm = Arc::new(MockCompletionService::new());
        llm.queue_reply("Factor by grouping, like this.");
        llm.queue_reply("Good follow-up question!");

        let mut bot = TestBot::new(Some(llm.clone()));
        bot.log_in("a@b.com").await;
        bot.select(SelectionAction::Add, "Math").await;

        bot.command(Command::Tutor).await;
        assert!(matches!(
            bot.runtime.state(),
            ConvState::TutorSelectSubject { .. }
        ));

        bot.select(SelectionAction::Tutor, "Math").await;
        assert_eq!(
            bot.runtime.session().selected_subject.as_deref(),
            Some("Math")
        );

        bot.text("How do I factor quadratics?").await;
        assert!(matches!(bot.runtime.state(), ConvState::Tutoring { .. }));
        assert!(bot.runtime.session().chat.is_some());

        bot.text("And cubics?").await;
        assert!(bot
            .reply_texts()
            .iter()
            .any(|t| t.contains("Good follow-up question!")));

        // The priming exchange plus every Q/A turn is replayed each call
        {
            let transcripts = llm.transcripts.lock().unwrap();
            assert_eq!(transcripts.len(), 2);
            assert_eq!(transcripts[0].len(), 3); // 2 priming + first question
            assert_eq!(transcripts[1].len(), 5);
        }
        assert_eq!(bot.runtime.session().chat.as_ref().unwrap().turns(), 6);

        bot.command(Command::Done).await;
        assert_eq!(bot.runtime.state(), &ConvState::Idle);
        assert!(bot.runtime.session().chat.is_none());
        assert!(bot.runtime.session().selected_subject.is_none());
    }

    #[tokio::test]
    async fn tutor_with_no_subjects_short_circuits() {
        let mut bot = TestBot::new(None);
        bot.log_in("a@b.com").await;
        bot.command(Command::Tutor).await;
        assert_eq!(bot.runtime.state(), &ConvState::Idle);
        assert!(bot
            .reply_texts()
            .iter()
            .any(|t| t.contains("Add a subject first")));
    }

    #[tokio::test]
    async fn tutor_bootstrap_failure_ends_flow() {
        let llm = Arc::new(MockCompletionService::new());
        llm.queue_error(CompletionError::server_error("boom"));

        let mut bot = TestBot::new(Some(llm));
        bot.log_in("a@b.com").await;
        bot.select(SelectionAction::Add, "Physics").await;
        bot.command(Command::Tutor).await;
        bot.select(SelectionAction::Tutor, "Physics").await;
        bot.text("What is momentum?").await;

        assert_eq!(bot.runtime.state(), &ConvState::Idle);
        assert!(bot.runtime.session().chat.is_none());
        assert!(bot
            .reply_texts()
            .iter()
            .any(|t| t.contains("Couldn't connect")));
    }

    #[tokio::test]
    async fn quiz_generation_replies_with_model_text() {
        let llm = Arc::new(MockCompletionService::new());
        llm.queue_reply("Q1) Which of these is a noun?");

        let mut bot = TestBot::new(Some(llm.clone()));
        bot.log_in("a@b.com").await;
        bot.select(SelectionAction::Add, "English").await;
        bot.command(Command::QuizMe).await;
        bot.select(SelectionAction::Quiz, "English").await;

        let texts = bot.reply_texts();
        assert!(texts.iter().any(|t| t.contains("Q1)")));
        assert!(texts.iter().any(|t| t.contains("ready")));

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("English"));
    }

    #[tokio::test]
    async fn quiz_failure_replies_generic_error() {
        let llm = Arc::new(MockCompletionService::new());
        llm.queue_error(CompletionError::rate_limit("slow down"));

        let mut bot = TestBot::new(Some(llm));
        bot.log_in("a@b.com").await;
        bot.select(SelectionAction::Add, "ICT").await;
        bot.select(SelectionAction::Quiz, "ICT").await;

        let texts = bot.reply_texts();
        assert!(texts
            .iter()
            .any(|t| t.contains("error occurred while creating your quiz")));
        assert_eq!(bot.runtime.state(), &ConvState::Idle);
    }

    #[tokio::test]
    async fn quiz_without_completion_service_degrades_gracefully() {
        let mut bot = TestBot::new(None);
        bot.log_in("a@b.com").await;
        bot.select(SelectionAction::Add, "ICT").await;
        bot.select(SelectionAction::Quiz, "ICT").await;
        assert!(bot
            .reply_texts()
            .iter()
            .any(|t| t.contains("currently unavailable")));
    }

    #[tokio::test]
    async fn store_failure_mid_registration_recovers_to_idle() {
        let mut bot = TestBot::new(None);
        bot.command(Command::Register).await;
        bot.store.set_failing(true);
        bot.text("ada@example.com").await;
        assert_eq!(bot.runtime.state(), &ConvState::Idle);
        assert!(bot.reply_texts().iter().any(|t| t.contains("try again")));

        // The user simply re-invokes the flow to retry
        bot.store.set_failing(false);
        bot.command(Command::Register).await;
        bot.text("ada@example.com").await;
        assert!(bot
            .reply_texts()
            .iter()
            .any(|t| t.contains("Registration complete")));
    }

    #[tokio::test]
    async fn logout_revokes_access() {
        let mut bot = TestBot::new(None);
        bot.log_in("a@b.com").await;

        bot.command(Command::Logout).await;
        assert!(!bot.runtime.session().authenticated);

        bot.command(Command::MySubjects).await;
        assert!(bot.reply_texts().iter().any(|t| t.contains("logged in")));
    }

    #[tokio::test]
    async fn cancel_mid_registration_returns_to_idle() {
        let mut bot = TestBot::new(None);
        bot.command(Command::Register).await;
        bot.command(Command::Cancel).await;
        assert_eq!(bot.runtime.state(), &ConvState::Idle);
        assert!(bot
            .reply_texts()
            .iter()
            .any(|t| t.contains("Action canceled")));
    }
}
