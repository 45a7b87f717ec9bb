//! Per-session event loop

use super::traits::ProfileStore;
use super::OutboundEvent;
use crate::llm::{ChatSession, CompletionService};
use crate::prompts;
use crate::state_machine::{
    transition, ConvState, Effect, Event, Keyboard, Session, SessionContext, TransitionError,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Event loop for a single user's session.
///
/// Exactly one runtime exists per active user; its channel serializes that
/// user's events while other sessions run on their own tasks. Collaborator
/// calls are awaited inline, so a cancel command only takes effect between
/// events, never during an in-flight call.
pub struct SessionRuntime<S: ProfileStore> {
    context: SessionContext,
    state: ConvState,
    session: Session,
    store: S,
    completions: Option<Arc<dyn CompletionService>>,
    broadcast_tx: broadcast::Sender<OutboundEvent>,
}

impl<S: ProfileStore> SessionRuntime<S> {
    pub fn new(
        context: SessionContext,
        store: S,
        completions: Option<Arc<dyn CompletionService>>,
        broadcast_tx: broadcast::Sender<OutboundEvent>,
    ) -> Self {
        Self {
            context,
            state: ConvState::Idle,
            session: Session::new(),
            store,
            completions,
            broadcast_tx,
        }
    }

    #[allow(dead_code)] // State inspection for tests
    pub fn state(&self) -> &ConvState {
        &self.state
    }

    #[allow(dead_code)] // State inspection for tests
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Drive the session until every sender is gone
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<Event>) {
        tracing::info!(user_id = %self.context.user_id, "Starting session runtime");

        while let Some(event) = event_rx.recv().await {
            self.process_event(event).await;
        }

        tracing::info!(user_id = %self.context.user_id, "Session runtime stopped");
    }

    /// Process one inbound event plus every event chained off its effects
    pub async fn process_event(&mut self, event: Event) {
        let mut queue = vec![event];

        while let Some(current) = queue.pop() {
            let result = match transition(&self.state, &self.context, &self.session, current) {
                Ok(result) => result,
                Err(TransitionError::FlowInProgress) => {
                    self.send(OutboundEvent::Reply {
                        text: TransitionError::FlowInProgress.to_string(),
                        keyboard: None,
                    });
                    continue;
                }
                Err(e @ TransitionError::Unhandled { .. }) => {
                    tracing::debug!(
                        user_id = %self.context.user_id,
                        error = %e,
                        "Dropping unhandled event"
                    );
                    continue;
                }
            };

            if result.new_state != self.state {
                tracing::debug!(
                    user_id = %self.context.user_id,
                    from = ?self.state,
                    to = ?result.new_state,
                    "State transition"
                );
            }
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(generated) = self.execute_effect(effect).await {
                    queue.push(generated);
                }
            }
        }
    }

    /// Execute an effect, optionally producing a follow-up event
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::Reply { text, keyboard } => {
                self.send(OutboundEvent::Reply { text, keyboard });
                None
            }

            Effect::EditControl { text, keyboard } => {
                self.send(OutboundEvent::EditControl { text, keyboard });
                None
            }

            Effect::FetchProfile => match self.store.get(&self.context.user_id).await {
                Ok(profile) => Some(Event::ProfileFetched { profile }),
                Err(message) => self.store_failed("fetch profile", message),
            },

            Effect::CheckEmail { email } => match self.store.find_by_email(&email).await {
                Ok(profile) => Some(Event::EmailChecked {
                    registered: profile.is_some(),
                }),
                Err(message) => self.store_failed("check email", message),
            },

            Effect::CreateProfile { email } => {
                let username = self.context.username.as_deref().unwrap_or("N/A");
                match self
                    .store
                    .create(&self.context.user_id, &email, username)
                    .await
                {
                    Ok(_) => Some(Event::ProfileCreated),
                    Err(message) => self.store_failed("create profile", message),
                }
            }

            Effect::AddSubject { subject } => {
                match self.store.add_subject(&self.context.user_id, &subject).await {
                    Ok(_) => {
                        self.send(OutboundEvent::EditControl {
                            text: format!("✅ Added '{subject}'!"),
                            keyboard: None,
                        });
                    }
                    Err(message) => {
                        tracing::error!(
                            user_id = %self.context.user_id,
                            error = %message,
                            "Failed to add subject"
                        );
                        self.send(OutboundEvent::EditControl {
                            text: "Couldn't update your subjects. Please try again.".to_string(),
                            keyboard: None,
                        });
                    }
                }
                None
            }

            Effect::RemoveSubject { subject } => {
                match self
                    .store
                    .remove_subject(&self.context.user_id, &subject)
                    .await
                {
                    Ok(profile) if profile.subjects.is_empty() => {
                        self.send(OutboundEvent::EditControl {
                            text: format!("✅ Removed '{subject}'. You have no subjects left."),
                            keyboard: None,
                        });
                    }
                    Ok(profile) => {
                        self.send(OutboundEvent::EditControl {
                            text: format!("✅ Removed '{subject}'. Your updated list:"),
                            keyboard: Some(Keyboard::removal_list(&profile.subjects)),
                        });
                    }
                    Err(message) => {
                        tracing::error!(
                            user_id = %self.context.user_id,
                            error = %message,
                            "Failed to remove subject"
                        );
                        self.send(OutboundEvent::EditControl {
                            text: "Couldn't update your subjects. Please try again.".to_string(),
                            keyboard: None,
                        });
                    }
                }
                None
            }

            Effect::GenerateQuiz { subject } => {
                self.send(OutboundEvent::EditControl {
                    text: format!("⏳ Generating a quiz for '{subject}'... please wait."),
                    keyboard: None,
                });

                let text = match &self.completions {
                    None => "Sorry, the quiz service is currently unavailable.".to_string(),
                    Some(service) => match service.complete(&prompts::quiz_prompt(&subject)).await {
                        Ok(quiz) => quiz,
                        Err(e) => {
                            tracing::error!(
                                user_id = %self.context.user_id,
                                error = %e,
                                "Quiz generation failed"
                            );
                            "Sorry, an error occurred while creating your quiz. \
                             Please try again later."
                                .to_string()
                        }
                    },
                };

                self.send(OutboundEvent::Reply {
                    text,
                    keyboard: Some(Keyboard::MainMenu),
                });
                self.send(OutboundEvent::EditControl {
                    text: format!("✅ Your quiz for '{subject}' is ready!"),
                    keyboard: None,
                });
                None
            }

            Effect::StartTutorChat { subject, question } => {
                let Some(service) = self.completions.clone() else {
                    tracing::warn!(
                        user_id = %self.context.user_id,
                        "No completion service configured"
                    );
                    return Some(Event::TutorFailed {
                        message: "completion service unavailable".to_string(),
                    });
                };

                let mut chat = ChatSession::start(service, prompts::tutor_priming(&subject));
                match chat.send(&question).await {
                    Ok(answer) => {
                        self.session.chat = Some(chat);
                        Some(Event::TutorStarted { answer })
                    }
                    Err(e) => {
                        // The partial chat handle is dropped here.
                        tracing::error!(
                            user_id = %self.context.user_id,
                            error = %e,
                            "Tutor chat bootstrap failed"
                        );
                        Some(Event::TutorFailed {
                            message: e.to_string(),
                        })
                    }
                }
            }

            Effect::AskTutor { question } => match self.session.chat.as_mut() {
                Some(chat) => match chat.send(&question).await {
                    Ok(answer) => Some(Event::TutorAnswered { answer }),
                    Err(e) => {
                        tracing::error!(
                            user_id = %self.context.user_id,
                            error = %e,
                            "Tutor reply failed"
                        );
                        Some(Event::TutorFailed {
                            message: e.to_string(),
                        })
                    }
                },
                None => Some(Event::TutorFailed {
                    message: "no active chat".to_string(),
                }),
            },

            Effect::SetAuthenticated(value) => {
                self.session.authenticated = value;
                None
            }

            Effect::SetSubject { subject } => {
                self.session.selected_subject = Some(subject);
                None
            }

            Effect::ClearTutorState => {
                self.session.clear_tutor();
                None
            }

            Effect::ResetSession => {
                self.session.reset();
                None
            }
        }
    }

    fn store_failed(&self, op: &str, message: String) -> Option<Event> {
        tracing::error!(
            user_id = %self.context.user_id,
            op,
            error = %message,
            "Identity store call failed"
        );
        Some(Event::StoreFailed { message })
    }

    fn send(&self, event: OutboundEvent) {
        // No subscribers is fine; the frontend may not be streaming.
        let _ = self.broadcast_tx.send(event);
    }
}
