//! Pure state transition function
//!
//! Given the current state, the session, and an event, produce the next
//! state plus the effects the runtime must execute. No I/O happens here;
//! collaborator results re-enter the machine as events.

use super::effect::{Effect, Keyboard};
use super::event::{Command, Event, SelectionAction};
use super::state::{ConvState, Session, SessionContext};
use crate::prompts::CURRICULUM;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Another action is in progress. Send /cancel first if you want to abandon it.")]
    FlowInProgress,
    #[error("no transition from {state} on {event}")]
    Unhandled { state: String, event: String },
}

/// Pure transition function.
///
/// The authentication gate is evaluated once, before dispatch: a protected
/// event from an unauthenticated session terminates whatever flow was
/// active and produces a single login prompt.
pub fn transition(
    state: &ConvState,
    ctx: &SessionContext,
    session: &Session,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    if !session.authenticated && requires_login(&event) {
        return Ok(TransitionResult::new(ConvState::Idle).with_effect(Effect::reply_hide(
            "🔒 This feature requires you to be logged in. Please use /login.",
        )));
    }

    match (state, event) {
        // ==================================================================
        // Universal commands
        // ==================================================================

        // Logout wipes the whole session, from any state.
        (_, Event::Command(Command::Logout)) => Ok(TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::ResetSession)
            .with_effect(Effect::reply_hide(
                "You have been logged out. Use /login to access your account again.",
            ))),

        // Cancel abandons any in-progress flow.
        (_, Event::Command(Command::Cancel)) => {
            let result = TransitionResult::new(ConvState::Idle).with_effect(Effect::ClearTutorState);
            Ok(if session.authenticated {
                result.with_effect(Effect::reply_menu(
                    "Action canceled. Returning to the main menu.",
                ))
            } else {
                result.with_effect(Effect::reply("Action canceled."))
            })
        }

        // Done ends a tutoring session; elsewhere there is nothing to end.
        (s, Event::Command(Command::Done)) if s.in_tutor_flow() => {
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::ClearTutorState)
                .with_effect(Effect::reply_menu(
                    "Tutor session ended. What would you like to do next?",
                )))
        }
        (s, Event::Command(Command::Done)) => Ok(TransitionResult::new(s.clone())
            .with_effect(Effect::reply("There is no tutor session to end."))),

        // ==================================================================
        // /start
        // ==================================================================
        (ConvState::Idle, Event::Command(Command::Start)) => {
            if session.authenticated {
                Ok(TransitionResult::new(ConvState::Idle)
                    .with_effect(Effect::reply_menu("Welcome back! What would you like to do?")))
            } else {
                Ok(TransitionResult::new(ConvState::StartChecking)
                    .with_effect(Effect::FetchProfile))
            }
        }
        (ConvState::StartChecking, Event::ProfileFetched { profile }) => {
            let text = if profile.is_some() {
                "Welcome back! Please use /login with your email to access your account."
            } else {
                "Welcome! Please use /register to create a new account."
            };
            Ok(TransitionResult::new(ConvState::Idle).with_effect(Effect::reply_hide(text)))
        }

        // ==================================================================
        // Registration flow
        // ==================================================================
        (ConvState::Idle, Event::Command(Command::Register)) => {
            Ok(TransitionResult::new(ConvState::RegisterAwaitEmail).with_effect(
                Effect::reply_hide("Let's create your account. Please enter your email address."),
            ))
        }
        (ConvState::RegisterAwaitEmail, Event::Text { text }) => {
            let email = text.trim().to_lowercase();
            Ok(
                TransitionResult::new(ConvState::RegisterChecking {
                    email: email.clone(),
                })
                .with_effect(Effect::CheckEmail { email }),
            )
        }
        (ConvState::RegisterChecking { .. }, Event::EmailChecked { registered: true }) => {
            Ok(TransitionResult::new(ConvState::Idle).with_effect(Effect::reply(
                "This email is already registered. Please /login or use a different email.",
            )))
        }
        (ConvState::RegisterChecking { email }, Event::EmailChecked { registered: false }) => Ok(
            TransitionResult::new(ConvState::RegisterSaving {
                email: email.clone(),
            })
            .with_effect(Effect::CreateProfile {
                email: email.clone(),
            }),
        ),
        (ConvState::RegisterSaving { .. }, Event::ProfileCreated) => {
            Ok(TransitionResult::new(ConvState::Idle).with_effect(Effect::reply(
                "✅ Registration complete! You can now /login with your email.",
            )))
        }

        // ==================================================================
        // Login flow
        // ==================================================================
        (ConvState::Idle, Event::Command(Command::Login)) => {
            if session.authenticated {
                Ok(TransitionResult::new(ConvState::Idle)
                    .with_effect(Effect::reply_menu("You are already logged in.")))
            } else {
                Ok(
                    TransitionResult::new(ConvState::LoginAwaitEmail).with_effect(
                        Effect::reply_hide("To log in, please enter your registered email address:"),
                    ),
                )
            }
        }
        (ConvState::LoginAwaitEmail, Event::Text { text }) => {
            let email = text.trim().to_lowercase();
            Ok(TransitionResult::new(ConvState::LoginChecking { email })
                .with_effect(Effect::FetchProfile))
        }
        // Login succeeds only against the caller's own profile, compared
        // case-insensitively (both sides are lower-cased).
        (ConvState::LoginChecking { email }, Event::ProfileFetched { profile }) => match profile {
            Some(p) if p.email == *email => Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::SetAuthenticated(true))
                .with_effect(Effect::reply_menu("✅ Login successful! Welcome."))),
            _ => Ok(TransitionResult::new(ConvState::Idle).with_effect(Effect::reply(
                "❌ Incorrect email or user not registered. Please try again or use /register.",
            ))),
        },

        // ==================================================================
        // Subject management (gated operations, not flows)
        // ==================================================================
        (ConvState::Idle, Event::Command(Command::AddSubject)) => {
            Ok(TransitionResult::new(ConvState::AddMenuLoading).with_effect(Effect::FetchProfile))
        }
        (ConvState::AddMenuLoading, Event::ProfileFetched { profile }) => {
            let owned = profile.map(|p| p.subjects).unwrap_or_default();
            let remaining: Vec<String> = ctx
                .catalog
                .iter()
                .filter(|s| !owned.contains(*s))
                .cloned()
                .collect();
            Ok(if remaining.is_empty() {
                TransitionResult::new(ConvState::Idle)
                    .with_effect(Effect::reply_menu("You've added all available subjects!"))
            } else {
                TransitionResult::new(ConvState::Idle).with_effect(Effect::reply_with(
                    "Choose a subject to add:",
                    Keyboard::subject_menu(SelectionAction::Add, &remaining),
                ))
            })
        }

        (ConvState::Idle, Event::Command(Command::MySubjects)) => {
            Ok(TransitionResult::new(ConvState::SubjectsLoading).with_effect(Effect::FetchProfile))
        }
        (ConvState::SubjectsLoading, Event::ProfileFetched { profile }) => {
            let subjects = profile.map(|p| p.subjects).unwrap_or_default();
            Ok(if subjects.is_empty() {
                TransitionResult::new(ConvState::Idle)
                    .with_effect(Effect::reply_menu("You have no subjects yet."))
            } else {
                TransitionResult::new(ConvState::Idle).with_effect(Effect::reply_with(
                    "Your subjects:",
                    Keyboard::removal_list(&subjects),
                ))
            })
        }

        // ==================================================================
        // Quiz entry (stateless request, not a flow)
        // ==================================================================
        (ConvState::Idle, Event::Command(Command::QuizMe)) => {
            Ok(TransitionResult::new(ConvState::QuizEntry).with_effect(Effect::FetchProfile))
        }
        (ConvState::QuizEntry, Event::ProfileFetched { profile }) => {
            let subjects = profile.map(|p| p.subjects).unwrap_or_default();
            Ok(if subjects.is_empty() {
                TransitionResult::new(ConvState::Idle).with_effect(Effect::reply_menu(
                    "You need to add a subject first! Use /addsubject.",
                ))
            } else {
                TransitionResult::new(ConvState::Idle).with_effect(Effect::reply_with(
                    "Which subject would you like a quiz on?",
                    Keyboard::subject_menu(SelectionAction::Quiz, &subjects),
                ))
            })
        }

        // ==================================================================
        // Tutor flow
        // ==================================================================
        (ConvState::Idle, Event::Command(Command::Tutor)) => {
            Ok(TransitionResult::new(ConvState::TutorEntry).with_effect(Effect::FetchProfile))
        }
        (ConvState::TutorEntry, Event::ProfileFetched { profile }) => {
            let subjects = profile.map(|p| p.subjects).unwrap_or_default();
            Ok(if subjects.is_empty() {
                TransitionResult::new(ConvState::Idle)
                    .with_effect(Effect::reply_menu("Add a subject first with /addsubject."))
            } else {
                let keyboard = Keyboard::subject_menu(SelectionAction::Tutor, &subjects);
                TransitionResult::new(ConvState::TutorSelectSubject { offered: subjects })
                    .with_effect(Effect::reply_with("Which subject for tutoring?", keyboard))
            })
        }

        (
            ConvState::TutorSelectSubject { offered },
            Event::Selection {
                action: SelectionAction::Tutor,
                subject,
            },
        ) => {
            if offered.contains(&subject) {
                Ok(TransitionResult::new(ConvState::TutorAwaitQuestion {
                    subject: subject.clone(),
                })
                .with_effect(Effect::SetSubject {
                    subject: subject.clone(),
                })
                .with_effect(Effect::edit(format!(
                    "Great! Ask your question about {subject}:"
                ))))
            } else {
                Ok(TransitionResult::new(state.clone())
                    .with_effect(Effect::edit("That subject is not on your list.")))
            }
        }

        (ConvState::TutorAwaitQuestion { subject }, Event::Text { text }) => Ok(
            TransitionResult::new(ConvState::TutorStarting {
                subject: subject.clone(),
            })
            .with_effect(Effect::reply_hide(format!(
                "Initializing {CURRICULUM} Tutor for {subject}... please wait."
            )))
            .with_effect(Effect::StartTutorChat {
                subject: subject.clone(),
                question: text,
            }),
        ),
        (ConvState::TutorStarting { subject }, Event::TutorStarted { answer }) => {
            Ok(TransitionResult::new(ConvState::Tutoring {
                subject: subject.clone(),
            })
            .with_effect(Effect::reply_hide(answer))
            .with_effect(Effect::reply(
                "👆 You are now chatting with the tutor. Send /done to end the session.",
            )))
        }
        (ConvState::TutorStarting { .. }, Event::TutorFailed { .. }) => {
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::ClearTutorState)
                .with_effect(Effect::reply_menu(
                    "Couldn't connect to the tutor. Session ended.",
                )))
        }

        (ConvState::Tutoring { subject }, Event::Text { text }) => Ok(TransitionResult::new(
            ConvState::TutorAsking {
                subject: subject.clone(),
            },
        )
        .with_effect(Effect::AskTutor { question: text })),
        (ConvState::TutorAsking { subject }, Event::TutorAnswered { answer }) => {
            Ok(TransitionResult::new(ConvState::Tutoring {
                subject: subject.clone(),
            })
            .with_effect(Effect::reply(answer)))
        }
        (ConvState::TutorAsking { .. }, Event::TutorFailed { .. }) => {
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::ClearTutorState)
                .with_effect(Effect::reply_menu(
                    "The tutor is unavailable right now. Session ended.",
                )))
        }

        // A tutor button from an old menu, outside the selection state.
        (
            s,
            Event::Selection {
                action: SelectionAction::Tutor,
                ..
            },
        ) => Ok(TransitionResult::new(s.clone()).with_effect(Effect::edit(
            "This tutor menu has expired. Use /tutor to start again.",
        ))),

        // ==================================================================
        // Subject and quiz selections: valid from any state, and none of
        // them disturbs the current flow.
        // ==================================================================
        (
            s,
            Event::Selection {
                action: SelectionAction::Add,
                subject,
            },
        ) => Ok(if ctx.catalog.contains(&subject) {
            TransitionResult::new(s.clone()).with_effect(Effect::AddSubject { subject })
        } else {
            TransitionResult::new(s.clone()).with_effect(Effect::edit(format!(
                "'{subject}' is not an available subject."
            )))
        }),
        (
            s,
            Event::Selection {
                action: SelectionAction::Remove,
                subject,
            },
        ) => Ok(TransitionResult::new(s.clone()).with_effect(Effect::RemoveSubject { subject })),
        (
            s,
            Event::Selection {
                action: SelectionAction::Quiz,
                subject,
            },
        ) => Ok(if ctx.catalog.contains(&subject) {
            TransitionResult::new(s.clone()).with_effect(Effect::GenerateQuiz { subject })
        } else {
            TransitionResult::new(s.clone()).with_effect(Effect::edit(format!(
                "'{subject}' is not an available subject."
            )))
        }),
        (
            s,
            Event::Selection {
                action: SelectionAction::Noop,
                ..
            },
        ) => Ok(TransitionResult::new(s.clone())),

        // ==================================================================
        // Store failures: generic message, flow terminates to idle.
        // ==================================================================
        (ConvState::RegisterSaving { .. }, Event::StoreFailed { .. }) => {
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::reply("Couldn't save your data. Please try again.")))
        }
        (_, Event::StoreFailed { .. }) => Ok(TransitionResult::new(ConvState::Idle).with_effect(
            Effect::reply("Couldn't fetch your account right now. Please try again."),
        )),

        // Free text outside any flow is ignored.
        (ConvState::Idle, Event::Text { .. }) => Ok(TransitionResult::new(ConvState::Idle)),

        // Flow-entry commands while another flow is active.
        (s, Event::Command(_)) if !matches!(s, ConvState::Idle) => {
            Err(TransitionError::FlowInProgress)
        }

        (s, e) => Err(TransitionError::Unhandled {
            state: format!("{s:?}"),
            event: format!("{e:?}"),
        }),
    }
}

fn requires_login(event: &Event) -> bool {
    match event {
        Event::Command(command) => command.requires_login(),
        Event::Selection { action, .. } => action.requires_login(),
        _ => false,
    }
}
