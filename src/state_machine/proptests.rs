//! Property-based tests for the state machine
//!
//! These verify key invariants hold across all reachable inputs.

use super::effect::Effect;
use super::event::{Command, Event, SelectionAction};
use super::state::{ConvState, Session, SessionContext};
use super::transition::transition;
use proptest::prelude::*;

fn ctx() -> SessionContext {
    SessionContext::new("prop-user", None, SessionContext::default_catalog())
}

fn guest() -> Session {
    Session::new()
}

fn member() -> Session {
    let mut session = Session::new();
    session.authenticated = true;
    session
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::Start),
        Just(Command::Register),
        Just(Command::Login),
        Just(Command::Logout),
        Just(Command::Cancel),
        Just(Command::MySubjects),
        Just(Command::AddSubject),
        Just(Command::QuizMe),
        Just(Command::Tutor),
        Just(Command::Done),
    ]
}

fn arb_action() -> impl Strategy<Value = SelectionAction> {
    prop_oneof![
        Just(SelectionAction::Add),
        Just(SelectionAction::Remove),
        Just(SelectionAction::Tutor),
        Just(SelectionAction::Quiz),
        Just(SelectionAction::Noop),
    ]
}

fn arb_user_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_command().prop_map(Event::Command),
        "[a-zA-Z0-9@. ]{0,40}".prop_map(|text| Event::Text { text }),
        (arb_action(), "[A-Za-z]{1,12}")
            .prop_map(|(action, subject)| Event::Selection { action, subject }),
    ]
}

/// States a session can rest in between user events
fn arb_resting_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![
        Just(ConvState::Idle),
        Just(ConvState::RegisterAwaitEmail),
        Just(ConvState::LoginAwaitEmail),
        proptest::collection::vec("[A-Za-z]{1,12}", 1..4)
            .prop_map(|offered| ConvState::TutorSelectSubject { offered }),
        "[A-Za-z]{1,12}".prop_map(|subject| ConvState::TutorAwaitQuestion { subject }),
        "[A-Za-z]{1,12}".prop_map(|subject| ConvState::Tutoring { subject }),
    ]
}

proptest! {
    /// Transitions never panic for any resting state and user event.
    #[test]
    fn transitions_never_panic(
        state in arb_resting_state(),
        event in arb_user_event(),
        authed in any::<bool>(),
    ) {
        let session = if authed { member() } else { guest() };
        let _ = transition(&state, &ctx(), &session, event);
    }

    /// Protected events from unauthenticated sessions always terminate to
    /// Idle with a lone login prompt and no collaborator effects.
    #[test]
    fn gate_is_sound(state in arb_resting_state(), event in arb_user_event()) {
        let protected = match &event {
            Event::Command(command) => command.requires_login(),
            Event::Selection { action, .. } => action.requires_login(),
            _ => false,
        };
        prop_assume!(protected);

        let result = transition(&state, &ctx(), &guest(), event).unwrap();
        prop_assert_eq!(result.new_state, ConvState::Idle);
        prop_assert_eq!(result.effects.len(), 1);
        let is_reply = matches!(result.effects[0], Effect::Reply { .. });
        prop_assert!(is_reply);
    }

    /// Cancel always lands in Idle and clears tutoring state.
    #[test]
    fn cancel_always_returns_to_idle(state in arb_resting_state(), authed in any::<bool>()) {
        let session = if authed { member() } else { guest() };
        let result =
            transition(&state, &ctx(), &session, Event::Command(Command::Cancel)).unwrap();
        prop_assert_eq!(result.new_state, ConvState::Idle);
        prop_assert!(result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::ClearTutorState)));
    }

    /// Registration emails are normalized to lower-case before any lookup.
    #[test]
    fn registration_normalizes_email(
        raw in "[A-Za-z0-9.]{1,10}@[A-Za-z]{1,8}\\.[A-Za-z]{2,3}",
    ) {
        let result = transition(
            &ConvState::RegisterAwaitEmail,
            &ctx(),
            &guest(),
            Event::Text { text: raw.clone() },
        )
        .unwrap();

        let lowered = raw.to_lowercase();
        let state_matches = matches!(
            &result.new_state,
            ConvState::RegisterChecking { email } if *email == lowered
        );
        prop_assert!(state_matches);
        let effect_matches = matches!(
            result.effects.first(),
            Some(Effect::CheckEmail { email }) if *email == lowered
        );
        prop_assert!(effect_matches);
    }
}
