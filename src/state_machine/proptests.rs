//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> ConvContext {
    ConvContext::new("test-session", "test-user", None)
}

fn count_saves(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::SaveEntry { .. }))
        .count()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_error_kind() -> impl Strategy<Value = ErrorKind> {
    prop_oneof![
        Just(ErrorKind::Configuration),
        Just(ErrorKind::InvalidRequest),
        Just(ErrorKind::UpstreamService),
        Just(ErrorKind::ResponseFormat),
        Just(ErrorKind::Persistence),
    ]
}

fn arb_save_status() -> impl Strategy<Value = SaveStatus> {
    prop_oneof![
        Just(SaveStatus::Pending),
        Just(SaveStatus::Saved),
        "[a-z ]{1,20}".prop_map(|message| SaveStatus::Failed { message }),
    ]
}

fn arb_ending() -> impl Strategy<Value = Ending> {
    prop_oneof![
        ("[a-zA-Z .]{0,40}", "[A-Z][a-z]{2,8}", arb_save_status()).prop_map(
            |(summary, mood, save)| Ending::Summarized {
                summary,
                mood,
                save
            }
        ),
        "[a-z ]{1,20}".prop_map(|message| Ending::FormatError { message }),
        Just(Ending::Cancelled),
    ]
}

fn arb_open_state() -> impl Strategy<Value = ConvState> {
    (0u32..=3).prop_map(|follow_ups| ConvState::AwaitingUserInput { follow_ups })
}

fn arb_busy_state() -> impl Strategy<Value = ConvState> {
    (0u32..=3, "[a-zA-Z ]{1,30}")
        .prop_map(|(follow_ups, pending)| ConvState::AwaitingCompletion { follow_ups, pending })
}

fn arb_terminated_state() -> impl Strategy<Value = ConvState> {
    arb_ending().prop_map(|ending| ConvState::Terminated { ending })
}

fn arb_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![arb_open_state(), arb_busy_state(), arb_terminated_state()]
}

/// Raw completion text: follow-ups, terminals, partials, and garbage
fn arb_raw_reply() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z ?]{1,30}".prop_map(|q| {
            serde_json::json!({"response": q, "summary": null, "mood": null}).to_string()
        }),
        ("[a-zA-Z .]{1,40}", "[A-Z][a-z]{2,8}").prop_map(|(s, m)| {
            format!(
                "Sure! {}",
                serde_json::json!({"response": "Saved.", "summary": s, "mood": m})
            )
        }),
        "[a-zA-Z .]{1,40}".prop_map(|s| {
            serde_json::json!({"response": "Saved.", "summary": s, "mood": null}).to_string()
        }),
        "[^{]{0,40}",
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-zA-Z ]{0,30}".prop_map(|text| Event::UserMessage { text }),
        arb_raw_reply().prop_map(|raw| Event::CompletionReceived { raw }),
        ("[a-zA-Z ]{1,30}", arb_error_kind()).prop_map(|(message, error_kind)| {
            Event::CompletionFailed {
                message,
                error_kind,
            }
        }),
        Just(Event::UserCancel),
        Just(Event::EntrySaved),
        "[a-z ]{1,20}".prop_map(|message| Event::EntrySaveFailed { message }),
        Just(Event::RetrySave),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // Busy sessions reject every new message
    #[test]
    fn prop_busy_rejects_messages(state in arb_busy_state(), text in "[a-zA-Z ]{0,30}") {
        let result = transition(&state, &test_context(), Event::UserMessage { text });
        prop_assert!(matches!(result, Err(TransitionError::Busy)));
    }

    // Once terminated, always terminated
    #[test]
    fn prop_terminal_is_sticky(state in arb_terminated_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, &test_context(), event) {
            prop_assert!(result.new_state.is_terminal(), "Left terminal state: {:?}", result.new_state);
        }
    }

    // A terminal state never emits transcript appends or completion requests
    #[test]
    fn prop_terminated_never_extends_transcript(
        state in arb_terminated_state(),
        event in arb_event(),
    ) {
        if let Ok(result) = transition(&state, &test_context(), event) {
            let extends = result.effects.iter().any(|e| matches!(
                e,
                Effect::AppendMessage { .. } | Effect::RequestCompletion { .. }
            ));
            prop_assert!(!extends, "Terminal state extended transcript: {:?}", result.effects);
        }
    }

    // No single transition emits more than one save
    #[test]
    fn prop_at_most_one_save_per_transition(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, &test_context(), event) {
            let saves = count_saves(&result.effects);
            prop_assert!(saves <= 1);
            if saves == 1 {
                let pending_save = matches!(
                    result.new_state,
                    ConvState::Terminated {
                        ending: Ending::Summarized { save: SaveStatus::Pending, .. }
                    }
                );
                prop_assert!(pending_save, "Save emitted into {:?}", result.new_state);
            }
        }
    }

    // Across a whole session, saves only repeat after a reported failure
    #[test]
    fn prop_saves_bounded_by_failures(events in proptest::collection::vec(arb_event(), 0..30)) {
        let ctx = test_context();
        let mut state = ConvState::default();
        let mut saves = 0usize;
        let mut failures = 0usize;

        for event in events {
            let is_failure = matches!(event, Event::EntrySaveFailed { .. });
            if let Ok(result) = transition(&state, &ctx, event) {
                if is_failure {
                    failures += 1;
                }
                saves += count_saves(&result.effects);
                state = result.new_state;
            }
        }

        prop_assert!(saves <= 1 + failures, "saves={saves} failures={failures}");
    }

    // The follow-up counter never passes the cap
    #[test]
    fn prop_follow_ups_never_exceed_cap(events in proptest::collection::vec(arb_event(), 0..30)) {
        let ctx = test_context();
        let mut state = ConvState::default();

        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                state = result.new_state;
                if let Some(n) = state.follow_ups() {
                    prop_assert!(n <= ctx.max_follow_ups, "follow_ups={n}");
                }
            }
        }
    }

    // Appends always come as a user turn followed by an assistant turn
    #[test]
    fn prop_appends_are_paired(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, &test_context(), event) {
            let appended: Vec<_> = result
                .effects
                .iter()
                .filter_map(|e| match e {
                    Effect::AppendMessage { message } => Some(message.is_user()),
                    _ => None,
                })
                .collect();
            prop_assert!(appended.is_empty() || appended == vec![true, false]);
        }
    }

    // Cancel from an open state always terminates and discards
    #[test]
    fn prop_cancel_discards(state in prop_oneof![arb_open_state(), arb_busy_state()]) {
        let result = transition(&state, &test_context(), Event::UserCancel).unwrap();
        prop_assert_eq!(result.new_state, ConvState::Terminated { ending: Ending::Cancelled });
        prop_assert_eq!(result.effects, vec![Effect::DiscardTranscript]);
    }

    // Open sessions accept any non-blank message
    #[test]
    fn prop_open_accepts_messages(state in arb_open_state(), text in "[a-zA-Z]{1,10}[a-zA-Z ]{0,20}") {
        let result = transition(&state, &test_context(), Event::UserMessage { text: text.clone() }).unwrap();
        prop_assert!(result.new_state.is_busy());
        let requested = matches!(
            &result.effects[..],
            [Effect::RequestCompletion { pending, .. }] if *pending == text
        );
        prop_assert!(requested);
    }

    // Completion failures never touch the transcript
    #[test]
    fn prop_failure_returns_to_input(
        state in arb_busy_state(),
        message in "[a-zA-Z ]{1,30}",
        error_kind in arb_error_kind(),
    ) {
        let before = state.follow_ups();
        let result = transition(
            &state,
            &test_context(),
            Event::CompletionFailed { message, error_kind },
        ).unwrap();
        prop_assert_eq!(result.new_state.follow_ups(), before);
        prop_assert!(!result.new_state.is_busy());
        let appended = result.effects.iter().any(|e| matches!(e, Effect::AppendMessage { .. }));
        prop_assert!(!appended, "Failure appended to transcript: {:?}", result.effects);
    }
}
