//! Property-based tests for reply extraction
//!
//! - A serialized reply survives any brace-free prose around it
//! - Braces and quotes inside string values never break the scan
//! - Text without an opening brace never parses

use super::*;
use proptest::prelude::*;

/// Prose that cannot open or close an object
fn arb_prose() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?:\n-]{0,40}"
}

/// Field text that stresses the scanner
fn arb_field_text() -> impl Strategy<Value = String> {
    "[a-zA-Z {}\\[\\]\"\\\\.!?]{1,40}".prop_filter("non-blank", |s| !s.trim().is_empty())
}

fn arb_reply() -> impl Strategy<Value = StructuredReply> {
    (
        arb_field_text(),
        proptest::option::of(arb_field_text()),
        proptest::option::of("[A-Z][a-z]{2,8}"),
    )
        .prop_map(|(response, summary, mood)| StructuredReply {
            response,
            summary,
            mood,
        })
}

proptest! {
    #[test]
    fn prop_reply_survives_surrounding_prose(
        before in arb_prose(),
        reply in arb_reply(),
        after in arb_prose(),
    ) {
        let json = serde_json::to_string(&reply).unwrap();
        let raw = format!("{before}{json}{after}");

        let parsed = parse_reply(&raw).unwrap();
        prop_assert_eq!(parsed, reply);
    }

    #[test]
    fn prop_extracted_span_is_the_serialized_object(
        before in arb_prose(),
        reply in arb_reply(),
        after in arb_prose(),
    ) {
        let json = serde_json::to_string(&reply).unwrap();
        let raw = format!("{before}{json}{after}");
        prop_assert_eq!(extract_json_object(&raw), Some(json.as_str()));
    }

    #[test]
    fn prop_text_without_open_brace_never_parses(raw in "[^{]{0,80}") {
        prop_assert_eq!(parse_reply(&raw), Err(ReplyFormatError::NoJsonObject));
    }

    #[test]
    fn prop_terminal_kind_always_has_mood(reply in arb_reply()) {
        let terminal = reply.is_terminal();
        match reply.into_kind() {
            ReplyKind::Terminal { mood, .. } => {
                prop_assert!(terminal);
                prop_assert!(!mood.trim().is_empty());
            }
            ReplyKind::FollowUp { .. } => prop_assert!(!terminal),
        }
    }
}
