//! Parsing of raw completion output into structured replies
//!
//! The model is told to answer with a bare JSON object, but it regularly
//! wraps the object in prose ("Sure! {...}") or code fences. The scanner
//! here walks the text with an explicit brace depth, honouring string
//! literals and escapes, and returns the first span that parses as a JSON
//! object.

#[cfg(test)]
mod proptests;

use crate::prompt::DEFAULT_MOOD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The parse every completion call must produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredReply {
    pub response: String,
    pub summary: Option<String>,
    pub mood: Option<String>,
}

/// What a reply means for the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    FollowUp {
        response: String,
    },
    Terminal {
        response: String,
        summary: String,
        mood: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyFormatError {
    #[error("Could not find JSON object in AI response.")]
    NoJsonObject,
    #[error("Parsed JSON is missing 'response' string field.")]
    MissingResponse,
}

impl StructuredReply {
    /// Classify the reply.
    ///
    /// A reply carrying only one of `summary`/`mood` is still terminal: the
    /// missing summary becomes empty and the missing mood becomes
    /// [`DEFAULT_MOOD`], so a half-formed reply can never stall the session.
    pub fn into_kind(self) -> ReplyKind {
        match (self.summary, self.mood) {
            (None, None) => ReplyKind::FollowUp {
                response: self.response,
            },
            (summary, mood) => ReplyKind::Terminal {
                response: self.response,
                summary: summary.unwrap_or_default(),
                mood: normalize_mood(mood.as_deref()),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.summary.is_some() || self.mood.is_some()
    }
}

/// Trimmed mood label, falling back to [`DEFAULT_MOOD`] when blank
pub fn normalize_mood(mood: Option<&str>) -> String {
    match mood.map(str::trim) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => DEFAULT_MOOD.to_string(),
    }
}

/// Parse raw completion text into a [`StructuredReply`]
pub fn parse_reply(raw: &str) -> Result<StructuredReply, ReplyFormatError> {
    let (_, object) = find_json_object(raw).ok_or(ReplyFormatError::NoJsonObject)?;

    let response = object
        .get("response")
        .and_then(Value::as_str)
        .ok_or(ReplyFormatError::MissingResponse)?
        .to_string();

    Ok(StructuredReply {
        response,
        summary: non_empty_string(object.get("summary")),
        mood: non_empty_string(object.get("mood")),
    })
}

/// Return the first substring of `text` that is a well-formed JSON object
pub fn extract_json_object(text: &str) -> Option<&str> {
    find_json_object(text).map(|(span, _)| span)
}

fn find_json_object(text: &str) -> Option<(&str, Map<String, Value>)> {
    for (start, c) in text.char_indices() {
        if c != '{' {
            continue;
        }
        let Some(end) = balanced_end(text, start) else {
            continue;
        };
        let Some(candidate) = text.get(start..end) else {
            continue;
        };
        if let Ok(object) = serde_json::from_str::<Map<String, Value>>(candidate) {
            return Some((candidate, object));
        }
    }
    None
}

/// Byte offset one past the brace that closes the object opened at `start`
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text.get(start..)?.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_up_with_leading_prose() {
        let raw = r#"Sure! {"response":"How did that make you feel?","summary":null,"mood":null}"#;
        let reply = parse_reply(raw).unwrap();
        assert_eq!(
            reply.into_kind(),
            ReplyKind::FollowUp {
                response: "How did that make you feel?".to_string()
            }
        );
    }

    #[test]
    fn test_terminal_reply() {
        let raw = r#"{"response":"Saved.","summary":"Had a productive day.","mood":"Happy"}"#;
        let reply = parse_reply(raw).unwrap();
        assert!(reply.is_terminal());
        assert_eq!(
            reply.into_kind(),
            ReplyKind::Terminal {
                response: "Saved.".to_string(),
                summary: "Had a productive day.".to_string(),
                mood: "Happy".to_string(),
            }
        );
    }

    #[test]
    fn test_no_braces_is_format_error() {
        assert_eq!(
            parse_reply("I'm not sure what you mean."),
            Err(ReplyFormatError::NoJsonObject)
        );
    }

    #[test]
    fn test_missing_response_field() {
        assert_eq!(
            parse_reply(r#"{"summary":"x","mood":"Sad"}"#),
            Err(ReplyFormatError::MissingResponse)
        );
        assert_eq!(
            parse_reply(r#"{"response": 42}"#),
            Err(ReplyFormatError::MissingResponse)
        );
    }

    #[test]
    fn test_braces_inside_strings() {
        let raw = r#"Here: {"response":"Use {braces} and \"quotes\" }","summary":null,"mood":null} done"#;
        let reply = parse_reply(raw).unwrap();
        assert_eq!(reply.response, r#"Use {braces} and "quotes" }"#);
        assert!(!reply.is_terminal());
    }

    #[test]
    fn test_code_fence_wrapping() {
        let raw = "```json\n{\"response\":\"Tell me more?\",\"summary\":null,\"mood\":null}\n```";
        assert_eq!(parse_reply(raw).unwrap().response, "Tell me more?");
    }

    #[test]
    fn test_malformed_early_brace_is_skipped() {
        let raw = r#"Note {this is not json} then {"response":"ok","summary":null,"mood":null}"#;
        assert_eq!(
            extract_json_object(raw),
            Some(r#"{"response":"ok","summary":null,"mood":null}"#)
        );
    }

    #[test]
    fn test_first_of_two_objects_wins() {
        let raw = r#"{"response":"first"} {"response":"second"}"#;
        assert_eq!(parse_reply(raw).unwrap().response, "first");
    }

    #[test]
    fn test_unbalanced_text() {
        assert_eq!(extract_json_object(r#"{"response":"never closed""#), None);
        assert_eq!(extract_json_object("}}{"), None);
    }

    #[test]
    fn test_nested_object_is_kept_whole() {
        let raw = r#"{"response":"ok","meta":{"a":{"b":1}},"summary":null,"mood":null}"#;
        assert_eq!(extract_json_object(raw), Some(raw));
    }

    #[test]
    fn test_empty_strings_count_as_null() {
        let reply = parse_reply(r#"{"response":"Anything else?","summary":"","mood":" "}"#).unwrap();
        assert_eq!(reply.summary, None);
        assert_eq!(reply.mood, None);
        assert!(matches!(reply.into_kind(), ReplyKind::FollowUp { .. }));
    }

    #[test]
    fn test_partial_terminal_defaults_mood() {
        let reply = parse_reply(r#"{"response":"Saved.","summary":"Quiet day.","mood":null}"#).unwrap();
        assert_eq!(
            reply.into_kind(),
            ReplyKind::Terminal {
                response: "Saved.".to_string(),
                summary: "Quiet day.".to_string(),
                mood: DEFAULT_MOOD.to_string(),
            }
        );
    }

    #[test]
    fn test_partial_terminal_defaults_summary() {
        let reply = parse_reply(r#"{"response":"Saved.","mood":"Tired"}"#).unwrap();
        assert_eq!(
            reply.into_kind(),
            ReplyKind::Terminal {
                response: "Saved.".to_string(),
                summary: String::new(),
                mood: "Tired".to_string(),
            }
        );
    }

    #[test]
    fn test_mood_is_trimmed() {
        assert_eq!(normalize_mood(Some("  Mixed \n")), "Mixed");
        assert_eq!(normalize_mood(Some("")), DEFAULT_MOOD);
        assert_eq!(normalize_mood(None), DEFAULT_MOOD);
    }

    #[test]
    fn test_multibyte_prose() {
        let raw = r#"Voilà — {"response":"Ça va ?","summary":null,"mood":null} ✓"#;
        assert_eq!(parse_reply(raw).unwrap().response, "Ça va ?");
    }
}
