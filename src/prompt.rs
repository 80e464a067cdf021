//! Prompt contract for the diary assistant
//!
//! The framing below is sent as the first user turn of every completion
//! call. It fixes the assistant persona and the only two reply shapes the
//! reply parser accepts:
//!
//! - follow-up: `{"response": "...", "summary": null, "mood": null}`
//! - terminal:  `{"response": "...", "summary": "...", "mood": "..."}`

/// Hard cap on follow-up turns before a terminal reply is required
pub const MAX_FOLLOW_UPS: u32 = 3;

/// Mood used when a terminal reply leaves the label out or blank
pub const DEFAULT_MOOD: &str = "Neutral";

/// Assistant message shown when a malformed reply carried no text at all
pub const UNCLEAR_REPLY: &str = "AI response was unclear.";

const SYSTEM_INSTRUCTION: &str = r#"You are InnerNote, an AI diary assistant.
1. Check if the conversation history starts with context about a previous entry from today (e.g., "Continuing from earlier today...").
2. Ask 1-2 relevant follow-up questions based on the user's latest input. Keep questions concise. Ask a general question last. If the user introduces an entirely new topic, you may ask up to 3 more follow-up questions about it.
3. After the follow-ups, analyze the *entire conversation* for the day.
4. **If there was previous context provided at the start**, generate a *single, combined summary* that integrates the key points from *both* the previous context and the new chat information. Make it flow naturally.
5. **If there was no previous context**, generate a concise summary (2-4 sentences) of the user's day based on the current chat.
6. Determine the user's primary overall mood for the day based on all available information (e.g., Happy, Sad, Tired, Neutral, Mixed). Use a single word.
7. If asking a follow-up, respond ONLY in this JSON format:
   {"response": "Your follow-up question.", "summary": null, "mood": null}
8. If providing the final summary, respond ONLY in this JSON format:
   {"response": "Okay, I've saved a summary of your day.", "summary": "The final summary text (merged if applicable).", "mood": "The overall detected mood."}
9. Stick to these steps. No extra conversation and no text outside the JSON object. Never ask more than 3 follow-up questions in total."#;

/// Model acknowledgement that closes the framing exchange
pub const PRIMING_ACK: &str = "Okay, I understand my role. Ready for input.";

/// Final user turn asking the model to reply to the transcript
pub const CONTINUE_NUDGE: &str = "Continue based on history.";

const CONTEXT_ACK: &str = "Understood. I will merge that into today's summary.";

const FORCE_SUMMARY: &str = "The follow-up limit has been reached. Do not ask another question. Reply now with the final summary JSON, including both \"summary\" and \"mood\".";

const FRESH_GREETING: &str = "Hi there! Tell me a bit about how your day went.";

const SNIPPET_LIMIT: usize = 100;
const SNIPPET_KEEP: usize = 97;

/// The instruction turn that opens every upstream conversation
pub fn system_instruction() -> &'static str {
    SYSTEM_INSTRUCTION
}

/// Framing exchange carrying an earlier summary from the same day
pub fn previous_context_turns(previous_summary: &str) -> (String, &'static str) {
    (
        format!(
            "Continuing from earlier today. Summary of today's earlier entry: \"{previous_summary}\""
        ),
        CONTEXT_ACK,
    )
}

/// Nudge sent as the last user turn
pub fn continue_nudge(force_summary: bool) -> String {
    if force_summary {
        format!("{CONTINUE_NUDGE} {FORCE_SUMMARY}")
    } else {
        CONTINUE_NUDGE.to_string()
    }
}

/// Greeting that seeds a new transcript
pub fn greeting(previous_summary: Option<&str>) -> String {
    match previous_summary {
        Some(summary) => format!(
            "Continuing from earlier today (you wrote: \"{}\"). What else happened, or how are you feeling now?",
            snippet(summary)
        ),
        None => FRESH_GREETING.to_string(),
    }
}

fn snippet(summary: &str) -> String {
    if summary.chars().count() > SNIPPET_LIMIT {
        let kept: String = summary.chars().take(SNIPPET_KEEP).collect();
        format!("{kept}...")
    } else {
        summary.to_string()
    }
}
