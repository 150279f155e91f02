//! Prompt templates sent to providers

use crate::types::{ClassificationRequest, ImagePayload, Prompt};
use rockid_common::CanonicalRecord;

/// System instruction for image identification
///
/// The key names match what `parser::parse_record` reads.
pub const IDENTIFY_SYSTEM_PROMPT: &str = "You are an expert geologist. Identify the rock in the \
image. Respond with exactly one JSON object and nothing else, using these keys: \
\"name\" (string, the rock's common name), \
\"type\" (one of \"Igneous\", \"Sedimentary\", \"Metamorphic\"), \
\"composition\" (array of mineral names), \
\"hardness\" (string, Mohs scale range), \
\"formation\" (string, how the rock forms), \
\"locations\" (array of places it is commonly found), \
\"funFact\" (string, one interesting fact), \
\"confidence\" (integer 0-100, how sure you are).";

/// System instruction for follow-up questions
pub const CHAT_SYSTEM_PROMPT: &str = "You are a friendly geology assistant helping someone \
understand a rock they photographed. Answer concisely in plain prose. If earlier \
identification results are provided, use them as context but correct them if the question \
reveals they are wrong.";

const IDENTIFY_USER_TEXT: &str = "Identify this rock specimen.";

/// Build the identification prompt for one request
pub fn identification_prompt(request: &ClassificationRequest) -> Prompt<'_> {
    let text = match request.message.as_deref().map(str::trim) {
        Some(hint) if !hint.is_empty() => {
            format!("{}\nAdditional notes from the user: {}", IDENTIFY_USER_TEXT, hint)
        }
        _ => IDENTIFY_USER_TEXT.to_string(),
    };

    Prompt {
        system: IDENTIFY_SYSTEM_PROMPT,
        text,
        image: Some(&request.image),
    }
}

/// Build the follow-up chat prompt
///
/// Prior results are embedded as JSON so the provider sees exactly what the
/// caller was shown.
pub fn chat_prompt<'a>(
    message: &str,
    results: Option<&CanonicalRecord>,
    image: Option<&'a ImagePayload>,
) -> Prompt<'a> {
    let mut text = String::new();
    if let Some(results) = results {
        if let Ok(json) = serde_json::to_string_pretty(results) {
            text.push_str("Earlier identification results:\n");
            text.push_str(&json);
            text.push_str("\n\n");
        }
    }
    text.push_str("Question: ");
    text.push_str(message.trim());

    Prompt {
        system: CHAT_SYSTEM_PROMPT,
        text,
        image,
    }
}
