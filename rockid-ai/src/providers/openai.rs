//! OpenAI Chat Completions wire format
//!
//! - Endpoint: `POST {base_url}/chat/completions`
//! - Auth: `Authorization: Bearer <key>`
//! - Image: `image_url` content part carrying a data URI
//! - Reply text: `choices[0].message.content`

use super::{decode_envelope, WireSettings};
use crate::types::{Prompt, ProviderError};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn body<'a>(wire: &'a WireSettings, prompt: &'a Prompt<'_>) -> ChatCompletionRequest<'a> {
    let mut parts = vec![ContentPart::Text { text: &prompt.text }];
    if let Some(image) = prompt.image {
        parts.push(ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image.data_uri(),
            },
        });
    }

    ChatCompletionRequest {
        model: &wire.model,
        max_tokens: wire.max_tokens,
        messages: vec![
            ApiMessage {
                role: "system",
                content: MessageContent::Text(prompt.system),
            },
            ApiMessage {
                role: "user",
                content: MessageContent::Parts(parts),
            },
        ],
    }
}

pub(crate) fn request(client: &Client, wire: &WireSettings, prompt: &Prompt<'_>) -> RequestBuilder {
    client
        .post(format!("{}/chat/completions", wire.base_url))
        .bearer_auth(&wire.api_key)
        .json(&body(wire, prompt))
}

pub(crate) fn extract_text(body: &str) -> Result<String, ProviderError> {
    let response: ChatCompletionResponse = decode_envelope(body)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::schema("no message content in choices"))
}
