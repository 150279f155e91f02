//! Anthropic Messages wire format
//!
//! - Endpoint: `POST {base_url}/messages`
//! - Auth: `x-api-key` plus `anthropic-version` headers
//! - Image: base64 `image` content block
//! - Reply text: concatenated `content[*].text` blocks of type `text`

use super::{decode_envelope, WireSettings};
use crate::types::{Prompt, ProviderError};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

fn body<'a>(wire: &'a WireSettings, prompt: &'a Prompt<'_>) -> MessagesRequest<'a> {
    let mut content = Vec::with_capacity(2);
    if let Some(image) = prompt.image {
        content.push(ContentBlock::Image {
            source: ImageSource {
                source_type: "base64",
                media_type: &image.media_type,
                data: &image.data,
            },
        });
    }
    content.push(ContentBlock::Text { text: &prompt.text });

    MessagesRequest {
        model: &wire.model,
        max_tokens: wire.max_tokens,
        system: prompt.system,
        messages: vec![ApiMessage {
            role: "user",
            content,
        }],
    }
}

pub(crate) fn request(client: &Client, wire: &WireSettings, prompt: &Prompt<'_>) -> RequestBuilder {
    client
        .post(format!("{}/messages", wire.base_url))
        .header("x-api-key", &wire.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&body(wire, prompt))
}

pub(crate) fn extract_text(body: &str) -> Result<String, ProviderError> {
    let response: MessagesResponse = decode_envelope(body)?;
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.block_type == "text")
        .filter_map(|block| block.text)
        .collect();
    Ok(text)
}
