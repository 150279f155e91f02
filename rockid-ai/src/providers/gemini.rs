//! Gemini `generateContent` wire format
//!
//! - Endpoint: `POST {base_url}/models/{model}:generateContent`
//! - Auth: `x-goog-api-key` header
//! - Image: `inlineData` part with raw base64
//! - Reply text: concatenated `candidates[0].content.parts[*].text`

use super::{decode_envelope, WireSettings};
use crate::types::{Prompt, ProviderError};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn body<'a>(wire: &'a WireSettings, prompt: &'a Prompt<'_>) -> GenerateContentRequest<'a> {
    let mut parts = vec![Part::Text { text: &prompt.text }];
    if let Some(image) = prompt.image {
        parts.push(Part::Inline {
            inline_data: InlineData {
                mime_type: &image.media_type,
                data: &image.data,
            },
        });
    }

    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part::Text {
                text: prompt.system,
            }],
        },
        contents: vec![Content {
            role: Some("user"),
            parts,
        }],
        generation_config: GenerationConfig {
            max_output_tokens: wire.max_tokens,
        },
    }
}

pub(crate) fn request(client: &Client, wire: &WireSettings, prompt: &Prompt<'_>) -> RequestBuilder {
    client
        .post(format!(
            "{}/models/{}:generateContent",
            wire.base_url, wire.model
        ))
        .header("x-goog-api-key", wire.api_key.as_str())
        .json(&body(wire, prompt))
}

pub(crate) fn extract_text(body: &str) -> Result<String, ProviderError> {
    let response: GenerateContentResponse = decode_envelope(body)?;
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .ok_or_else(|| ProviderError::schema("no candidates in response"))?;

    let text: String = content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    Ok(text)
}
