//! Provider Adapters
//!
//! Each adapter wraps one external vision model and turns the canonical
//! request into a `Settlement`. Wire formats differ per provider family and
//! live in their own modules; the rest of the crate only sees the
//! `ProviderAdapter` trait.
//!
//! # Wire formats
//! 1. **openai** - Chat Completions with `image_url` data URI parts
//! 2. **gemini** - `generateContent` with `inlineData` parts
//! 3. **anthropic** - Messages API with base64 `image` blocks
//!
//! # Failure isolation
//! `invoke` never returns an error: transport and envelope failures become
//! `Settlement::Rejected`, and unparseable model text becomes a placeholder
//! record with low confidence.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use crate::parser::{self, ParsePolicy};
use crate::prompts;
use crate::types::{ClassificationRequest, PartialRecord, Prompt, ProviderError, Settlement};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder};
use rockid_common::config::ProviderKind;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest provider error body kept in an error message
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Uniform interface over all providers
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Source id reported in provenance
    fn source_id(&self) -> &str;

    /// Send one prompt and return the model's reply text
    ///
    /// # Errors
    /// Returns `ProviderError` on transport failure, non-2xx status, or an
    /// envelope without reply text.
    async fn complete(&self, prompt: &Prompt<'_>) -> Result<String, ProviderError>;

    /// Classify the request and settle
    ///
    /// Parser failure is not adapter failure: it degrades to a placeholder
    /// record scored by `policy`.
    async fn invoke(&self, request: &ClassificationRequest, policy: &ParsePolicy) -> Settlement {
        let prompt = prompts::identification_prompt(request);
        match self.complete(&prompt).await {
            Ok(text) => match parser::parse_record(&text, self.source_id()) {
                Ok(record) => {
                    debug!(
                        provider = self.source_id(),
                        label = %record.label,
                        category = %record.category,
                        confidence = record.confidence,
                        "Provider reply parsed"
                    );
                    Settlement::Fulfilled(record)
                }
                Err(e) => {
                    warn!(
                        provider = self.source_id(),
                        error = %e,
                        "Provider reply not parseable, using placeholder"
                    );
                    Settlement::Fulfilled(PartialRecord::placeholder(
                        self.source_id(),
                        policy.placeholder_confidence,
                    ))
                }
            },
            Err(e) => {
                warn!(
                    provider = self.source_id(),
                    kind = %e.kind(),
                    error = %e,
                    "Provider call failed"
                );
                Settlement::rejected(self.source_id(), &e)
            }
        }
    }
}

/// Everything an HTTP adapter needs, resolved up front
///
/// Credentials arrive here as plain values; adapters never consult the
/// environment.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub id: String,
    pub kind: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub max_tokens: u32,
    pub requests_per_minute: Option<u32>,
    /// Transport-level timeout for one HTTP exchange
    pub timeout: Duration,
}

/// Fields the wire modules read when building a request
#[derive(Debug, Clone)]
pub(crate) struct WireSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub max_tokens: u32,
}

/// HTTP adapter, tagged by wire format
pub struct HttpProvider {
    source_id: String,
    kind: ProviderKind,
    wire: WireSettings,
    client: Client,
    rate_limiter: Option<DefaultDirectRateLimiter>,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("source_id", &self.source_id)
            .field("kind", &self.kind)
            .field("model", &self.wire.model)
            .field("base_url", &self.wire.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpProvider {
    /// Create adapter from resolved settings
    ///
    /// # Errors
    /// Returns `ProviderError::Config` if the key is blank or the HTTP client
    /// cannot be built.
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        if settings.api_key.trim().is_empty() {
            return Err(ProviderError::config(format!(
                "provider {} has no API key",
                settings.id
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("rockid/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to create HTTP client: {e}")))?;

        let rate_limiter = match settings.requests_per_minute {
            Some(rpm) => {
                let rpm = NonZeroU32::new(rpm).ok_or_else(|| {
                    ProviderError::config("requests_per_minute must be at least 1")
                })?;
                Some(RateLimiter::direct(Quota::per_minute(rpm)))
            }
            None => None,
        };

        Ok(Self {
            source_id: settings.id,
            kind: settings.kind,
            wire: WireSettings {
                base_url: settings.base_url.trim_end_matches('/').to_string(),
                model: settings.model,
                api_key: settings.api_key,
                max_tokens: settings.max_tokens,
            },
            client,
            rate_limiter,
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn build_request(&self, prompt: &Prompt<'_>) -> RequestBuilder {
        match self.kind {
            ProviderKind::OpenAi => openai::request(&self.client, &self.wire, prompt),
            ProviderKind::Gemini => gemini::request(&self.client, &self.wire, prompt),
            ProviderKind::Anthropic => anthropic::request(&self.client, &self.wire, prompt),
        }
    }

    fn extract_text(&self, body: &str) -> Result<String, ProviderError> {
        match self.kind {
            ProviderKind::OpenAi => openai::extract_text(body),
            ProviderKind::Gemini => gemini::extract_text(body),
            ProviderKind::Anthropic => anthropic::extract_text(body),
        }
    }
}

#[async_trait]
impl ProviderAdapter for HttpProvider {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn complete(&self, prompt: &Prompt<'_>) -> Result<String, ProviderError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        debug!(provider = %self.source_id, model = %self.wire.model, "Sending provider request");

        let response = self.build_request(prompt).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let text = self.extract_text(&body)?;
        if text.trim().is_empty() {
            return Err(ProviderError::schema("reply contained no text"));
        }
        Ok(text)
    }
}

/// Decode a provider envelope, mapping failures to `ProviderError::Schema`
pub(crate) fn decode_envelope<T: serde::de::DeserializeOwned>(
    body: &str,
) -> Result<T, ProviderError> {
    serde_json::from_str(body)
        .map_err(|e| ProviderError::schema(format!("Failed to parse response envelope: {e}")))
}
