//! Core Types for the Classification Engine
//!
//! Defines the values that flow through one classification request:
//! - **ClassificationRequest:** immutable input shared by every provider
//! - **PartialRecord:** one provider's normalized answer
//! - **Settlement:** the outcome of one provider invocation
//! - **ProviderError / ErrorKind:** typed provider failures
//!
//! # Lifecycle
//! A request is created per call and dropped after the response. Partial
//! records are created by adapters and only read by the aggregator.

use base64::Engine;
use rockid_common::{Error, RockCategory};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Request Types
// ============================================================================

/// Default media type when the caller sends bare base64
const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

/// Image carried by a classification request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// MIME type (e.g. "image/png")
    pub media_type: String,
    /// Base64 data without the data-URI prefix
    pub data: String,
}

impl ImagePayload {
    /// Parse a base64 data URI or bare base64 string
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if the input is empty, the data URI is
    /// not base64-encoded, or the payload does not decode.
    ///
    /// # Examples
    ///
    /// ```
    /// use rockid_ai::types::ImagePayload;
    ///
    /// let image = ImagePayload::from_data_uri("data:image/png;base64,iVBORw0KGgo=").unwrap();
    /// assert_eq!(image.media_type, "image/png");
    /// assert_eq!(image.data, "iVBORw0KGgo=");
    /// ```
    pub fn from_data_uri(input: &str) -> Result<Self, Error> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidInput("image is empty".to_string()));
        }

        let (media_type, data) = match input.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest.split_once(',').ok_or_else(|| {
                    Error::InvalidInput("data URI is missing ',' separator".to_string())
                })?;
                let media_type = header.strip_suffix(";base64").ok_or_else(|| {
                    Error::InvalidInput("data URI must be base64-encoded".to_string())
                })?;
                let media_type = if media_type.is_empty() {
                    DEFAULT_MEDIA_TYPE
                } else {
                    media_type
                };
                (media_type.to_string(), data)
            }
            None => (DEFAULT_MEDIA_TYPE.to_string(), input),
        };

        let data: String = data.chars().filter(|c| !c.is_whitespace()).collect();
        if data.is_empty() {
            return Err(Error::InvalidInput("image data is empty".to_string()));
        }
        base64::engine::general_purpose::STANDARD
            .decode(&data)
            .map_err(|e| Error::InvalidInput(format!("image is not valid base64: {}", e)))?;

        Ok(Self { media_type, data })
    }

    /// Re-encode as a data URI
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Immutable input handed identically to every provider
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub image: ImagePayload,
    /// Optional free-text hint from the caller
    pub message: Option<String>,
}

impl ClassificationRequest {
    pub fn new(image: ImagePayload) -> Self {
        Self {
            image,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Provider-neutral prompt: one system instruction plus one user turn
#[derive(Debug, Clone)]
pub struct Prompt<'a> {
    pub system: &'a str,
    pub text: String,
    pub image: Option<&'a ImagePayload>,
}

// ============================================================================
// Provider Output Types
// ============================================================================

/// One provider's normalized classification
///
/// Serialized with the same field names the parser reads, so a serialized
/// record parses back into an equal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialRecord {
    #[serde(rename = "name")]
    pub label: String,
    #[serde(rename = "type")]
    pub category: RockCategory,
    #[serde(rename = "composition")]
    pub attributes: Vec<String>,
    #[serde(rename = "hardness")]
    pub scalar_property: String,
    #[serde(rename = "formation")]
    pub explanation: String,
    pub locations: Vec<String>,
    #[serde(rename = "funFact")]
    pub note: String,
    /// Self-reported confidence, 0-100
    pub confidence: u8,
    #[serde(rename = "source")]
    pub source_id: String,
}

/// Coarse failure category carried by a rejected settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network failure (connect, reset, TLS)
    Transport,
    /// Provider did not answer within its budget
    Timeout,
    /// Non-2xx HTTP status
    HttpStatus,
    /// Response envelope did not match the provider's shape
    Schema,
    /// Adapter misconfigured (bad key format, client build failure)
    Config,
    /// Caller or service cancelled the request
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::HttpStatus => "http_status",
            ErrorKind::Schema => "schema",
            ErrorKind::Config => "config",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Errors that can occur when calling a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP/network error
    #[error("http error: {0}")]
    Http(reqwest::Error),

    /// Request timed out
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Provider answered with a non-success status
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Provider answered 2xx but the envelope was unusable
    #[error("unexpected response shape: {0}")]
    Schema(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Cancelled before the provider settled
    #[error("cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for ProviderError {
    /// Drops the request URL so query strings never reach logs or callers
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

impl ProviderError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            Self::Http(e) if e.is_decode() => ErrorKind::Schema,
            Self::Http(_) => ErrorKind::Transport,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Status { .. } => ErrorKind::HttpStatus,
            Self::Schema(_) => ErrorKind::Schema,
            Self::Config(_) => ErrorKind::Config,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

// ============================================================================
// Settlement
// ============================================================================

/// Outcome of one provider invocation
///
/// Exactly one settlement exists per dispatched provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Fulfilled(PartialRecord),
    Rejected {
        source_id: String,
        kind: ErrorKind,
        message: String,
    },
}

impl Settlement {
    pub fn rejected(source_id: impl Into<String>, error: &ProviderError) -> Self {
        Settlement::Rejected {
            source_id: source_id.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            Settlement::Fulfilled(record) => &record.source_id,
            Settlement::Rejected { source_id, .. } => source_id,
        }
    }

    pub fn as_fulfilled(&self) -> Option<&PartialRecord> {
        match self {
            Settlement::Fulfilled(record) => Some(record),
            Settlement::Rejected { .. } => None,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settlement::Fulfilled(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Settlement::Fulfilled(_) => None,
            Settlement::Rejected { kind, .. } => Some(*kind),
        }
    }
}
