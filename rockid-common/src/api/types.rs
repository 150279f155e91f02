//! Shared API request/response types
//!
//! The JSON field names here are the wire contract with the presentation
//! layer and with the providers' prompt (`name`, `type`, `composition`,
//! `hardness`, `formation`, `locations`, `funFact`, `confidence`).

use serde::{Deserialize, Serialize};
use std::fmt;

// ========================================
// Classification Record Types
// ========================================

/// Coarse rock classification
///
/// Serialized as its display name (`"Igneous"`). Deserialization is lenient:
/// any string mentioning one of the three rock families maps onto it, and
/// everything else becomes `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum RockCategory {
    Igneous,
    Sedimentary,
    Metamorphic,
    #[default]
    Unknown,
}

impl RockCategory {
    /// Map free text onto a category, case-insensitively
    ///
    /// # Examples
    ///
    /// ```
    /// use rockid_common::RockCategory;
    ///
    /// assert_eq!(RockCategory::from_label("igneous"), RockCategory::Igneous);
    /// assert_eq!(RockCategory::from_label("Metamorphic rock"), RockCategory::Metamorphic);
    /// assert_eq!(RockCategory::from_label("mineral"), RockCategory::Unknown);
    /// ```
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_lowercase();
        if normalized.contains("igneous") {
            RockCategory::Igneous
        } else if normalized.contains("sediment") {
            RockCategory::Sedimentary
        } else if normalized.contains("metamorph") {
            RockCategory::Metamorphic
        } else {
            RockCategory::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RockCategory::Igneous => "Igneous",
            RockCategory::Sedimentary => "Sedimentary",
            RockCategory::Metamorphic => "Metamorphic",
            RockCategory::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, RockCategory::Unknown)
    }
}

impl From<String> for RockCategory {
    fn from(value: String) -> Self {
        RockCategory::from_label(&value)
    }
}

impl From<RockCategory> for &'static str {
    fn from(value: RockCategory) -> Self {
        value.as_str()
    }
}

impl fmt::Display for RockCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciled classification returned to the caller
///
/// Produced exactly once per request, either by consensus over the
/// providers that answered or by the zero-confidence fallback. Every field
/// is always present; callers detect total failure through `confidence == 0`
/// and an empty `provenance`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalRecord {
    /// Primary identification (rock name)
    #[serde(rename = "name")]
    pub label: String,

    /// Rock family
    #[serde(rename = "type")]
    pub category: RockCategory,

    /// Composition tags, first-seen order
    #[serde(rename = "composition")]
    pub attributes: Vec<String>,

    /// Descriptive scalar such as Mohs hardness (free text)
    #[serde(rename = "hardness")]
    pub scalar_property: String,

    /// Formation process description (free text)
    #[serde(rename = "formation")]
    pub explanation: String,

    /// Places the specimen is commonly found
    pub locations: Vec<String>,

    /// Illustrative fact (free text)
    #[serde(rename = "funFact")]
    pub note: String,

    /// Recalibrated confidence, 0-100
    pub confidence: u8,

    /// Source ids of the providers that contributed
    pub provenance: Vec<String>,
}

// ========================================
// Request/Response Bodies
// ========================================

/// POST /api/identify body
///
/// `image` is optional at the type level so a missing field surfaces as an
/// input error with a renderable body rather than a bare extractor rejection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClassifyRequest {
    /// Base64 data URI (`data:image/jpeg;base64,...`) or bare base64
    pub image: Option<String>,
    /// Optional free-text hint forwarded to every provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// POST /api/chat body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub context: Option<ChatContext>,
}

/// Prior-result context attached to a follow-up chat message
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    pub results: Option<CanonicalRecord>,
    pub image_base64: Option<String>,
}

/// POST /api/chat response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Error body carrying a best-effort payload next to the message
///
/// The payload is flattened so the caller can render it exactly like a
/// successful response.
///
/// # Examples
///
/// ```
/// use rockid_common::api::types::{ChatResponse, ErrorResponse};
///
/// let body = ErrorResponse::new(
///     "message is required",
///     ChatResponse { response: "Please ask a question.".to_string() },
/// );
/// let json = serde_json::to_value(&body).unwrap();
/// assert_eq!(json["error"], "message is required");
/// assert_eq!(json["response"], "Please ask a question.");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse<T> {
    pub error: String,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> ErrorResponse<T> {
    pub fn new(error: impl Into<String>, payload: T) -> Self {
        Self {
            error: error.into(),
            payload,
        }
    }
}
