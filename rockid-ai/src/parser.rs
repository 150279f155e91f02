//! Response Parser
//!
//! Providers answer in prose that may embed one JSON object. This module
//! cuts the object out (first `{` to last `}`), decodes it, and coerces each
//! expected field into a `PartialRecord`. Absent or wrongly-typed fields take
//! a default; only "no object" and "malformed JSON" are errors, and the
//! adapter turns those into a low-confidence placeholder record.

use crate::types::PartialRecord;
use rockid_common::RockCategory;
use serde_json::{Map, Value};
use thiserror::Error;

/// Label used when a provider gave no usable name
pub const PLACEHOLDER_LABEL: &str = "Unidentified rock";

/// Default for free-text fields the provider left out
pub const NOT_PROVIDED: &str = "Not provided";

/// Confidence assumed when a parsed reply omits it
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// Confidence given to an unparseable reply unless configured otherwise
pub const DEFAULT_PLACEHOLDER_CONFIDENCE: u8 = 30;

const LABEL_KEYS: &[&str] = &["name", "label", "rockName"];
const CATEGORY_KEYS: &[&str] = &["type", "category", "rockType"];
const ATTRIBUTE_KEYS: &[&str] = &["composition", "attributes", "minerals"];
const SCALAR_KEYS: &[&str] = &["hardness"];
const EXPLANATION_KEYS: &[&str] = &["formation", "explanation"];
const LOCATION_KEYS: &[&str] = &["locations", "commonLocations"];
const NOTE_KEYS: &[&str] = &["funFact", "fun_fact", "note"];

/// Parser failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no JSON object found in reply")]
    NoObject,

    #[error("malformed JSON object: {0}")]
    Malformed(String),
}

/// How unparseable replies are scored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsePolicy {
    pub placeholder_confidence: u8,
}

impl Default for ParsePolicy {
    fn default() -> Self {
        Self {
            placeholder_confidence: DEFAULT_PLACEHOLDER_CONFIDENCE,
        }
    }
}

impl PartialRecord {
    /// Record standing in for a provider that answered unparseably
    pub fn placeholder(source_id: impl Into<String>, confidence: u8) -> Self {
        Self {
            label: PLACEHOLDER_LABEL.to_string(),
            category: RockCategory::Unknown,
            attributes: Vec::new(),
            scalar_property: "Unknown".to_string(),
            explanation: NOT_PROVIDED.to_string(),
            locations: Vec::new(),
            note: NOT_PROVIDED.to_string(),
            confidence: confidence.min(100),
            source_id: source_id.into(),
        }
    }

    pub fn has_placeholder_label(&self) -> bool {
        self.label.trim().is_empty() || self.label.eq_ignore_ascii_case(PLACEHOLDER_LABEL)
    }
}

/// Slice from the first `{` to the last `}`
///
/// Providers emit at most one object, so the greedy span is enough and
/// keeps nested braces intact.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse a provider reply into a partial record
///
/// # Errors
/// `ParseError::NoObject` if no `{...}` span exists,
/// `ParseError::Malformed` if the span is not a JSON object.
pub fn parse_record(text: &str, source_id: &str) -> Result<PartialRecord, ParseError> {
    let candidate = extract_json_object(text).ok_or(ParseError::NoObject)?;
    let value: Value =
        serde_json::from_str(candidate).map_err(|e| ParseError::Malformed(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(ParseError::Malformed("top-level value is not an object".to_string()));
    };

    Ok(PartialRecord {
        label: string_field(&object, LABEL_KEYS).unwrap_or_else(|| PLACEHOLDER_LABEL.to_string()),
        category: string_field(&object, CATEGORY_KEYS)
            .map(|c| RockCategory::from_label(&c))
            .unwrap_or_default(),
        attributes: list_field(&object, ATTRIBUTE_KEYS),
        scalar_property: string_field(&object, SCALAR_KEYS).unwrap_or_else(|| "Unknown".to_string()),
        explanation: string_field(&object, EXPLANATION_KEYS)
            .unwrap_or_else(|| NOT_PROVIDED.to_string()),
        locations: list_field(&object, LOCATION_KEYS),
        note: string_field(&object, NOTE_KEYS).unwrap_or_else(|| NOT_PROVIDED.to_string()),
        confidence: confidence_field(&object).unwrap_or(DEFAULT_CONFIDENCE),
        source_id: source_id.to_string(),
    })
}

fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find(|v| !v.is_null())
}

/// Scalar coerced to a trimmed, non-empty string
fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn string_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match first_present(object, keys)? {
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(scalar_string)
                .collect::<Vec<_>>()
                .join(", ");
            (!joined.is_empty()).then_some(joined)
        }
        other => scalar_string(other),
    }
}

/// Array of scalars, or one comma-separated string
fn list_field(object: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    match first_present(object, keys) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Confidence as an integer percentage
///
/// Accepts integers, fractions in (0, 1) as ratios, and strings such as
/// `"85%"`. Values are clamped to 0..=100.
fn confidence_field(object: &Map<String, Value>) -> Option<u8> {
    let raw = match object.get("confidence")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    let percent = if raw > 0.0 && raw < 1.0 { raw * 100.0 } else { raw };
    Some(percent.round().clamp(0.0, 100.0) as u8)
}
