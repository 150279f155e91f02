//! Fallback record for total provider failure

use rockid_common::{CanonicalRecord, RockCategory};

/// Label reported when no provider fulfilled
pub const FALLBACK_LABEL: &str = "Unknown rock";

/// Text used for every free-text field of the fallback record
pub const UNABLE_TO_DETERMINE: &str = "Unable to determine";

/// Structurally complete record with zero confidence and no provenance
///
/// Callers detect total failure from `confidence == 0`, never from a
/// missing field.
///
/// # Examples
///
/// ```
/// use rockid_ai::fusion::fallback_record;
///
/// let record = fallback_record();
/// assert_eq!(record.confidence, 0);
/// assert!(record.provenance.is_empty());
/// ```
pub fn fallback_record() -> CanonicalRecord {
    CanonicalRecord {
        label: FALLBACK_LABEL.to_string(),
        category: RockCategory::Unknown,
        attributes: vec![UNABLE_TO_DETERMINE.to_string()],
        scalar_property: "Unknown".to_string(),
        explanation: UNABLE_TO_DETERMINE.to_string(),
        locations: vec![UNABLE_TO_DETERMINE.to_string()],
        note: "The image could not be analyzed. Try a clearer, well-lit photo.".to_string(),
        confidence: 0,
        provenance: Vec::new(),
    }
}
