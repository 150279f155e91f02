//! Consensus Aggregator
//!
//! Merges the fulfilled partial records of one request into a single
//! canonical record.
//!
//! # Merge Strategy
//! 1. **Anchor:** stable sort by confidence descending; the top record
//!    supplies hardness, formation, locations and fun fact verbatim
//! 2. **Consensus:** category and label go to the case-insensitive value
//!    seen more than once, else to the anchor's value
//! 3. **Attributes:** union in fulfilled order, first occurrence kept, capped
//! 4. **Confidence:** rounded mean plus a fixed boost, capped at the ceiling
//! 5. **Provenance:** source ids in fulfilled order
//!
//! Every fulfilled record votes, placeholders included. With
//! `ignore_unknown_votes` set, `Unknown` categories and placeholder labels
//! are left out of the tally.

use super::fallback::fallback_record;
use crate::types::{PartialRecord, Settlement};
use rockid_common::config::AggregationConfig;
use rockid_common::CanonicalRecord;
use tracing::{debug, warn};

/// Default boost added to the mean confidence
pub const DEFAULT_CONFIDENCE_BOOST: u8 = 5;

/// Default upper bound on recalibrated confidence
pub const DEFAULT_CONFIDENCE_CEILING: u8 = 95;

/// Default cap on merged attributes
pub const DEFAULT_MAX_ATTRIBUTES: usize = 8;

/// Tunables for recalibration and attribute merging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationPolicy {
    pub confidence_boost: u8,
    /// Never reaches 100
    pub confidence_ceiling: u8,
    pub max_attributes: usize,
    /// Keep `Unknown` categories and placeholder labels out of the vote
    pub ignore_unknown_votes: bool,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            confidence_boost: DEFAULT_CONFIDENCE_BOOST,
            confidence_ceiling: DEFAULT_CONFIDENCE_CEILING,
            max_attributes: DEFAULT_MAX_ATTRIBUTES,
            ignore_unknown_votes: false,
        }
    }
}

impl From<&AggregationConfig> for AggregationPolicy {
    fn from(config: &AggregationConfig) -> Self {
        Self {
            confidence_boost: config.confidence_boost,
            confidence_ceiling: config.confidence_ceiling.min(99),
            max_attributes: config.max_attributes,
            ignore_unknown_votes: config.ignore_unknown_votes,
        }
    }
}

/// Consensus aggregator
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    policy: AggregationPolicy,
}

impl Aggregator {
    pub fn new(policy: AggregationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AggregationPolicy {
        &self.policy
    }

    /// Reduce one request's settlements to a canonical record
    ///
    /// Rejected settlements are excluded. With no fulfilled settlement the
    /// fallback record is returned.
    pub fn aggregate(&self, settlements: &[Settlement]) -> CanonicalRecord {
        let fulfilled: Vec<&PartialRecord> = settlements
            .iter()
            .filter_map(Settlement::as_fulfilled)
            .collect();

        if fulfilled.is_empty() {
            warn!(
                dispatched = settlements.len(),
                "No provider fulfilled, returning fallback record"
            );
            return fallback_record();
        }

        self.merge(&fulfilled)
    }

    /// Merge fulfilled records, given in fulfilled order
    pub fn merge(&self, records: &[&PartialRecord]) -> CanonicalRecord {
        let mut ranked: Vec<&PartialRecord> = records.to_vec();
        // sort_by is stable: equal confidences keep fulfilled order
        ranked.sort_by(|a, b| b.confidence.cmp(&a.confidence));

        let Some(anchor) = ranked.first().copied() else {
            return fallback_record();
        };

        let skip_unknown = self.policy.ignore_unknown_votes;

        let category = plurality(
            ranked
                .iter()
                .filter(|r| !skip_unknown || r.category.is_known())
                .map(|r| (r.category.as_str().to_lowercase(), r.category)),
        )
        .unwrap_or(anchor.category);

        let label = plurality(
            ranked
                .iter()
                .filter(|r| !skip_unknown || !r.has_placeholder_label())
                .map(|r| (r.label.trim().to_lowercase(), r.label.trim())),
        )
        .map(str::to_string)
        .unwrap_or_else(|| anchor.label.clone());

        if category != anchor.category || !label.eq_ignore_ascii_case(anchor.label.trim()) {
            debug!(
                anchor = %anchor.source_id,
                anchor_label = %anchor.label,
                anchor_category = %anchor.category,
                consensus_label = %label,
                consensus_category = %category,
                "Consensus overrode anchor"
            );
        }

        CanonicalRecord {
            label,
            category,
            attributes: self.merge_attributes(records),
            scalar_property: anchor.scalar_property.clone(),
            explanation: anchor.explanation.clone(),
            locations: anchor.locations.clone(),
            note: anchor.note.clone(),
            confidence: self.recalibrate(records),
            provenance: records.iter().map(|r| r.source_id.clone()).collect(),
        }
    }

    fn merge_attributes(&self, records: &[&PartialRecord]) -> Vec<String> {
        let mut merged: Vec<String> = Vec::new();
        for attribute in records.iter().flat_map(|r| r.attributes.iter()) {
            if merged.len() >= self.policy.max_attributes {
                break;
            }
            if !merged.contains(attribute) {
                merged.push(attribute.clone());
            }
        }
        merged
    }

    /// `min(round(mean) + boost, ceiling)`, rounding half up
    fn recalibrate(&self, records: &[&PartialRecord]) -> u8 {
        if records.is_empty() {
            return 0;
        }
        let k = records.len() as u32;
        let sum: u32 = records.iter().map(|r| u32::from(r.confidence)).sum();
        let mean = (2 * sum + k) / (2 * k);
        let boosted = mean + u32::from(self.policy.confidence_boost);
        boosted.min(u32::from(self.policy.confidence_ceiling)) as u8
    }
}

/// Value whose key occurs most often, if that count exceeds one
///
/// Ties go to the key seen first in iteration order.
fn plurality<T: Copy>(votes: impl IntoIterator<Item = (String, T)>) -> Option<T> {
    let mut tally: Vec<(String, T, usize)> = Vec::new();
    for (key, value) in votes {
        match tally.iter_mut().find(|(k, _, _)| *k == key) {
            Some(entry) => entry.2 += 1,
            None => tally.push((key, value, 1)),
        }
    }

    let mut winner: Option<(T, usize)> = None;
    for (_, value, count) in tally {
        if count > 1 && winner.map_or(true, |(_, best)| count > best) {
            winner = Some((value, count));
        }
    }
    winner.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use rockid_common::RockCategory;

    fn record(source: &str, category: RockCategory, confidence: u8) -> PartialRecord {
        PartialRecord {
            label: format!("{} specimen", category),
            category,
            attributes: Vec::new(),
            scalar_property: format!("hardness from {source}"),
            explanation: format!("formation from {source}"),
            locations: vec![format!("location from {source}")],
            note: format!("note from {source}"),
            confidence,
            source_id: source.to_string(),
        }
    }

    fn rejected(source: &str) -> Settlement {
        Settlement::Rejected {
            source_id: source.to_string(),
            kind: ErrorKind::Timeout,
            message: "timeout".to_string(),
        }
    }

    #[test]
    fn test_plurality_requires_repeat() {
        let votes = vec![("a".to_string(), 1), ("b".to_string(), 2)];
        assert_eq!(plurality(votes), None);
    }

    #[test]
    fn test_plurality_tie_goes_to_first_seen() {
        let votes = vec![
            ("b".to_string(), 2),
            ("a".to_string(), 1),
            ("a".to_string(), 1),
            ("b".to_string(), 2),
        ];
        assert_eq!(plurality(votes), Some(2));
    }

    #[test]
    fn test_consensus_beats_anchor() {
        let records = [
            record("openai", RockCategory::Igneous, 60),
            record("gemini", RockCategory::Sedimentary, 90),
            record("anthropic", RockCategory::Igneous, 50),
        ];
        let refs: Vec<&PartialRecord> = records.iter().collect();
        let merged = Aggregator::default().merge(&refs);

        assert_eq!(merged.category, RockCategory::Igneous);
        assert_eq!(merged.scalar_property, "hardness from gemini");
        assert_eq!(merged.explanation, "formation from gemini");
        assert_eq!(merged.locations, vec!["location from gemini"]);
        assert_eq!(merged.note, "note from gemini");
    }

    #[test]
    fn test_all_distinct_falls_back_to_anchor() {
        let mut a = record("a", RockCategory::Igneous, 40);
        a.label = "Granite".to_string();
        let mut b = record("b", RockCategory::Metamorphic, 70);
        b.label = "Gneiss".to_string();
        let mut c = record("c", RockCategory::Sedimentary, 55);
        c.label = "Sandstone".to_string();

        let merged = Aggregator::default().merge(&[&a, &b, &c]);
        assert_eq!(merged.label, "Gneiss");
        assert_eq!(merged.category, RockCategory::Metamorphic);
    }

    #[test]
    fn test_label_consensus_is_case_insensitive() {
        let mut a = record("a", RockCategory::Igneous, 90);
        a.label = "Obsidian".to_string();
        let mut b = record("b", RockCategory::Igneous, 60);
        b.label = "basalt".to_string();
        let mut c = record("c", RockCategory::Igneous, 50);
        c.label = "Basalt ".to_string();

        let merged = Aggregator::default().merge(&[&a, &b, &c]);
        assert_eq!(merged.label, "basalt");
    }

    #[test]
    fn test_placeholders_vote_by_default() {
        let mut granite = record("a", RockCategory::Igneous, 90);
        granite.label = "Granite".to_string();
        let p1 = PartialRecord::placeholder("b", 30);
        let p2 = PartialRecord::placeholder("c", 30);

        let merged = Aggregator::default().merge(&[&granite, &p1, &p2]);
        assert_eq!(merged.category, RockCategory::Unknown);
        assert_eq!(merged.label, p1.label);
        // Anchor fields still come from the confident record
        assert_eq!(merged.scalar_property, "hardness from a");
        assert_eq!(merged.provenance, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ignore_unknown_votes_keeps_real_answer() {
        let mut granite = record("a", RockCategory::Igneous, 90);
        granite.label = "Granite".to_string();
        let p1 = PartialRecord::placeholder("b", 30);
        let p2 = PartialRecord::placeholder("c", 30);
        let aggregator = Aggregator::new(AggregationPolicy {
            ignore_unknown_votes: true,
            ..AggregationPolicy::default()
        });

        let merged = aggregator.merge(&[&granite, &p1, &p2]);
        assert_eq!(merged.category, RockCategory::Igneous);
        assert_eq!(merged.label, "Granite");

        let known = record("d", RockCategory::Metamorphic, 20);
        let other = record("e", RockCategory::Metamorphic, 10);
        let merged = aggregator.merge(&[&granite, &p1, &p2, &known, &other]);
        assert_eq!(merged.category, RockCategory::Metamorphic);
        assert_eq!(merged.label, "Metamorphic specimen");
    }

    #[test]
    fn test_attribute_union_first_seen() {
        let mut a = record("a", RockCategory::Igneous, 50);
        a.attributes = vec!["Quartz".to_string(), "Mica".to_string()];
        let mut b = record("b", RockCategory::Igneous, 90);
        b.attributes = vec!["Mica".to_string(), "Feldspar".to_string()];
        let mut c = record("c", RockCategory::Igneous, 70);
        c.attributes = vec!["Quartz".to_string()];

        let merged = Aggregator::default().merge(&[&a, &b, &c]);
        assert_eq!(merged.attributes, vec!["Quartz", "Mica", "Feldspar"]);
    }

    #[test]
    fn test_attribute_dedup_is_case_sensitive_and_capped() {
        let mut a = record("a", RockCategory::Igneous, 50);
        a.attributes = vec!["quartz".to_string(), "Quartz".to_string()];
        let merged = Aggregator::default().merge(&[&a]);
        assert_eq!(merged.attributes, vec!["quartz", "Quartz"]);

        let mut many = record("m", RockCategory::Igneous, 50);
        many.attributes = (0..20).map(|i| format!("mineral {i}")).collect();
        let aggregator = Aggregator::new(AggregationPolicy {
            max_attributes: 3,
            ..AggregationPolicy::default()
        });
        let merged = aggregator.merge(&[&many]);
        assert_eq!(merged.attributes, vec!["mineral 0", "mineral 1", "mineral 2"]);
    }

    #[test]
    fn test_confidence_recalibration() {
        let a = record("a", RockCategory::Igneous, 60);
        let b = record("b", RockCategory::Igneous, 71);
        // mean 65.5 rounds to 66, plus 5
        assert_eq!(Aggregator::default().merge(&[&a, &b]).confidence, 71);

        let high = record("h", RockCategory::Igneous, 100);
        assert_eq!(Aggregator::default().merge(&[&high]).confidence, 95);

        let zero = record("z", RockCategory::Igneous, 0);
        assert_eq!(Aggregator::default().merge(&[&zero]).confidence, 5);
    }

    #[test]
    fn test_confidence_never_exceeds_ceiling() {
        for boost in [0u8, 5, 50, 255] {
            for confidence in [0u8, 1, 50, 94, 95, 99, 100] {
                let aggregator = Aggregator::new(AggregationPolicy {
                    confidence_boost: boost,
                    ..AggregationPolicy::default()
                });
                let r = record("a", RockCategory::Igneous, confidence);
                let merged = aggregator.merge(&[&r, &r]);
                assert!(merged.confidence <= DEFAULT_CONFIDENCE_CEILING);
            }
        }
    }

    #[test]
    fn test_aggregate_structurally_complete_for_any_k() {
        let pool = [
            record("openai", RockCategory::Igneous, 80),
            record("gemini", RockCategory::Igneous, 70),
            record("anthropic", RockCategory::Sedimentary, 60),
        ];
        for k in 0..=3 {
            let mut settlements: Vec<Settlement> =
                pool[..k].iter().cloned().map(Settlement::Fulfilled).collect();
            for r in &pool[k..] {
                settlements.push(rejected(&r.source_id));
            }
            let merged = Aggregator::default().aggregate(&settlements);
            assert!(!merged.label.is_empty());
            assert!(!merged.scalar_property.is_empty());
            assert!(!merged.explanation.is_empty());
            assert!(!merged.note.is_empty());
            assert_eq!(merged.provenance.len(), k);
            if k == 0 {
                assert_eq!(merged.confidence, 0);
            } else {
                assert!(merged.confidence > 0);
            }
        }
    }

    #[test]
    fn test_partial_failure_scenario() {
        let mut a = record("openai", RockCategory::Sedimentary, 70);
        a.attributes = vec!["A".to_string()];
        let mut b = record("anthropic", RockCategory::Sedimentary, 81);
        b.attributes = vec!["A".to_string(), "B".to_string()];

        let settlements = vec![
            Settlement::Fulfilled(a),
            rejected("gemini"),
            Settlement::Fulfilled(b),
        ];
        let merged = Aggregator::default().aggregate(&settlements);

        assert_eq!(merged.category, RockCategory::Sedimentary);
        assert_eq!(merged.attributes, vec!["A", "B"]);
        assert_eq!(merged.provenance, vec!["openai", "anthropic"]);
        // round(75.5) = 76, plus 5
        assert_eq!(merged.confidence, 81);
    }

    #[test]
    fn test_deterministic_for_fixed_input() {
        let records = [
            record("a", RockCategory::Igneous, 60),
            record("b", RockCategory::Metamorphic, 60),
            record("c", RockCategory::Sedimentary, 60),
        ];
        let refs: Vec<&PartialRecord> = records.iter().collect();
        let first = Aggregator::default().merge(&refs);
        for _ in 0..10 {
            assert_eq!(Aggregator::default().merge(&refs), first);
        }
        // Equal confidences keep fulfilled order, so "a" anchors
        assert_eq!(first.category, RockCategory::Igneous);
        assert_eq!(first.scalar_property, "hardness from a");
    }

    #[test]
    fn test_policy_from_config() {
        let config = AggregationConfig {
            confidence_boost: 3,
            confidence_ceiling: 100,
            max_attributes: 4,
            placeholder_confidence: 30,
            ignore_unknown_votes: true,
        };
        let policy = AggregationPolicy::from(&config);
        assert_eq!(policy.confidence_boost, 3);
        assert_eq!(policy.confidence_ceiling, 99);
        assert_eq!(policy.max_attributes, 4);
        assert!(policy.ignore_unknown_votes);
    }
}
