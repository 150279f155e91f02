//! Fusion layer
//!
//! Turns the settlement list of one dispatch into the canonical record:
//! consensus merge when at least one provider fulfilled, the fallback record
//! otherwise.

pub mod aggregator;
pub mod fallback;

pub use aggregator::{AggregationPolicy, Aggregator};
pub use fallback::fallback_record;
