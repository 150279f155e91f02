//! # rockid Common Library
//!
//! Shared code for the rockid services including:
//! - API request/response types (canonical classification record)
//! - Configuration loading and provider credential resolution
//! - Common error type

pub mod api;
pub mod config;
pub mod error;

pub use api::types::{CanonicalRecord, RockCategory};
pub use error::{Error, Result};
