//! Shared API types
//!
//! Request/response bodies exchanged between the classification service and
//! its callers. The presentation layer only ever sees these shapes.

pub mod types;

pub use types::{
    CanonicalRecord, ChatContext, ChatRequest, ChatResponse, ClassifyRequest, ErrorResponse,
    RockCategory,
};
