//! rockid-ai library interface
//!
//! Multi-provider rock classification: fans one image out to several AI
//! vision providers, parses their replies, and reconciles them into one
//! canonical record.

pub mod api;
pub mod chat;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fusion;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chat::ChatPassThrough;
use chrono::{DateTime, Utc};
use pipeline::ClassificationPipeline;
use rockid_common::config::DEFAULT_MAX_BODY_BYTES;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ClassificationPipeline>,
    /// `None` when no chat provider has a usable key
    pub chat: Option<Arc<ChatPassThrough>>,
    /// Fired on shutdown; in-flight dispatches settle as cancelled
    pub shutdown: CancellationToken,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last all-providers-failed message, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: ClassificationPipeline, chat: Option<ChatPassThrough>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            chat: chat.map(Arc::new),
            shutdown: CancellationToken::new(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// Build application router
///
/// CORS is permissive so browser front ends on any origin can call the API;
/// preflight requests are answered by the CORS layer before routing.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;

    Router::new()
        .merge(api::identify_routes())
        .merge(api::chat_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
