//! Test Helper Utilities
//!
//! Scripted provider adapters and app-state builders shared by the
//! integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::response::Response;
use http_body_util::BodyExt;
use rockid_ai::chat::ChatPassThrough;
use rockid_ai::dispatcher::Dispatcher;
use rockid_ai::fusion::Aggregator;
use rockid_ai::parser::ParsePolicy;
use rockid_ai::pipeline::ClassificationPipeline;
use rockid_ai::providers::ProviderAdapter;
use rockid_ai::types::{Prompt, ProviderError};
use rockid_ai::AppState;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 1x1 transparent PNG
pub const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// What a scripted adapter does when called
#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    Status(u16),
    /// Sleep longer than any test timeout
    Hang,
}

/// Adapter that follows a fixed script
pub struct ScriptedAdapter {
    id: String,
    script: Script,
    pub calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(id: &str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn replying(id: &str, reply: impl Into<String>) -> Arc<Self> {
        Self::new(id, Script::Reply(reply.into()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn source_id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, _prompt: &Prompt<'_>) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Status(status) => Err(ProviderError::Status {
                status: *status,
                body: "scripted failure".to_string(),
            }),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Cancelled)
            }
        }
    }
}

/// Provider reply text wrapping a JSON record in prose
pub fn reply_text(name: &str, category: &str, composition: &[&str], confidence: u8) -> String {
    let record = json!({
        "name": name,
        "type": category,
        "composition": composition,
        "hardness": format!("{} hardness", name),
        "formation": format!("{} formation", name),
        "locations": [format!("{} country", name)],
        "funFact": format!("{} fact", name),
        "confidence": confidence,
    });
    format!("Here is my analysis:\n```json\n{}\n```\nHope this helps!", record)
}

/// App state over the given adapters; the first one also serves chat
pub fn test_state(adapters: Vec<Arc<dyn ProviderAdapter>>, timeout: Duration) -> AppState {
    let chat = adapters
        .first()
        .cloned()
        .map(|adapter| ChatPassThrough::new(adapter, timeout));
    let dispatcher = Dispatcher::new(adapters, timeout, ParsePolicy::default());
    let pipeline = ClassificationPipeline::new(dispatcher, Aggregator::default());
    AppState::new(pipeline, chat)
}

/// Collect a response body as JSON
pub async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}
