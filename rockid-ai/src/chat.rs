//! Follow-up chat pass-through
//!
//! Sends one question to a single provider. No aggregation.

use crate::prompts;
use crate::providers::ProviderAdapter;
use crate::types::{ImagePayload, ProviderError};
use rockid_common::CanonicalRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Reply shown to the caller when the chat provider fails
pub const CHAT_APOLOGY: &str =
    "Sorry, I couldn't answer that right now. Please try again in a moment.";

pub struct ChatPassThrough {
    adapter: Arc<dyn ProviderAdapter>,
    timeout: Duration,
}

impl ChatPassThrough {
    pub fn new(adapter: Arc<dyn ProviderAdapter>, timeout: Duration) -> Self {
        Self { adapter, timeout }
    }

    pub fn source_id(&self) -> &str {
        self.adapter.source_id()
    }

    /// Answer a question, optionally grounded on earlier results and image
    ///
    /// # Errors
    /// Returns the provider's error, `ProviderError::Timeout` when the budget
    /// runs out, or `ProviderError::Cancelled` on shutdown.
    pub async fn respond(
        &self,
        message: &str,
        results: Option<&CanonicalRecord>,
        image: Option<&ImagePayload>,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        let prompt = prompts::chat_prompt(message, results, image);
        debug!(
            provider = self.source_id(),
            with_results = results.is_some(),
            with_image = image.is_some(),
            "Sending chat message"
        );

        let reply = tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.adapter.complete(&prompt)) => {
                result.unwrap_or(Err(ProviderError::Timeout(self.timeout)))
            }
        };

        match reply {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => {
                warn!(provider = self.source_id(), kind = %e.kind(), error = %e, "Chat provider failed");
                Err(e)
            }
        }
    }
}
