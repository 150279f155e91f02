//! Service assembly from configuration
//!
//! Resolves each provider's credentials once and builds the adapters, the
//! classification pipeline, and the chat pass-through. Adapters receive
//! their keys here and never read the environment themselves.

use crate::chat::ChatPassThrough;
use crate::dispatcher::Dispatcher;
use crate::fusion::{AggregationPolicy, Aggregator};
use crate::parser::ParsePolicy;
use crate::pipeline::ClassificationPipeline;
use crate::providers::{HttpProvider, ProviderAdapter, ProviderSettings};
use rockid_common::config::{resolve_api_key, ProviderConfig, TomlConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Everything the HTTP layer needs, built once at startup
pub struct ServiceComponents {
    pub pipeline: ClassificationPipeline,
    pub chat: Option<ChatPassThrough>,
}

/// Per-adapter timeout from `[dispatch]`
pub fn dispatch_timeout(config: &TomlConfig) -> Duration {
    Duration::from_secs(config.dispatch.timeout_secs)
}

/// Adapter settings for one provider with an already-resolved key
pub fn provider_settings(
    provider: &ProviderConfig,
    api_key: String,
    timeout: Duration,
) -> ProviderSettings {
    ProviderSettings {
        id: provider.id.clone(),
        kind: provider.kind,
        model: provider.model.clone(),
        base_url: provider.base_url().to_string(),
        api_key,
        max_tokens: provider.max_tokens,
        requests_per_minute: provider.requests_per_minute,
        timeout,
    }
}

/// Build adapters for every enabled provider with a usable key
///
/// Providers without a key, or whose adapter cannot be built, are skipped
/// with a warning. Order follows `[[providers]]`.
pub fn build_adapters(config: &TomlConfig) -> Vec<Arc<dyn ProviderAdapter>> {
    let timeout = dispatch_timeout(config);
    let mut adapters: Vec<Arc<dyn ProviderAdapter>> = Vec::new();

    for provider in config.providers.iter().filter(|p| p.enabled) {
        let Some(api_key) = resolve_api_key(provider) else {
            warn!(
                provider = %provider.id,
                "No API key found (set {} or api_key in config), provider skipped",
                provider.api_key_env()
            );
            continue;
        };

        match HttpProvider::new(provider_settings(provider, api_key, timeout)) {
            Ok(adapter) => {
                info!(
                    provider = %provider.id,
                    kind = ?provider.kind,
                    model = %provider.model,
                    "Provider enabled"
                );
                adapters.push(Arc::new(adapter));
            }
            Err(e) => {
                warn!(provider = %provider.id, error = %e, "Provider skipped");
            }
        }
    }

    adapters
}

/// Assemble the pipeline and chat from configured adapters
///
/// The chat adapter is `chat_provider` when set, else the first adapter.
pub fn build_components(
    config: &TomlConfig,
    adapters: Vec<Arc<dyn ProviderAdapter>>,
) -> ServiceComponents {
    let timeout = dispatch_timeout(config);

    let chat_adapter = match &config.chat_provider {
        Some(id) => {
            let found = adapters.iter().find(|a| a.source_id() == id).cloned();
            if found.is_none() {
                warn!(provider = %id, "Chat provider has no usable adapter, chat disabled");
            }
            found
        }
        None => adapters.first().cloned(),
    };
    let chat = chat_adapter.map(|adapter| ChatPassThrough::new(adapter, timeout));

    let policy = ParsePolicy {
        placeholder_confidence: config.aggregation.placeholder_confidence,
    };
    let dispatcher = Dispatcher::new(adapters, timeout, policy);
    let aggregator = Aggregator::new(AggregationPolicy::from(&config.aggregation));

    ServiceComponents {
        pipeline: ClassificationPipeline::new(dispatcher, aggregator),
        chat,
    }
}
