//! Fan-out Dispatcher
//!
//! Runs every adapter concurrently against the same request and waits for
//! all of them to settle.
//!
//! # Settlement Guarantees
//! - Exactly one settlement per adapter, `settlements[i]` from `adapters[i]`
//! - A failing or slow adapter never cancels its siblings
//! - Each adapter is bounded by the dispatch timeout, settling as
//!   `Rejected(Timeout)` when it runs over
//! - Firing the cancellation token settles every in-flight adapter as
//!   `Rejected(Cancelled)`
//! - No retries

use crate::parser::ParsePolicy;
use crate::providers::ProviderAdapter;
use crate::types::{ClassificationRequest, ProviderError, Settlement};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default per-adapter budget
pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(30);

/// Parallel adapter executor
///
/// # Example
/// ```rust,ignore
/// let dispatcher = Dispatcher::new(adapters, Duration::from_secs(30), ParsePolicy::default());
/// let settlements = dispatcher.dispatch(&request, &CancellationToken::new()).await;
/// assert_eq!(settlements.len(), dispatcher.count());
/// ```
pub struct Dispatcher {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    timeout: Duration,
    policy: ParsePolicy,
}

impl Dispatcher {
    pub fn new(
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        timeout: Duration,
        policy: ParsePolicy,
    ) -> Self {
        Self {
            adapters,
            timeout,
            policy,
        }
    }

    /// Invoke all adapters concurrently and collect one settlement each
    pub async fn dispatch(
        &self,
        request: &ClassificationRequest,
        cancel: &CancellationToken,
    ) -> Vec<Settlement> {
        debug!(
            adapters = self.adapters.len(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Dispatching to providers"
        );

        let futures = self
            .adapters
            .iter()
            .map(|adapter| self.settle(adapter.as_ref(), request, cancel));

        join_all(futures).await
    }

    async fn settle(
        &self,
        adapter: &dyn ProviderAdapter,
        request: &ClassificationRequest,
        cancel: &CancellationToken,
    ) -> Settlement {
        let source_id = adapter.source_id();

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                warn!(provider = source_id, "Provider call cancelled");
                Settlement::rejected(source_id, &ProviderError::Cancelled)
            }
            result = tokio::time::timeout(self.timeout, adapter.invoke(request, &self.policy)) => {
                match result {
                    Ok(settlement) => settlement,
                    Err(_) => {
                        warn!(
                            provider = source_id,
                            timeout_ms = self.timeout.as_millis() as u64,
                            "Provider call timed out"
                        );
                        Settlement::rejected(source_id, &ProviderError::Timeout(self.timeout))
                    }
                }
            }
        }
    }

    /// Number of adapters, fixed at construction
    pub fn count(&self) -> usize {
        self.adapters.len()
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.adapters
            .iter()
            .map(|a| a.source_id().to_string())
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
