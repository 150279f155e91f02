//! Classification pipeline
//!
//! Dispatch, then aggregate (or fall back). One call per identify request.

use crate::dispatcher::Dispatcher;
use crate::fusion::Aggregator;
use crate::types::{ClassificationRequest, ErrorKind, Settlement};
use rockid_common::CanonicalRecord;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Per-provider outcome of one classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementSummary {
    pub source_id: String,
    pub fulfilled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl From<&Settlement> for SettlementSummary {
    fn from(settlement: &Settlement) -> Self {
        Self {
            source_id: settlement.source_id().to_string(),
            fulfilled: settlement.is_fulfilled(),
            error_kind: settlement.error_kind(),
        }
    }
}

/// Result of one classification
#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    pub request_id: Uuid,
    pub record: CanonicalRecord,
    pub settlements: Vec<SettlementSummary>,
}

impl ClassificationOutcome {
    pub fn fulfilled_count(&self) -> usize {
        self.settlements.iter().filter(|s| s.fulfilled).count()
    }

    /// True when no provider fulfilled and the fallback record was returned
    pub fn is_total_failure(&self) -> bool {
        self.fulfilled_count() == 0
    }
}

/// Dispatcher plus aggregator
pub struct ClassificationPipeline {
    dispatcher: Dispatcher,
    aggregator: Aggregator,
}

impl ClassificationPipeline {
    pub fn new(dispatcher: Dispatcher, aggregator: Aggregator) -> Self {
        Self {
            dispatcher,
            aggregator,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Classify one request
    ///
    /// Always returns a structurally complete record; provider failures only
    /// lower its confidence.
    pub async fn classify(
        &self,
        request: &ClassificationRequest,
        cancel: &CancellationToken,
    ) -> ClassificationOutcome {
        let request_id = Uuid::new_v4();
        let span = info_span!("classify", %request_id, providers = self.dispatcher.count());

        async move {
            let settlements = self.dispatcher.dispatch(request, cancel).await;
            let record = self.aggregator.aggregate(&settlements);
            let summaries: Vec<SettlementSummary> =
                settlements.iter().map(SettlementSummary::from).collect();

            let outcome = ClassificationOutcome {
                request_id,
                record,
                settlements: summaries,
            };

            if outcome.is_total_failure() {
                warn!(
                    dispatched = outcome.settlements.len(),
                    "All providers failed, returned fallback record"
                );
            } else {
                info!(
                    fulfilled = outcome.fulfilled_count(),
                    dispatched = outcome.settlements.len(),
                    label = %outcome.record.label,
                    category = %outcome.record.category,
                    confidence = outcome.record.confidence,
                    "Classification complete"
                );
            }

            outcome
        }
        .instrument(span)
        .await
    }
}
