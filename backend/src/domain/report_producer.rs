//! Publishes report requests onto the durable queue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::ports::{ReportQueue, ReportQueueError};
use super::report_codec::encode_request;
use super::{CurrencyCode, ReportRequest, TraceId, UserId};

/// Report request producer.
///
/// Requests are keyed by user so the queue keeps one user's requests in
/// order. The caller's propagation token (or a fresh one) travels in the
/// body.
#[derive(Clone)]
pub struct ReportProducer {
    queue: Arc<dyn ReportQueue>,
}

impl ReportProducer {
    /// Build a producer publishing to `queue`.
    pub fn new(queue: Arc<dyn ReportQueue>) -> Self {
        Self { queue }
    }

    /// Publish a request and wait for the queue acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns the queue error when the request is not acknowledged, or
    /// [`ReportQueueError::Encode`] when the body cannot be serialised.
    pub async fn send(
        &self,
        user: UserId,
        from: DateTime<Utc>,
        currency: &CurrencyCode,
    ) -> Result<(), ReportQueueError> {
        let trace_id = TraceId::current_or_generate();
        let request = ReportRequest {
            user,
            from,
            currency: currency.clone(),
            trace_id: Some(trace_id),
        };
        let message = encode_request(&request)
            .map_err(|error| ReportQueueError::encode(error.to_string()))?;

        if let Err(error) = self.queue.publish(message).await {
            warn!(%user, %trace_id, %error, "failed to publish report request");
            return Err(error);
        }
        debug!(%user, %trace_id, %currency, "report request published");
        Ok(())
    }
}
