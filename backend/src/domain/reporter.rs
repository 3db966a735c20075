//! Request/reply bridge presenting the report pipeline as one bounded call.
//!
//! A call moves through `subscribed -> sent -> {fulfilled | timed out | send
//! failed}`. The reply slot is released on every terminal transition by a
//! drop guard, including when the calling future is cancelled.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use super::ports::{ReportSubscriptions, SubscriptionTicket};
use super::report_producer::ReportProducer;
use super::{CategoryTotals, CurrencyCode, ReportError, UserId};

/// Default bound on one report round trip.
pub const DEFAULT_REPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// Synchronous-looking facade over the report pipeline.
#[derive(Clone)]
pub struct Reporter {
    producer: ReportProducer,
    subscriptions: Arc<dyn ReportSubscriptions>,
    timeout: Duration,
}

impl Reporter {
    /// Build a bridge waiting at most `timeout` for each reply.
    pub fn new(
        producer: ReportProducer,
        subscriptions: Arc<dyn ReportSubscriptions>,
        timeout: Duration,
    ) -> Self {
        Self {
            producer,
            subscriptions,
            timeout,
        }
    }

    /// Request a report and wait for the computed totals.
    ///
    /// # Errors
    ///
    /// - [`ReportError::Dispatch`] when the request cannot be published.
    /// - [`ReportError::Timeout`] when publishing and waiting together exceed
    ///   the configured timeout.
    /// - [`ReportError::Superseded`] when a newer request for the same user
    ///   takes over the reply slot.
    /// - [`ReportError::NotReady`], [`ReportError::CannotExchange`] or
    ///   [`ReportError::Failed`] when the worker reports a failure.
    pub async fn get_report(
        &self,
        user: UserId,
        from: DateTime<Utc>,
        currency: &CurrencyCode,
    ) -> Result<CategoryTotals, ReportError> {
        let subscription = self.subscriptions.subscribe(user);
        let _slot = SlotGuard {
            subscriptions: self.subscriptions.as_ref(),
            user,
            ticket: subscription.ticket,
        };

        let deadline = Instant::now() + self.timeout;
        if let Ok(sent) = timeout_at(deadline, self.producer.send(user, from, currency)).await {
            sent?;
        } else {
            warn!(%user, timeout = ?self.timeout, "report request publish timed out");
            return Err(ReportError::Timeout);
        }

        let reply = match timeout_at(deadline, subscription.receiver).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_closed)) => {
                info!(%user, "report wait superseded by a newer request");
                return Err(ReportError::Superseded);
            }
            Err(_elapsed) => {
                warn!(%user, timeout = ?self.timeout, "report request timed out");
                return Err(ReportError::Timeout);
            }
        };

        if reply.success {
            debug!(%user, categories = reply.data.len(), "report received");
            Ok(reply.data)
        } else {
            Err(ReportError::from_remote(&reply.error))
        }
    }
}

struct SlotGuard<'a> {
    subscriptions: &'a dyn ReportSubscriptions,
    user: UserId,
    ticket: SubscriptionTicket,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.subscriptions.unsubscribe(self.user, self.ticket);
    }
}
