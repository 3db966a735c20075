//! Port correlating in-flight report requests with their replies.

use tokio::sync::oneshot;

use crate::domain::{ReportResult, UserId};

/// Identifies one subscription so stale cleanups cannot remove newer slots.
pub type SubscriptionTicket = u64;

/// Single-use reply slot handed to the waiting caller.
#[derive(Debug)]
pub struct ReportSubscription {
    /// Ticket to present when unsubscribing.
    pub ticket: SubscriptionTicket,
    /// Receives exactly one result, or closes when the slot is superseded.
    pub receiver: oneshot::Receiver<ReportResult>,
}

/// Correlation table keyed by user.
///
/// At most one slot is live per user. Subscribing again for the same user
/// replaces the previous slot and closes its channel.
#[cfg_attr(test, mockall::automock)]
pub trait ReportSubscriptions: Send + Sync {
    /// Create the reply slot for `user`.
    fn subscribe(&self, user: UserId) -> ReportSubscription;

    /// Remove the slot for `user` if it still belongs to `ticket`.
    fn unsubscribe(&self, user: UserId, ticket: SubscriptionTicket);
}
