//! Correlation table routing computed reports to waiting callers.
//!
//! Each user has at most one live slot: a oneshot sender tagged with a
//! ticket. Delivering a result consumes the slot, so a second delivery for
//! the same request finds nothing and is discarded. Subscribing again for a
//! user drops the previous sender, which wakes the earlier waiter with a
//! closed channel instead of leaving it to time out.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::domain::ports::{ReportSubscription, ReportSubscriptions, SubscriptionTicket};
use crate::domain::{ReportResult, UserId};

/// What happened to a delivered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The waiting caller received the result.
    Delivered,
    /// No caller was waiting; the result was discarded.
    NoSubscriber,
    /// The caller had already stopped waiting; the result was discarded.
    ReceiverGone,
}

struct Slot {
    ticket: SubscriptionTicket,
    sender: oneshot::Sender<ReportResult>,
}

/// In-memory reply router.
#[derive(Default)]
pub struct ReportRouter {
    slots: Mutex<HashMap<UserId, Slot>>,
    next_ticket: AtomicU64,
}

impl ReportRouter {
    /// Build an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `result` to the caller waiting for its user.
    pub fn deliver(&self, result: ReportResult) -> DeliveryOutcome {
        let user = result.user;
        let Some(slot) = self.lock_slots().remove(&user) else {
            warn!(%user, "no subscriber waiting for report; discarding result");
            return DeliveryOutcome::NoSubscriber;
        };
        if slot.sender.send(result).is_err() {
            warn!(%user, ticket = slot.ticket, "report subscriber went away; discarding result");
            return DeliveryOutcome::ReceiverGone;
        }
        debug!(%user, ticket = slot.ticket, "report delivered to subscriber");
        DeliveryOutcome::Delivered
    }

    /// Number of live slots.
    pub fn pending(&self) -> usize {
        self.lock_slots().len()
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, Slot>> {
        // Slot bookkeeping never panics while holding the lock, so a poisoned
        // map is still consistent.
        self.slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ReportSubscriptions for ReportRouter {
    fn subscribe(&self, user: UserId) -> ReportSubscription {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        let replaced = self.lock_slots().insert(user, Slot { ticket, sender });
        if let Some(previous) = replaced {
            warn!(
                %user,
                superseded = previous.ticket,
                ticket,
                "report subscription superseded by a newer request"
            );
        }
        ReportSubscription { ticket, receiver }
    }

    fn unsubscribe(&self, user: UserId, ticket: SubscriptionTicket) {
        let mut slots = self.lock_slots();
        if slots.get(&user).is_some_and(|slot| slot.ticket == ticket) {
            slots.remove(&user);
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for reply routing.
    use super::*;
    use crate::domain::{Amount, CategoryTotals};
    use rstest::rstest;

    fn result_for(user: UserId) -> ReportResult {
        ReportResult::succeeded(
            user,
            CategoryTotals::from([("coffee".to_owned(), Amount::from_fixed(20_000))]),
            None,
        )
    }

    #[rstest]
    #[tokio::test]
    async fn delivers_to_waiting_subscriber() {
        let router = ReportRouter::new();
        let user = UserId::new(1);
        let subscription = router.subscribe(user);

        let outcome = router.deliver(result_for(user));

        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(subscription.receiver.await.expect("result"), result_for(user));
        assert_eq!(router.pending(), 0);
    }

    #[rstest]
    fn result_without_subscriber_is_discarded() {
        let router = ReportRouter::new();

        let outcome = router.deliver(result_for(UserId::new(9)));

        assert_eq!(outcome, DeliveryOutcome::NoSubscriber);
    }

    #[rstest]
    fn second_delivery_for_same_request_is_discarded() {
        let router = ReportRouter::new();
        let user = UserId::new(2);
        let _subscription = router.subscribe(user);

        assert_eq!(router.deliver(result_for(user)), DeliveryOutcome::Delivered);
        assert_eq!(router.deliver(result_for(user)), DeliveryOutcome::NoSubscriber);
    }

    #[rstest]
    fn dropped_receiver_is_reported() {
        let router = ReportRouter::new();
        let user = UserId::new(3);
        drop(router.subscribe(user));

        assert_eq!(router.deliver(result_for(user)), DeliveryOutcome::ReceiverGone);
    }

    #[rstest]
    #[tokio::test]
    async fn newer_subscription_closes_the_older_channel() {
        let router = ReportRouter::new();
        let user = UserId::new(4);
        let first = router.subscribe(user);
        let second = router.subscribe(user);

        assert!(first.receiver.await.is_err(), "older waiter is woken");
        router.unsubscribe(user, first.ticket);
        assert_eq!(router.pending(), 1, "stale cleanup keeps the newer slot");

        router.deliver(result_for(user));
        assert!(second.receiver.await.is_ok());
    }

    #[rstest]
    fn unsubscribe_removes_matching_slot() {
        let router = ReportRouter::new();
        let user = UserId::new(5);
        let subscription = router.subscribe(user);

        router.unsubscribe(user, subscription.ticket);

        assert_eq!(router.pending(), 0);
    }
}
