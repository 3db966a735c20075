//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod expense_repository;
mod rate_source;
mod rate_store;
mod report_callback;
mod report_queue;
mod report_subscriptions;

#[cfg(test)]
pub use expense_repository::MockExpenseRepository;
pub use expense_repository::{ExpenseRepository, ExpenseRepositoryError, ExpensesByCategory};
#[cfg(test)]
pub use rate_source::MockRateSource;
pub use rate_source::{RateSource, RateSourceError, RateTable};
#[cfg(test)]
pub use rate_store::MockRateStore;
pub use rate_store::{RateStore, RateStoreError};
#[cfg(test)]
pub use report_callback::MockReportCallback;
pub use report_callback::{ReportCallback, ReportCallbackError};
#[cfg(test)]
pub use report_queue::{MockQueueMessageHandler, MockReportQueue};
pub use report_queue::{QueueMessage, QueueMessageHandler, ReportQueue, ReportQueueError};
#[cfg(test)]
pub use report_subscriptions::MockReportSubscriptions;
pub use report_subscriptions::{ReportSubscription, ReportSubscriptions, SubscriptionTicket};
