//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **rates**: HTTP source for the daily exchange rate document
//! - **memory**: in-process rate store and expense repository
//! - **queue**: partitioned in-memory and PostgreSQL report request queues
//! - **callback**: HTTP and in-process delivery of computed reports
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod callback;
pub mod memory;
pub mod queue;
pub mod rates;
