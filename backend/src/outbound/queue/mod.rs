//! Report request queue adapters.
//!
//! - **in_memory**: partitioned channels for single-process deployments.
//! - **postgres**: durable table claimed with `FOR UPDATE SKIP LOCKED`.
//!
//! Both keep per-key publication order and hand every delivered message to a
//! `QueueMessageHandler`; a handler return acknowledges the message.

mod in_memory;
mod postgres;

pub use in_memory::{InMemoryQueueConsumers, InMemoryReportQueue, partition_for};
pub use postgres::{PostgresQueueConsumer, PostgresReportQueue};
