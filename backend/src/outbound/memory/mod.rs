//! In-process storage adapters.
//!
//! These back the rate store and expense repository ports for single-process
//! deployments and tests. State lives for the lifetime of the process.

mod expense_repository;
mod rate_store;

pub use expense_repository::InMemoryExpenseRepository;
pub use rate_store::InMemoryRateStore;
