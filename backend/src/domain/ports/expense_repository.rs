//! Driven port reading recorded expenses.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;
use crate::domain::{ExpenseItem, UserId};

/// Expenses grouped by category name.
pub type ExpensesByCategory = BTreeMap<String, Vec<ExpenseItem>>;

define_port_error! {
    /// Errors surfaced by expense storage adapters.
    pub enum ExpenseRepositoryError {
        /// Storage is unavailable.
        Unavailable { message: String } => "expense storage unavailable: {message}",
        /// A query failed.
        Query { message: String } => "expense query failed: {message}",
    }
}

/// Read-only view of a user's expenses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    /// List expenses recorded at or after `from`, grouped by category.
    async fn list(
        &self,
        user: UserId,
        from: DateTime<Utc>,
    ) -> Result<ExpensesByCategory, ExpenseRepositoryError>;
}
