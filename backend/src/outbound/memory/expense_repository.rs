//! Map-backed expense repository.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{ExpenseRepository, ExpenseRepositoryError, ExpensesByCategory};
use crate::domain::{ExpenseItem, UserId};

#[derive(Debug, Clone)]
struct StoredExpense {
    category: String,
    item: ExpenseItem,
}

/// In-memory `ExpenseRepository`.
///
/// Listing returns only categories with at least one expense at or after
/// the requested instant, items in recording order.
#[derive(Debug, Default)]
pub struct InMemoryExpenseRepository {
    expenses: RwLock<HashMap<UserId, Vec<StoredExpense>>>,
}

impl InMemoryExpenseRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one expense for `user` under `category`.
    pub fn record(&self, user: UserId, category: impl Into<String>, item: ExpenseItem) {
        self.expenses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user)
            .or_default()
            .push(StoredExpense {
                category: category.into(),
                item,
            });
    }
}

#[async_trait]
impl ExpenseRepository for InMemoryExpenseRepository {
    async fn list(
        &self,
        user: UserId,
        from: DateTime<Utc>,
    ) -> Result<ExpensesByCategory, ExpenseRepositoryError> {
        let expenses = self.expenses.read().unwrap_or_else(PoisonError::into_inner);
        let mut grouped = ExpensesByCategory::new();
        for stored in expenses.get(&user).into_iter().flatten() {
            if stored.item.date >= from {
                grouped
                    .entry(stored.category.clone())
                    .or_default()
                    .push(stored.item.clone());
            }
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, CurrencyCode};
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, 9, 0, 0)
            .single()
            .expect("valid time")
    }

    fn item(day: u32, amount: i64) -> ExpenseItem {
        ExpenseItem {
            date: at(day),
            amount: Amount::from_fixed(amount),
            currency: CurrencyCode::new("RUB").expect("code"),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn lists_recent_expenses_grouped_by_category() {
        let repo = InMemoryExpenseRepository::new();
        let user = UserId::new(1);
        repo.record(user, "coffee", item(1, 100));
        repo.record(user, "coffee", item(3, 200));
        repo.record(user, "coffee", item(4, 300));
        repo.record(user, "rent", item(2, 5_000));
        repo.record(UserId::new(2), "coffee", item(5, 999));

        let listed = repo.list(user, at(3)).await.expect("list");

        assert_eq!(listed.len(), 1, "rent has nothing in range");
        assert_eq!(listed["coffee"], vec![item(3, 200), item(4, 300)]);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_user_has_no_expenses() {
        let repo = InMemoryExpenseRepository::new();

        let listed = repo.list(UserId::new(42), at(1)).await.expect("list");

        assert!(listed.is_empty());
    }
}
