//! Expense and report records exchanged between pipeline stages.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{Amount, CurrencyCode, TraceId, UserId};

/// Per-category totals in the requested currency.
pub type CategoryTotals = BTreeMap<String, Amount>;

/// One recorded expense line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseItem {
    /// When the expense happened; conversions use this date's rate.
    pub date: DateTime<Utc>,
    /// Amount in `currency`.
    pub amount: Amount,
    /// Currency the expense was recorded in.
    pub currency: CurrencyCode,
}

/// Request to compute one user's spending report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    /// Requesting user.
    pub user: UserId,
    /// Start of the reporting window, inclusive.
    pub from: DateTime<Utc>,
    /// Currency the totals should be expressed in.
    pub currency: CurrencyCode,
    /// Propagation token of the originating call.
    pub trace_id: Option<TraceId>,
}

/// Computed report routed back to the waiting caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportResult {
    /// User the report belongs to.
    pub user: UserId,
    /// Category totals; empty on failure.
    pub data: CategoryTotals,
    /// Whether `data` is a complete report.
    pub success: bool,
    /// Failure description; empty on success.
    pub error: String,
    /// Propagation token copied from the request.
    pub trace_id: Option<TraceId>,
}

impl ReportResult {
    /// Successful report carrying `data`.
    pub fn succeeded(user: UserId, data: CategoryTotals, trace_id: Option<TraceId>) -> Self {
        Self {
            user,
            data,
            success: true,
            error: String::new(),
            trace_id,
        }
    }

    /// Failed report carrying a description.
    pub fn failed(user: UserId, error: impl Into<String>, trace_id: Option<TraceId>) -> Self {
        Self {
            user,
            data: CategoryTotals::new(),
            success: false,
            error: error.into(),
            trace_id,
        }
    }
}
