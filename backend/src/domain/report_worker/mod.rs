//! Report compute worker consuming queued requests.
//!
//! Per message the worker:
//!
//! 1. parses the user from the key (malformed keys are dropped);
//! 2. checks out the exchange gate once for the whole report; when rates are
//!    refreshing the message is dropped without a reply, so the caller times
//!    out (see [`ReportWorkerConfig::reply_when_not_ready`]);
//! 3. decodes the body (malformed bodies are dropped);
//! 4. reads the user's expenses and converts every line item at its own date
//!    into the requested currency, aborting on the first failure;
//! 5. releases the gate and sends exactly one result through the callback.
//!
//! Dropped messages are acknowledged, never retried.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    ExpenseRepository, ExpenseRepositoryError, QueueMessage, QueueMessageHandler, ReportCallback,
};
use crate::domain::rater::{ExchangePermit, Rater};
use crate::domain::report_codec::{decode_request, decode_user};
use crate::domain::{
    Amount, CategoryTotals, ExchangeError, NOT_READY_MESSAGE, ReportRequest, ReportResult, TraceId,
    UserId,
};

/// Worker behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportWorkerConfig {
    /// Reply with the not-ready sentinel instead of dropping the message
    /// while rates refresh. Off by default: the caller then waits for its
    /// own timeout.
    pub reply_when_not_ready: bool,
}

#[derive(Debug, thiserror::Error)]
enum ComputeError {
    #[error("failed to read expenses: {0}")]
    Expenses(#[from] ExpenseRepositoryError),
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
    #[error("cannot exchange {category} total: sum overflows")]
    TotalOverflow { category: String },
}

/// Queue handler computing reports.
pub struct ReportWorker {
    rater: Arc<Rater>,
    expenses: Arc<dyn ExpenseRepository>,
    callback: Arc<dyn ReportCallback>,
    config: ReportWorkerConfig,
}

impl ReportWorker {
    /// Build a worker.
    pub fn new(
        rater: Arc<Rater>,
        expenses: Arc<dyn ExpenseRepository>,
        callback: Arc<dyn ReportCallback>,
        config: ReportWorkerConfig,
    ) -> Self {
        Self {
            rater,
            expenses,
            callback,
            config,
        }
    }

    async fn process(&self, permit: ExchangePermit<'_>, request: ReportRequest) {
        let computed = self.compute(&permit, &request).await;
        drop(permit);

        let result = match computed {
            Ok(data) => {
                debug!(user = %request.user, categories = data.len(), "report computed");
                ReportResult::succeeded(request.user, data, request.trace_id)
            }
            Err(error) => {
                info!(user = %request.user, %error, "report computation failed");
                ReportResult::failed(request.user, error.to_string(), request.trace_id)
            }
        };
        self.reply(&result).await;
    }

    async fn compute(
        &self,
        permit: &ExchangePermit<'_>,
        request: &ReportRequest,
    ) -> Result<CategoryTotals, ComputeError> {
        let expenses = self.expenses.list(request.user, request.from).await?;

        let mut totals = CategoryTotals::new();
        for (category, items) in expenses {
            let mut total = Amount::ZERO;
            for item in &items {
                let converted = permit
                    .exchange(
                        item.amount,
                        &item.currency,
                        &request.currency,
                        item.date.date_naive(),
                    )
                    .await?;
                let Some(sum) = total.checked_add(converted) else {
                    return Err(ComputeError::TotalOverflow { category });
                };
                total = sum;
            }
            totals.insert(category, total);
        }
        Ok(totals)
    }

    async fn on_not_ready(&self, user: UserId, message: &QueueMessage) {
        if !self.config.reply_when_not_ready {
            info!(%user, "exchange rates not ready; dropping report request");
            return;
        }
        let trace_id = decode_request(user, &message.payload)
            .ok()
            .and_then(|request| request.trace_id);
        let result = ReportResult::failed(user, NOT_READY_MESSAGE, trace_id);
        TraceId::scope_optional(trace_id, self.reply(&result)).await;
    }

    async fn reply(&self, result: &ReportResult) {
        if let Err(error) = self.callback.send_report(result).await {
            warn!(user = %result.user, %error, "failed to deliver report result");
        }
    }
}

#[async_trait]
impl QueueMessageHandler for ReportWorker {
    async fn handle(&self, message: QueueMessage) {
        let user = match decode_user(&message.key) {
            Ok(user) => user,
            Err(error) => {
                warn!(%error, "dropping report request with malformed key");
                return;
            }
        };

        let Some(permit) = self.rater.try_acquire_exchange() else {
            self.on_not_ready(user, &message).await;
            return;
        };

        let request = match decode_request(user, &message.payload) {
            Ok(request) => request,
            Err(error) => {
                warn!(%user, %error, "dropping malformed report request");
                return;
            }
        };

        let trace_id = request.trace_id;
        TraceId::scope_optional(trace_id, self.process(permit, request)).await;
    }
}
