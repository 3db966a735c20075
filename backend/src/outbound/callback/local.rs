//! In-process report callback.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{ReportCallback, ReportCallbackError};
use crate::domain::{ReportResult, ReportRouter};

/// Callback delivering results to a router in the same process.
///
/// Delivery never fails: a result nobody waits for is discarded by the
/// router, as the remote listener would.
#[derive(Clone)]
pub struct LocalReportCallback {
    router: Arc<ReportRouter>,
}

impl LocalReportCallback {
    /// Deliver into `router`.
    pub fn new(router: Arc<ReportRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl ReportCallback for LocalReportCallback {
    async fn send_report(&self, result: &ReportResult) -> Result<(), ReportCallbackError> {
        self.router.deliver(result.clone());
        Ok(())
    }
}
