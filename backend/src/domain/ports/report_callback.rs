//! Driven port delivering computed reports back to the reply listener.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::ReportResult;

define_port_error! {
    /// Errors surfaced while delivering a report result.
    pub enum ReportCallbackError {
        /// The listener could not be reached.
        Transport { message: String } => "report callback transport failed: {message}",
        /// The listener refused the call.
        Rejected { status: u16, message: String } =>
            "report callback rejected with status {status}: {message}",
    }
}

/// Unary RPC back to the reply listener.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportCallback: Send + Sync {
    /// Deliver `result`; the listener acknowledges without a payload.
    async fn send_report(&self, result: &ReportResult) -> Result<(), ReportCallbackError>;
}
