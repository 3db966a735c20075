//! HTTP adapter mapping for domain errors.
//!
//! Purpose: keep `ReportError` HTTP-agnostic while allowing Actix handlers to
//! turn failures into consistent JSON responses and status codes.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::domain::{ReportError, TraceId};

/// Response header carrying the request's propagation token.
pub const TRACE_ID_HEADER: &str = "trace-id";

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Stable machine-readable error identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request was malformed.
    InvalidRequest,
    /// Exchange rates are refreshing; retry shortly.
    NotReady,
    /// An expense could not be converted.
    CannotExchange,
    /// The report did not arrive in time.
    Timeout,
    /// A newer request for the same user took over.
    Superseded,
    /// The pipeline could not be reached or failed.
    Upstream,
}

/// JSON error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ApiError {
    /// Error identifier.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Propagation token of the failed request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ApiError {
    /// Build an error, capturing the propagation token in scope.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            trace_id: TraceId::current().map(|id| id.to_string()),
        }
    }

    /// Shorthand for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }
}

impl From<ReportError> for ApiError {
    fn from(error: ReportError) -> Self {
        let code = match &error {
            ReportError::NotReady => ErrorCode::NotReady,
            ReportError::CannotExchange { .. } => ErrorCode::CannotExchange,
            ReportError::Timeout => ErrorCode::Timeout,
            ReportError::Superseded => ErrorCode::Superseded,
            ReportError::Dispatch(_) | ReportError::Failed { .. } => ErrorCode::Upstream,
        };
        Self::new(code, error.to_string())
    }
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::CannotExchange => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::Superseded => StatusCode::CONFLICT,
        ErrorCode::Upstream => StatusCode::BAD_GATEWAY,
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        status_for(self.code)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}
