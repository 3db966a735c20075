//! Report endpoints.
//!
//! - `POST /internal/reports`: reply listener receiving computed reports
//!   from workers. Always acknowledges with 204 once the body is read;
//!   invalid bodies are logged and dropped so workers never retry them.
//! - `GET /api/v1/users/{id}/report`: query the report bridge.

use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{ApiError, ApiResult};
use super::state::HttpState;
use crate::domain::report_codec::{ReportResultBody, ResultValidationError};
use crate::domain::{CategoryTotals, CurrencyCode, ReportResult, TraceId, UserId};

#[derive(Debug, thiserror::Error)]
enum CallbackBodyError {
    #[error("malformed report body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid report body: {0}")]
    Invalid(#[from] ResultValidationError),
}

fn decode_result(body: &[u8]) -> Result<ReportResult, CallbackBodyError> {
    let decoded: ReportResultBody = serde_json::from_slice(body)?;
    Ok(ReportResult::try_from(decoded)?)
}

/// Receive a computed report and route it to the waiting caller.
#[post("/internal/reports")]
pub async fn receive_report(state: web::Data<HttpState>, body: web::Bytes) -> HttpResponse {
    match decode_result(&body) {
        Ok(result) => {
            let trace_id = result.trace_id;
            let user = result.user;
            TraceId::scope_optional(trace_id, async {
                let outcome = state.router.deliver(result);
                debug!(%user, ?outcome, "report callback handled");
            })
            .await;
        }
        Err(error) => warn!(%error, "ignoring invalid report callback"),
    }
    HttpResponse::NoContent().finish()
}

/// Query parameters of the report endpoint.
///
/// Both are optional at extraction time so missing values produce the same
/// JSON error as malformed ones.
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// RFC 3339 start of the reporting window.
    pub from: Option<String>,
    /// Target currency code.
    pub currency: Option<String>,
}

/// Report response payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    /// Requesting user.
    pub user: i64,
    /// Currency of every total.
    pub currency: CurrencyCode,
    /// Start of the reporting window.
    pub from: DateTime<Utc>,
    /// Totals per category in fixed point with four decimals.
    pub data: CategoryTotals,
}

fn parse_user(raw: &str) -> Result<UserId, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(UserId::new(id)),
        _ => Err(ApiError::invalid_request(format!(
            "user id must be a positive integer, got {raw:?}"
        ))),
    }
}

fn parse_query(query: &ReportQuery) -> Result<(DateTime<Utc>, CurrencyCode), ApiError> {
    let from = query
        .from
        .as_deref()
        .ok_or_else(|| ApiError::invalid_request("missing query parameter `from`"))?;
    let from = DateTime::parse_from_rfc3339(from)
        .map_err(|error| {
            ApiError::invalid_request(format!("`from` must be an RFC 3339 timestamp: {error}"))
        })?
        .with_timezone(&Utc);

    let currency = query
        .currency
        .as_deref()
        .ok_or_else(|| ApiError::invalid_request("missing query parameter `currency`"))?;
    let currency =
        CurrencyCode::new(currency).map_err(|error| ApiError::invalid_request(error.to_string()))?;
    Ok((from, currency))
}

/// Compute a spending report for one user.
#[get("/api/v1/users/{id}/report")]
pub async fn get_report(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<ReportQuery>,
) -> ApiResult<web::Json<ReportResponse>> {
    let user = parse_user(&path)?;
    let (from, currency) = parse_query(&query)?;

    let data = state.reporter.get_report(user, from, &currency).await?;
    Ok(web::Json(ReportResponse {
        user: user.get(),
        currency,
        from,
        data,
    }))
}

#[cfg(test)]
#[path = "reports_tests.rs"]
mod tests;
