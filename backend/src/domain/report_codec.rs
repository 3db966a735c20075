//! Queue wire format for report requests.
//!
//! The message key is the decimal user identifier. The body is JSON:
//!
//! ```text
//! {"from":"2026-10-01T00:00:00Z","currency":"USD","traceId":"<uuid>"}
//! ```
//!
//! `traceId` is optional so requests from producers without a propagation
//! token still decode.
//!
//! Computed results travel back over the callback RPC as
//! [`ReportResultBody`]:
//!
//! ```text
//! {"user":{"id":77},"data":{"coffee":20000},"success":true,"error":"","traceId":"<uuid>"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ports::QueueMessage;
use super::{CategoryTotals, CurrencyCode, ReportRequest, ReportResult, TraceId, UserId};

/// Reasons a delivered message cannot be turned into a request.
#[derive(Debug, thiserror::Error)]
pub enum RequestDecodeError {
    /// The key is not a user identifier.
    #[error("malformed message key {key:?}: {source}")]
    Key {
        /// Raw key.
        key: String,
        /// Parse failure.
        source: std::num::ParseIntError,
    },
    /// The body is not a valid request.
    #[error("malformed message body: {0}")]
    Body(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRequestBody {
    from: DateTime<Utc>,
    currency: CurrencyCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trace_id: Option<TraceId>,
}

/// Serialise `request` into a keyed queue message.
///
/// # Errors
///
/// Returns the serialiser error; the body contains only strings and
/// timestamps, so this indicates a bug rather than bad input.
pub fn encode_request(request: &ReportRequest) -> Result<QueueMessage, serde_json::Error> {
    let body = ReportRequestBody {
        from: request.from,
        currency: request.currency.clone(),
        trace_id: request.trace_id,
    };
    Ok(QueueMessage::new(
        request.user.to_string(),
        serde_json::to_vec(&body)?,
    ))
}

/// Parse the user identifier from a message key.
///
/// # Errors
///
/// Returns [`RequestDecodeError::Key`] for non-numeric keys.
pub fn decode_user(key: &str) -> Result<UserId, RequestDecodeError> {
    key.parse().map_err(|source| RequestDecodeError::Key {
        key: key.to_owned(),
        source,
    })
}

/// Parse the request body for `user`.
///
/// # Errors
///
/// Returns [`RequestDecodeError::Body`] for malformed JSON, unknown currency
/// codes or missing fields.
pub fn decode_request(user: UserId, payload: &[u8]) -> Result<ReportRequest, RequestDecodeError> {
    let body: ReportRequestBody = serde_json::from_slice(payload)?;
    Ok(ReportRequest {
        user,
        from: body.from,
        currency: body.currency,
        trace_id: body.trace_id,
    })
}

/// User reference nested in the callback body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Raw user identifier; must be positive.
    pub id: i64,
}

/// Callback RPC body carrying a computed report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResultBody {
    /// Requesting user.
    pub user: UserRef,
    /// Category totals in fixed point.
    #[serde(default)]
    pub data: CategoryTotals,
    /// Whether `data` is a complete report.
    pub success: bool,
    /// Failure description.
    #[serde(default)]
    pub error: String,
    /// Propagation token of the originating request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<TraceId>,
}

/// Reasons a callback body is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResultValidationError {
    /// The user identifier is zero or negative.
    #[error("user must be positive, got {0}")]
    InvalidUser(i64),
    /// A failed result carries no description.
    #[error("failed result must describe the failure")]
    MissingError,
}

impl From<&ReportResult> for ReportResultBody {
    fn from(result: &ReportResult) -> Self {
        Self {
            user: UserRef {
                id: result.user.get(),
            },
            data: result.data.clone(),
            success: result.success,
            error: result.error.clone(),
            trace_id: result.trace_id,
        }
    }
}

impl TryFrom<ReportResultBody> for ReportResult {
    type Error = ResultValidationError;

    fn try_from(body: ReportResultBody) -> Result<Self, Self::Error> {
        if body.user.id <= 0 {
            return Err(ResultValidationError::InvalidUser(body.user.id));
        }
        if !body.success && body.error.is_empty() {
            return Err(ResultValidationError::MissingError);
        }
        Ok(Self {
            user: UserId::new(body.user.id),
            data: body.data,
            success: body.success,
            error: body.error,
            trace_id: body.trace_id,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the queue wire format.
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[test]
    fn encodes_key_and_camel_case_body() {
        let request = ReportRequest {
            user: UserId::new(77),
            from: Utc
                .with_ymd_and_hms(2026, 10, 1, 0, 0, 0)
                .single()
                .expect("valid time"),
            currency: CurrencyCode::new("USD").expect("code"),
            trace_id: None,
        };

        let message = encode_request(&request).expect("encode");

        assert_eq!(message.key, "77");
        let body: serde_json::Value = serde_json::from_slice(&message.payload).expect("json");
        assert_eq!(body["from"], "2026-10-01T00:00:00Z");
        assert_eq!(body["currency"], "USD");
        assert!(body.get("traceId").is_none());
    }

    #[test]
    fn decodes_body_with_trace_token() {
        let payload = br#"{"from":"2026-10-01T00:00:00Z","currency":"eur","traceId":"00000000-0000-0000-0000-000000000001"}"#;

        let request = decode_request(UserId::new(5), payload).expect("decode");

        assert_eq!(request.currency.as_str(), "EUR");
        assert_eq!(
            request.trace_id.map(|id| id.to_string()).as_deref(),
            Some("00000000-0000-0000-0000-000000000001")
        );
    }

    #[rstest]
    #[case(b"not json".as_slice())]
    #[case(br#"{"from":"2026-10-01T00:00:00Z"}"#.as_slice())]
    #[case(br#"{"from":"yesterday","currency":"USD"}"#.as_slice())]
    #[case(br#"{"from":"2026-10-01T00:00:00Z","currency":"dollars"}"#.as_slice())]
    fn rejects_malformed_bodies(#[case] payload: &[u8]) {
        let err = decode_request(UserId::new(5), payload).expect_err("malformed");
        assert!(matches!(err, RequestDecodeError::Body(_)));
    }

    #[rstest]
    #[case("")]
    #[case("user-1")]
    #[case("1.5")]
    fn rejects_malformed_keys(#[case] key: &str) {
        assert!(matches!(
            decode_user(key),
            Err(RequestDecodeError::Key { .. })
        ));
    }

    #[test]
    fn result_body_carries_fixed_point_totals() {
        let result = ReportResult::succeeded(
            UserId::new(77),
            CategoryTotals::from([("coffee".to_owned(), crate::domain::Amount::from_fixed(20_000))]),
            None,
        );

        let body = serde_json::to_value(ReportResultBody::from(&result)).expect("json");

        assert_eq!(
            body,
            serde_json::json!({
                "user": { "id": 77 },
                "data": { "coffee": 20000 },
                "success": true,
                "error": ""
            })
        );
    }

    #[test]
    fn decodes_nested_user_reference() {
        let body: ReportResultBody = serde_json::from_str(
            r#"{"user":{"id":77},"data":{"coffee":20000},"success":true,"error":""}"#,
        )
        .expect("decode");

        let result = ReportResult::try_from(body).expect("valid result");

        assert_eq!(result.user, UserId::new(77));
        assert!(result.success);
        assert_eq!(
            result.data,
            CategoryTotals::from([("coffee".to_owned(), crate::domain::Amount::from_fixed(20_000))])
        );
    }

    #[test]
    fn rejects_flat_user_identifier() {
        let decoded = serde_json::from_str::<ReportResultBody>(
            r#"{"user":77,"data":{},"success":true,"error":""}"#,
        );
        assert!(decoded.is_err());
    }

    #[rstest]
    #[case(0, true, "", ResultValidationError::InvalidUser(0))]
    #[case(-3, true, "", ResultValidationError::InvalidUser(-3))]
    #[case(5, false, "", ResultValidationError::MissingError)]
    fn rejects_invalid_result_bodies(
        #[case] user: i64,
        #[case] success: bool,
        #[case] error: &str,
        #[case] expected: ResultValidationError,
    ) {
        let body = ReportResultBody {
            user: UserRef { id: user },
            data: CategoryTotals::new(),
            success,
            error: error.to_owned(),
            trace_id: None,
        };

        assert_eq!(ReportResult::try_from(body), Err(expected));
    }
}
