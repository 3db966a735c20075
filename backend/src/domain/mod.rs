//! Domain primitives, ports and services for the spending report pipeline.
//!
//! Purpose: keep exchange arithmetic, request correlation and report
//! computation free of transport concerns. Adapters in `outbound` implement
//! the [`ports`]; adapters in `inbound` drive the services.
//!
//! Public surface:
//! - [`Rater`] converts amounts and refreshes rates behind a reader/writer
//!   gate.
//! - [`ReportProducer`] publishes report requests.
//! - [`ReportWorker`] computes reports from queued requests.
//! - [`ReportRouter`] routes computed reports to waiting callers.
//! - [`Reporter`] turns the round trip into one bounded call.

pub mod error;
pub mod money;
pub mod ports;
pub mod rater;
pub mod report;
pub mod report_codec;
pub mod report_producer;
pub mod report_router;
pub mod report_worker;
pub mod reporter;
pub mod trace_id;
pub mod user_id;

pub use self::error::{ExchangeError, NOT_READY_MESSAGE, ReportError};
pub use self::money::{
    Amount, CurrencyCode, FIXED_POINT_SCALE, MoneyValidationError, Rate, parse_fixed_point,
};
pub use self::rater::{
    DEFAULT_REFRESH_INTERVAL, ExchangePermit, Rater, RaterConfig, RefreshSummary,
};
pub use self::report::{CategoryTotals, ExpenseItem, ReportRequest, ReportResult};
pub use self::report_producer::ReportProducer;
pub use self::report_router::{DeliveryOutcome, ReportRouter};
pub use self::report_worker::{ReportWorker, ReportWorkerConfig};
pub use self::reporter::{DEFAULT_REPORT_TIMEOUT, Reporter};
pub use self::trace_id::TraceId;
pub use self::user_id::UserId;
