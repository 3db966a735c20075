//! HTTP inbound adapter exposing the reply listener, report query and health
//! endpoints.

pub mod error;
pub mod health;
pub mod reports;
pub mod state;
pub mod trace;

pub use error::{ApiError, ApiResult, ErrorCode};
pub use trace::Trace;
