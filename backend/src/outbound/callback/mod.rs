//! Report callback adapters.
//!
//! - **http**: POSTs results to a remote reply listener.
//! - **local**: hands results straight to the in-process reply router.

mod http;
mod local;

pub use http::HttpReportCallback;
pub use local::LocalReportCallback;
