//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and remain testable without I/O.

use std::sync::Arc;

use crate::domain::{ReportRouter, Reporter};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Bridge answering report queries.
    pub reporter: Reporter,
    /// Router receiving computed reports.
    pub router: Arc<ReportRouter>,
}

impl HttpState {
    /// Bundle the report services.
    pub fn new(reporter: Reporter, router: Arc<ReportRouter>) -> Self {
        Self { reporter, router }
    }
}
