//! Health endpoints: liveness and readiness probes for orchestration and load
//! balancers.
//!
//! Readiness combines the startup flag with the exchange gate, so the probe
//! reports 503 while a rate refresh holds the gate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, http::header, web};

use crate::domain::Rater;

/// Shared health state for readiness and liveness checks.
pub struct HealthState {
    started: AtomicBool,
    live: AtomicBool,
    rater: Arc<Rater>,
}

impl HealthState {
    /// Create a state that is live but not yet started.
    pub fn new(rater: Arc<Rater>) -> Self {
        Self {
            started: AtomicBool::new(false),
            live: AtomicBool::new(true),
            rater,
        }
    }

    /// Mark startup as complete.
    pub fn mark_ready(&self) {
        self.started.store(true, Ordering::Release);
    }

    /// Flag the service as unhealthy so liveness checks fail fast during shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Whether the service can compute reports right now.
    pub fn is_ready(&self) -> bool {
        self.started.load(Ordering::Acquire) && self.rater.is_ready()
    }

    /// Return liveness state. When false, liveness probes emit 503 to trigger restarts.
    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn probe_response(probe_ok: bool) -> HttpResponse {
        let mut response = if probe_ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };

        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()
    }
}

/// Readiness probe. Return 200 when started and rates are not refreshing;
/// return 503 otherwise.
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_ready())
}

/// Liveness probe. Return 200 while the process is marked alive and 503 once draining.
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_alive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockRateSource, MockRateStore};
    use crate::domain::{CurrencyCode, RaterConfig};
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use rstest::rstest;

    fn state() -> web::Data<HealthState> {
        let rater = Rater::new(
            Arc::new(MockRateSource::new()),
            Arc::new(MockRateStore::new()),
            RaterConfig::new(CurrencyCode::new("USD").expect("code")),
        );
        web::Data::new(HealthState::new(Arc::new(rater)))
    }

    async fn probe(state: web::Data<HealthState>, uri: &str) -> StatusCode {
        let app = actix_test::init_service(
            App::new().app_data(state).service(ready).service(live),
        )
        .await;
        let request = actix_test::TestRequest::get().uri(uri).to_request();
        actix_test::call_service(&app, request).await.status()
    }

    #[rstest]
    #[actix_web::test]
    async fn readiness_waits_for_startup() {
        let state = state();
        assert_eq!(
            probe(state.clone(), "/health/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.mark_ready();

        assert_eq!(probe(state, "/health/ready").await, StatusCode::OK);
    }

    #[rstest]
    #[actix_web::test]
    async fn liveness_fails_once_draining() {
        let state = state();
        assert_eq!(probe(state.clone(), "/health/live").await, StatusCode::OK);

        state.mark_unhealthy();

        assert_eq!(
            probe(state, "/health/live").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
