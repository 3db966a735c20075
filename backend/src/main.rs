//! Service entry-point: wires the exchange engine, report pipeline and HTTP
//! endpoints.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use color_eyre::eyre::{Context, Result, eyre};
use ortho_config::OrthoConfig;
use reqwest::Url;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use spendbot::config::{ConfigError, QueueBackend, ServiceSettings};
use spendbot::domain::ports::{QueueMessageHandler, ReportCallback, ReportQueue};
use spendbot::domain::{
    Rater, RaterConfig, ReportProducer, ReportRouter, ReportWorker, ReportWorkerConfig, Reporter,
};
use spendbot::inbound::http::Trace;
use spendbot::inbound::http::health::{HealthState, live, ready};
use spendbot::inbound::http::reports::{get_report, receive_report};
use spendbot::inbound::http::state::HttpState;
use spendbot::outbound::callback::{HttpReportCallback, LocalReportCallback};
use spendbot::outbound::memory::{InMemoryExpenseRepository, InMemoryRateStore};
use spendbot::outbound::queue::{InMemoryReportQueue, PostgresReportQueue};
use spendbot::outbound::rates::RatesHttpSource;

/// Resolves once shutdown has been signalled.
#[derive(Clone)]
struct Shutdown(watch::Receiver<bool>);

impl Shutdown {
    async fn wait(mut self) {
        let _closed = self.0.wait_for(|stopping| *stopping).await;
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServiceSettings::load_from_iter(std::env::args_os())
        .map_err(|error| eyre!("failed to load configuration: {error}"))?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let shutdown = Shutdown(stop_rx);
    let mut background: Vec<JoinHandle<()>> = Vec::new();

    let rates_url = Url::parse(settings.rates_url()).wrap_err("invalid rates URL")?;
    let source = RatesHttpSource::new(rates_url, settings.rates_timeout())
        .wrap_err("failed to build rates client")?;
    let rater = Arc::new(Rater::new(
        Arc::new(source),
        Arc::new(InMemoryRateStore::new()),
        RaterConfig::new(settings.base_currency()?)
            .with_refresh_interval(settings.refresh_interval()),
    ));
    background.push(tokio::spawn({
        let rater = rater.clone();
        let shutdown = shutdown.clone();
        async move { rater.run(shutdown.wait()).await }
    }));

    let router = Arc::new(ReportRouter::new());
    let callback: Arc<dyn ReportCallback> = match settings.callback_url.as_deref() {
        Some(url) => {
            let endpoint = Url::parse(url).wrap_err("invalid callback URL")?;
            Arc::new(
                HttpReportCallback::new(endpoint, settings.callback_timeout())
                    .wrap_err("failed to build callback client")?,
            )
        }
        None => Arc::new(LocalReportCallback::new(router.clone())),
    };
    let worker: Arc<dyn QueueMessageHandler> = Arc::new(ReportWorker::new(
        rater.clone(),
        // Expense storage lives outside this service; until a storage adapter
        // is wired in, reports cover no expenses.
        Arc::new(InMemoryExpenseRepository::new()),
        callback,
        ReportWorkerConfig {
            reply_when_not_ready: settings.reply_when_not_ready,
        },
    ));

    let queue: Arc<dyn ReportQueue> = match settings.queue_backend()? {
        QueueBackend::Memory => {
            let (queue, consumers) = InMemoryReportQueue::new(settings.queue_partitions()?);
            background.push(tokio::spawn(consumers.run(worker, shutdown.clone().wait())));
            Arc::new(queue)
        }
        QueueBackend::Postgres => {
            let database_url = settings
                .database_url
                .as_deref()
                .ok_or(ConfigError::MissingDatabaseUrl)?;
            let consumers = settings.queue_consumers();
            let pool_size = u32::try_from(consumers + 2).unwrap_or(u32::MAX);
            let queue = PostgresReportQueue::connect(database_url, pool_size).await?;
            queue.ensure_schema().await?;
            let consumer = queue.consumer(settings.queue_poll_interval(), consumers);
            background.push(tokio::spawn(consumer.run(worker, shutdown.clone().wait())));
            Arc::new(queue)
        }
    };

    let reporter = Reporter::new(
        ReportProducer::new(queue),
        router.clone(),
        settings.report_timeout(),
    );
    let http_state = web::Data::new(HttpState::new(reporter, router));
    let health_state = web::Data::new(HealthState::new(rater));
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(http_state.clone())
            .app_data(server_health_state.clone())
            .wrap(Trace)
            .service(get_report)
            .service(receive_report)
            .service(ready)
            .service(live)
    })
    .bind(settings.listen_addr())
    .wrap_err_with(|| format!("failed to bind {}", settings.listen_addr()))?;

    health_state.mark_ready();
    info!(addr = settings.listen_addr(), "report service listening");
    let served = server.run().await;

    health_state.mark_unhealthy();
    if stop_tx.send(true).is_err() {
        debug!("background tasks already stopped");
    }
    for task in background {
        if let Err(error) = task.await {
            warn!(%error, "background task ended abnormally");
        }
    }
    served.wrap_err("http server failed")
}
