//! PostgreSQL-backed durable queue.
//!
//! Requests live in one table until a consumer has handled them. Publishing
//! commits with `synchronous_commit = remote_apply`, so an acknowledged
//! request is visible on synchronous replicas. Consumers claim the oldest
//! row whose key has no older pending row, skip rows locked by other
//! consumers, run the handler and delete the row in the same transaction.
//! A consumer crash rolls the claim back and the row is redelivered.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::ports::{QueueMessage, QueueMessageHandler, ReportQueue, ReportQueueError};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS report_requests (
    id BIGSERIAL PRIMARY KEY,
    message_key TEXT NOT NULL,
    payload BYTEA NOT NULL,
    enqueued_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const CREATE_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS report_requests_key_idx ON report_requests (message_key, id)";

const INSERT_SQL: &str = "INSERT INTO report_requests (message_key, payload) VALUES ($1, $2)";

const CLAIM_SQL: &str = "SELECT r.id, r.message_key, r.payload
    FROM report_requests r
    WHERE NOT EXISTS (
        SELECT 1 FROM report_requests older
        WHERE older.message_key = r.message_key AND older.id < r.id
    )
    ORDER BY r.id
    LIMIT 1
    FOR UPDATE SKIP LOCKED";

const DELETE_SQL: &str = "DELETE FROM report_requests WHERE id = $1";

fn map_sqlx_error(error: sqlx::Error) -> ReportQueueError {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            ReportQueueError::unavailable(error.to_string())
        }
        other => ReportQueueError::rejected(other.to_string()),
    }
}

/// Producer side of the PostgreSQL queue.
#[derive(Clone)]
pub struct PostgresReportQueue {
    pool: PgPool,
}

impl PostgresReportQueue {
    /// Connect a pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportQueueError::Unavailable`] when the database cannot be
    /// reached.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, ReportQueueError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|error| ReportQueueError::unavailable(error.to_string()))?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the queue table when missing.
    ///
    /// # Errors
    ///
    /// Returns the mapped database error.
    pub async fn ensure_schema(&self) -> Result<(), ReportQueueError> {
        sqlx::query(CREATE_TABLE_SQL)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        sqlx::query(CREATE_INDEX_SQL)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Build a consumer sharing this queue's pool.
    pub fn consumer(&self, poll_interval: Duration, concurrency: usize) -> PostgresQueueConsumer {
        PostgresQueueConsumer {
            pool: self.pool.clone(),
            poll_interval,
            concurrency: concurrency.max(1),
        }
    }
}

#[async_trait]
impl ReportQueue for PostgresReportQueue {
    async fn publish(&self, message: QueueMessage) -> Result<(), ReportQueueError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query("SET LOCAL synchronous_commit = 'remote_apply'")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        sqlx::query(INSERT_SQL)
            .bind(&message.key)
            .bind(&message.payload)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(key = %message.key, "report request persisted");
        Ok(())
    }
}

/// Consumer side of the PostgreSQL queue.
pub struct PostgresQueueConsumer {
    pool: PgPool,
    poll_interval: Duration,
    concurrency: usize,
}

impl PostgresQueueConsumer {
    /// Poll for requests with `concurrency` claimers until `shutdown`
    /// resolves.
    pub async fn run<F>(self, handler: Arc<dyn QueueMessageHandler>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut tasks = JoinSet::new();
        for claimer in 0..self.concurrency {
            let pool = self.pool.clone();
            let handler = handler.clone();
            let poll_interval = self.poll_interval;
            tasks.spawn(async move {
                loop {
                    match claim_next(&pool, handler.as_ref()).await {
                        Ok(true) => {}
                        Ok(false) => tokio::time::sleep(poll_interval).await,
                        Err(error) => {
                            warn!(claimer, %error, "failed to claim report request");
                            tokio::time::sleep(poll_interval).await;
                        }
                    }
                }
            });
        }

        shutdown.await;
        info!("postgres queue consumers stopping");
        tasks.shutdown().await;
    }
}

/// Claim, handle and delete one request. Returns `false` when nothing was
/// claimable.
async fn claim_next(
    pool: &PgPool,
    handler: &dyn QueueMessageHandler,
) -> Result<bool, ReportQueueError> {
    let mut tx = pool.begin().await.map_err(map_sqlx_error)?;
    let claimed: Option<(i64, String, Vec<u8>)> = sqlx::query_as(CLAIM_SQL)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
    let Some((id, key, payload)) = claimed else {
        tx.rollback().await.map_err(map_sqlx_error)?;
        return Ok(false);
    };

    handler.handle(QueueMessage::new(key, payload)).await;

    sqlx::query(DELETE_SQL)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
    tx.commit().await.map_err(map_sqlx_error)?;
    debug!(id, "report request acknowledged");
    Ok(true)
}
