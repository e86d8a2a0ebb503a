// SQLite EventOutbox Implementation

use crate::error::map_sqlx_error;
use crate::transaction::SqliteUnitOfWork;
use async_trait::async_trait;
use confpush_core::domain::ConfigEvent;
use confpush_core::error::Result;
use confpush_core::port::{EventOutbox, OutboxEntry, OutboxTransaction, TimeProvider};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::debug;

/// Outbox stored in `config_events`
///
/// Writers record events on the same connection as the change that caused
/// them; the relay reads unprocessed rows in id order.
pub struct SqliteOutbox {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteOutbox {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// Insert an event row on `conn`, returning its id
    pub async fn record(conn: &mut SqliteConnection, event: &ConfigEvent, now: i64) -> Result<i64> {
        let payload = serde_json::to_string(event)?;
        let result = sqlx::query(
            r#"
            INSERT INTO config_events (kind, device_id, payload, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(event.kind().as_str())
        .bind(event.device_id().as_str())
        .bind(payload)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

        let id = result.last_insert_rowid();
        debug!(entry_id = id, kind = %event.kind(), device_id = %event.device_id(), "Event recorded");
        Ok(id)
    }

    /// Record an event in its own transaction
    pub async fn record_now(&self, event: &ConfigEvent) -> Result<i64> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Self::record(&mut conn, event, self.time_provider.now_millis()).await
    }

    /// Number of entries not yet relayed
    pub async fn pending_count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM config_events WHERE processed_at IS NULL")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl EventOutbox for SqliteOutbox {
    async fn next_batch(&self, limit: usize) -> Result<Vec<OutboxEntry>> {
        let rows = sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT id, kind, payload, created_at
            FROM config_events
            WHERE processed_at IS NULL
            ORDER BY id ASC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(OutboxRow::into_entry).collect()
    }

    async fn begin(&self) -> Result<Box<dyn OutboxTransaction>> {
        let uow = SqliteUnitOfWork::begin(&self.pool, self.time_provider.clone()).await?;
        Ok(Box::new(uow))
    }
}

#[derive(sqlx::FromRow)]
struct OutboxRow {
    id: i64,
    kind: String,
    payload: String,
    created_at: i64,
}

impl OutboxRow {
    fn into_entry(self) -> Result<OutboxEntry> {
        Ok(OutboxEntry {
            id: self.id,
            kind: self.kind,
            payload: serde_json::from_str(&self.payload)?,
            created_at: self.created_at,
        })
    }
}
