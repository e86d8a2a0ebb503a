// SQLite Unit of Work

use crate::credential_store::{attach_defaults_on, count_connections_on};
use crate::error::map_sqlx_error;
use crate::outbox::SqliteOutbox;
use async_trait::async_trait;
use confpush_core::application::CommitHooks;
use confpush_core::domain::{ConfigEvent, Device, DeviceId};
use confpush_core::error::{AppError, Result};
use confpush_core::port::id_provider::UuidProvider;
use confpush_core::port::{
    CommitCallback, CommitScope, CredentialTransaction, IdProvider, OutboxTransaction,
    TimeProvider, Transaction,
};
use sqlx::{Connection, Sqlite, SqlitePool, Transaction as SqlxTransaction};
use std::sync::Arc;
use tracing::debug;

/// A database transaction plus the callbacks waiting for it to commit
///
/// Handlers that write through the unit of work (credential provisioning)
/// share its connection, so they never wait on the write lock it holds.
pub struct SqliteUnitOfWork {
    tx: SqlxTransaction<'static, Sqlite>,
    hooks: CommitHooks,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteUnitOfWork {
    pub async fn begin(pool: &SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Result<Self> {
        let tx = pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Self {
            tx,
            hooks: CommitHooks::new(),
            id_provider: Arc::new(UuidProvider),
            time_provider,
        })
    }

    /// Use `id_provider` for rows created inside this unit of work
    pub fn with_id_provider(mut self, id_provider: Arc<dyn IdProvider>) -> Self {
        self.id_provider = id_provider;
        self
    }

    /// Write an event to the outbox as part of this transaction
    pub async fn record_event(&mut self, event: &ConfigEvent) -> Result<i64> {
        let now = self.time_provider.now_millis();
        SqliteOutbox::record(&mut self.tx, event, now).await
    }

    pub fn pending_hooks(&self) -> usize {
        self.hooks.len()
    }
}

impl CommitScope for SqliteUnitOfWork {
    fn on_commit(&mut self, callback: CommitCallback) {
        self.hooks.on_commit(callback);
    }

    fn credentials(&mut self) -> Option<&mut dyn CredentialTransaction> {
        Some(self as &mut dyn CredentialTransaction)
    }
}

#[async_trait]
impl CredentialTransaction for SqliteUnitOfWork {
    async fn count_connections(&mut self, device_id: &DeviceId) -> Result<u64> {
        count_connections_on(&mut self.tx, device_id).await
    }

    /// Runs inside a savepoint: on failure only the provisioning writes are
    /// undone
    async fn ensure_default_credentials(&mut self, device: &Device) -> Result<usize> {
        let now = self.time_provider.now_millis();
        let mut savepoint = Connection::begin(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        match attach_defaults_on(&mut savepoint, device, self.id_provider.as_ref(), now).await {
            Ok(created) => {
                savepoint.commit().await.map_err(map_sqlx_error)?;
                Ok(created)
            }
            Err(e) => {
                savepoint.rollback().await.map_err(map_sqlx_error)?;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Transaction for SqliteUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        let Self { tx, hooks, .. } = *self;
        tx.commit().await.map_err(map_sqlx_error)?;
        hooks.run().await;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let Self { tx, hooks, .. } = *self;
        let dropped = hooks.discard();
        tx.rollback().await.map_err(map_sqlx_error)?;
        debug!(dropped, "Transaction rolled back");
        Ok(())
    }
}

#[async_trait]
impl OutboxTransaction for SqliteUnitOfWork {
    async fn mark_processed(&mut self, entry_id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE config_events SET processed_at = ? WHERE id = ? AND processed_at IS NULL",
        )
        .bind(self.time_provider.now_millis())
        .bind(entry_id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("unprocessed outbox entry {}", entry_id)));
        }
        Ok(())
    }

    fn as_scope(&mut self) -> &mut dyn CommitScope {
        self
    }
}
