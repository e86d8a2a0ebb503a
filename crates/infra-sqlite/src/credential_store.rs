// SQLite CredentialStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use confpush_core::domain::{Credentials, Device, DeviceConnection, DeviceId};
use confpush_core::error::{AppError, Result};
use confpush_core::port::{CredentialStore, IdProvider, TimeProvider};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::debug;

pub struct SqliteCredentialStore {
    pool: SqlitePool,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteCredentialStore {
    pub fn new(
        pool: SqlitePool,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            pool,
            id_provider,
            time_provider,
        }
    }

    /// Insert credentials
    pub async fn insert_credentials(&self, credentials: &Credentials) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO credentials (id, name, connector, organization_id, auto_add, params)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&credentials.id)
        .bind(&credentials.name)
        .bind(&credentials.connector)
        .bind(&credentials.organization_id)
        .bind(credentials.auto_add)
        .bind(credentials.params.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Associate a device with credentials explicitly
    pub async fn add_connection(
        &self,
        device_id: &DeviceId,
        credentials_id: &str,
    ) -> Result<DeviceConnection> {
        let id = self.id_provider.generate_id();
        let now = self.time_provider.now_millis();

        sqlx::query(
            r#"
            INSERT INTO device_connections (id, device_id, credentials_id, enabled, created_at)
            VALUES (?, ?, ?, 1, ?)
            "#,
        )
        .bind(&id)
        .bind(device_id.as_str())
        .bind(credentials_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        ConnectionRow {
            id,
            device_id: device_id.to_string(),
            credentials_id: credentials_id.to_string(),
            enabled: true,
            created_at: now,
        }
        .into_connection()
    }

    /// Connections of a device, oldest first
    pub async fn list_connections(&self, device_id: &DeviceId) -> Result<Vec<DeviceConnection>> {
        let rows = sqlx::query_as::<_, ConnectionRow>(
            r#"
            SELECT id, device_id, credentials_id, enabled, created_at
            FROM device_connections
            WHERE device_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(device_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(ConnectionRow::into_connection).collect()
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn count_connections(&self, device_id: &DeviceId) -> Result<u64> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        count_connections_on(&mut conn, device_id).await
    }

    async fn ensure_default_credentials(&self, device: &Device) -> Result<usize> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let created = attach_defaults_on(
            &mut tx,
            device,
            self.id_provider.as_ref(),
            self.time_provider.now_millis(),
        )
        .await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(created)
    }
}

/// Connection count for a device as seen by `conn`
pub(crate) async fn count_connections_on(
    conn: &mut SqliteConnection,
    device_id: &DeviceId,
) -> Result<u64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM device_connections WHERE device_id = ?")
            .bind(device_id.as_str())
            .fetch_one(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
    Ok(count.max(0) as u64)
}

/// Attach the default credentials of `device` on `conn`
///
/// The caller owns the transaction boundary.
pub(crate) async fn attach_defaults_on(
    conn: &mut SqliteConnection,
    device: &Device,
    id_provider: &dyn IdProvider,
    now: i64,
) -> Result<usize> {
    // A NULL organization only matches shared credentials
    let defaults: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT id FROM credentials
        WHERE auto_add = 1 AND (organization_id IS NULL OR organization_id = ?)
        ORDER BY rowid ASC
        "#,
    )
    .bind(&device.organization_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    let mut created = 0;
    for credentials_id in &defaults {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO device_connections
                (id, device_id, credentials_id, enabled, created_at)
            VALUES (?, ?, ?, 1, ?)
            "#,
        )
        .bind(id_provider.generate_id())
        .bind(device.id.as_str())
        .bind(credentials_id)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
        created += result.rows_affected() as usize;
    }

    debug!(
        device_id = %device.id,
        defaults = defaults.len(),
        created,
        "Default credentials ensured"
    );
    Ok(created)
}

#[derive(sqlx::FromRow)]
struct ConnectionRow {
    id: String,
    device_id: String,
    credentials_id: String,
    enabled: bool,
    created_at: i64,
}

impl ConnectionRow {
    fn into_connection(self) -> Result<DeviceConnection> {
        let created_at = chrono::DateTime::from_timestamp_millis(self.created_at)
            .ok_or_else(|| AppError::Internal(format!("bad timestamp {}", self.created_at)))?;
        Ok(DeviceConnection {
            id: self.id,
            device_id: DeviceId::new(self.device_id)?,
            credentials_id: self.credentials_id,
            enabled: self.enabled,
            created_at,
        })
    }
}
