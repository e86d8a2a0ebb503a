//! Shared fixture: a migrated SQLite database with every adapter wired to a bus

#![allow(dead_code)]

use std::sync::Arc;

use confpush_core::application::{
    register_connection_handlers, CredentialProvisioner, EventBus, UpdateDispatcher,
};
use confpush_core::domain::{Credentials, DeviceId};
use confpush_core::port::id_provider::UuidProvider;
use confpush_core::port::time_provider::SystemTimeProvider;
use confpush_infra_sqlite::{
    create_pool, run_migrations, SqliteCredentialStore, SqliteJobQueue, SqliteOutbox,
    SqliteUnitOfWork,
};
use sqlx::SqlitePool;

pub struct Harness {
    pub pool: SqlitePool,
    pub queue: Arc<SqliteJobQueue>,
    pub store: Arc<SqliteCredentialStore>,
    pub outbox: Arc<SqliteOutbox>,
    pub dispatcher: Arc<UpdateDispatcher>,
    pub bus: Arc<EventBus>,
    _dir: tempfile::TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confpush.db");
        let pool = create_pool(path.to_str().unwrap()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let time = Arc::new(SystemTimeProvider);
        let ids = Arc::new(UuidProvider);
        let queue = Arc::new(SqliteJobQueue::new(pool.clone(), ids.clone(), time.clone()));
        let store = Arc::new(SqliteCredentialStore::new(pool.clone(), ids, time.clone()));
        let outbox = Arc::new(SqliteOutbox::new(pool.clone(), time));

        let dispatcher = Arc::new(UpdateDispatcher::new(queue.clone(), store.clone()));
        let provisioner = Arc::new(CredentialProvisioner::new(store.clone()));
        let mut bus = EventBus::new();
        register_connection_handlers(&mut bus, dispatcher.clone(), provisioner);

        Self {
            pool,
            queue,
            store,
            outbox,
            dispatcher,
            bus: Arc::new(bus),
            _dir: dir,
        }
    }

    pub async fn begin(&self) -> SqliteUnitOfWork {
        SqliteUnitOfWork::begin(&self.pool, Arc::new(SystemTimeProvider))
            .await
            .unwrap()
    }

    /// Credentials with a manual connection to `device`
    pub async fn connect(&self, device: &DeviceId) {
        let credentials_id = format!("manual-{}", device);
        self.store
            .insert_credentials(&credentials(&credentials_id, None, false))
            .await
            .unwrap();
        self.store
            .add_connection(device, &credentials_id)
            .await
            .unwrap();
    }
}

pub fn device(id: &str) -> DeviceId {
    DeviceId::new(id).unwrap()
}

pub fn credentials(id: &str, organization: Option<&str>, auto_add: bool) -> Credentials {
    Credentials {
        id: id.to_string(),
        name: id.to_string(),
        connector: "ssh".to_string(),
        organization_id: organization.map(str::to_string),
        auto_add,
        params: serde_json::json!({"username": "root", "password": "secret"}),
    }
}
