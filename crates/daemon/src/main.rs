//! Confpush Daemon - Main Entry Point
//! Relays configuration events from the outbox into update_config jobs

mod config;

use anyhow::Result;
use config::{DaemonConfig, LogFormat};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use confpush_core::application::{
    register_connection_handlers, shutdown_channel, CredentialProvisioner, EventBus, EventRelay,
    UpdateDispatcher,
};
use confpush_core::port::id_provider::UuidProvider;
use confpush_core::port::time_provider::SystemTimeProvider;
use confpush_infra_sqlite::{
    create_pool, run_migrations, SqliteCredentialStore, SqliteJobQueue, SqliteOutbox,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("confpush=info"))?;

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config = DaemonConfig::from_env()?;
    init_logging(config.log_format)?;

    info!("Confpush daemon v{} starting...", confpush_core::VERSION);
    info!(db_path = %config.db_path, "Initializing database...");

    // 2. Database
    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let pool = create_pool(&config.db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 3. Wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);

    let job_queue = Arc::new(SqliteJobQueue::new(
        pool.clone(),
        id_provider.clone(),
        time_provider.clone(),
    ));
    let credential_store = Arc::new(SqliteCredentialStore::new(
        pool.clone(),
        id_provider,
        time_provider.clone(),
    ));

    let dispatcher = Arc::new(UpdateDispatcher::new(job_queue, credential_store.clone()));
    let provisioner = Arc::new(CredentialProvisioner::new(credential_store));

    let mut bus = EventBus::new();
    let subscribed = register_connection_handlers(&mut bus, dispatcher, provisioner);
    info!(subscribed, "Event handlers registered");

    // 4. Relay
    let outbox = Arc::new(SqliteOutbox::new(pool.clone(), time_provider));
    let relay = EventRelay::new(outbox, Arc::new(bus), config.relay.clone());
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let relay_handle = tokio::spawn(async move {
        if let Err(e) = relay.run(shutdown_rx).await {
            tracing::error!(error = ?e, "Event relay failed");
        }
    });

    info!("System ready. Waiting for configuration events...");

    // 5. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    shutdown_tx.shutdown();
    if tokio::time::timeout(SHUTDOWN_GRACE, relay_handle).await.is_err() {
        tracing::warn!("Event relay did not stop in time");
    }
    pool.close().await;

    info!("Shutdown complete.");
    Ok(())
}
