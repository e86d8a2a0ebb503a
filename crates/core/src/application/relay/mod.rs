// Event Relay - moves committed outbox events onto the event bus

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::events::EventBus;
use crate::error::{AppError, Result};
use crate::port::{EventOutbox, OutboxTransaction, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Relay tuning
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub batch_size: usize,
    pub idle_sleep: Duration,
    pub error_sleep: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            idle_sleep: IDLE_SLEEP_DURATION,
            error_sleep: ERROR_RECOVERY_SLEEP_DURATION,
        }
    }
}

/// Polls the outbox and publishes each entry inside its own unit of work
///
/// Post-commit work registered by handlers runs when the entry is marked
/// processed, so a crash before that point replays the entry instead of
/// losing it. A handler failure rolls the entry back for the same reason.
pub struct EventRelay {
    outbox: Arc<dyn EventOutbox>,
    bus: Arc<EventBus>,
    config: RelayConfig,
}

impl EventRelay {
    pub fn new(outbox: Arc<dyn EventOutbox>, bus: Arc<EventBus>, config: RelayConfig) -> Self {
        Self {
            outbox,
            bus,
            config,
        }
    }

    /// Run relay loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(batch_size = self.config.batch_size, "Event relay started");
        loop {
            if shutdown.is_shutdown() {
                info!("Event relay shutting down");
                break;
            }
            let pause = match self.relay_once().await {
                Ok(0) => self.config.idle_sleep,
                Ok(_) => continue,
                Err(e) => {
                    error!(error = %e, "Event relay error");
                    self.config.error_sleep
                }
            };
            tokio::select! {
                _ = sleep(pause) => {},
                _ = shutdown.wait() => {
                    info!("Event relay interrupted while waiting");
                    break;
                }
            }
        }
        info!("Event relay stopped");
        Ok(())
    }

    /// Relay one batch; returns how many events were published
    ///
    /// Entries that cannot be decoded are marked processed and skipped. If
    /// any handler fails, the entry's unit of work is rolled back and the
    /// error returned; the entry stays in the outbox for the next attempt.
    pub async fn relay_once(&self) -> Result<usize> {
        let batch = self.outbox.next_batch(self.config.batch_size).await?;
        let mut relayed = 0;

        for entry in batch {
            let mut tx = self.outbox.begin().await?;

            match entry.decode() {
                Ok(event) => {
                    let report = self.bus.publish(&event, tx.as_scope()).await;
                    if !report.all_succeeded() {
                        tx.rollback().await?;
                        return Err(AppError::Delivery(format!(
                            "{} of {} handlers failed for outbox entry {}",
                            report.failed, report.invoked, entry.id
                        )));
                    }
                    debug!(
                        entry_id = entry.id,
                        kind = %event.kind(),
                        device_id = %event.device_id(),
                        handlers = report.invoked,
                        "Outbox event published"
                    );
                    relayed += 1;
                }
                Err(e) => {
                    warn!(entry_id = entry.id, kind = %entry.kind, error = %e, "Skipping undecodable outbox entry");
                }
            }

            if let Err(e) = tx.mark_processed(entry.id).await {
                tx.rollback().await?;
                return Err(e);
            }
            tx.commit().await?;
        }

        Ok(relayed)
    }
}
