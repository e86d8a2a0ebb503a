// Update Dispatcher - turns configuration changes into update_config jobs

use crate::application::events::EventHandler;
use crate::domain::{ConfigEvent, DeviceId, EnqueueOutcome, JobId, JobKind, WorkerId};
use crate::error::Result;
use crate::port::{CommitFuture, CommitScope, CredentialStore, JobQueue};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What `try_dispatch` decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A new update job was submitted
    Enqueued(JobId),
    /// The queue folded the request into a job that is still pending
    Coalesced(JobId),
    /// A worker is already pushing configuration to this device
    AlreadyInProgress { worker: WorkerId, job_id: JobId },
}

/// Keeps at most one update job in flight per device, on a best-effort basis
///
/// The active-job check and the enqueue are not atomic: two changes close
/// together can both pass the check. Device updates are idempotent, so a
/// duplicate push is accepted.
#[derive(Clone)]
pub struct UpdateDispatcher {
    job_queue: Arc<dyn JobQueue>,
    credential_store: Arc<dyn CredentialStore>,
}

impl UpdateDispatcher {
    pub fn new(job_queue: Arc<dyn JobQueue>, credential_store: Arc<dyn CredentialStore>) -> Self {
        Self {
            job_queue,
            credential_store,
        }
    }

    /// React to a configuration change
    ///
    /// Devices without any connection are skipped. Otherwise `try_dispatch`
    /// is deferred until `scope` commits, so the job never observes
    /// uncommitted state. Returns whether a dispatch was scheduled.
    pub fn on_configuration_modified(
        &self,
        device_id: &DeviceId,
        has_connection: bool,
        scope: &mut dyn CommitScope,
    ) -> bool {
        if !has_connection {
            debug!(device_id = %device_id, "No connection configured, skipping update");
            return false;
        }

        let dispatcher = self.clone();
        let device_id = device_id.clone();
        scope.on_commit(Box::new(move || -> CommitFuture {
            Box::pin(async move {
                if let Err(e) = dispatcher.try_dispatch(&device_id).await {
                    error!(device_id = %device_id, error = %e, "Failed to dispatch update_config");
                }
            })
        }));
        true
    }

    /// Enqueue an update job unless one is already running for the device
    ///
    /// # Errors
    /// Enqueue failures are returned as-is; nothing is retried here.
    pub async fn try_dispatch(&self, device_id: &DeviceId) -> Result<DispatchOutcome> {
        if let Some((worker, job_id)) = self.update_in_progress(device_id).await {
            info!(
                device_id = %device_id,
                worker = %worker,
                job_id = %job_id,
                "Update already in progress, not enqueueing another"
            );
            return Ok(DispatchOutcome::AlreadyInProgress { worker, job_id });
        }

        let job = JobKind::update_config(device_id.clone());
        let outcome = match self.job_queue.enqueue(&job).await? {
            EnqueueOutcome::Enqueued(job_id) => {
                info!(device_id = %device_id, job_id = %job_id, "update_config enqueued");
                DispatchOutcome::Enqueued(job_id)
            }
            EnqueueOutcome::Coalesced(job_id) => {
                debug!(device_id = %device_id, job_id = %job_id, "update_config already pending");
                DispatchOutcome::Coalesced(job_id)
            }
        };
        Ok(outcome)
    }

    /// Worker and job id of an in-flight update for the device, if any
    ///
    /// Fails open: an unreachable broker counts as "nothing in progress".
    async fn update_in_progress(&self, device_id: &DeviceId) -> Option<(WorkerId, JobId)> {
        let snapshot = match self.job_queue.inspect_active().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    device_id = %device_id,
                    error = %e,
                    "Active job inspection failed, assuming no update in progress"
                );
                return None;
            }
        };

        if snapshot.is_empty() {
            return None;
        }

        snapshot
            .find_update_for(device_id)
            .map(|(worker, job)| (worker.clone(), job.id.clone()))
    }
}

#[async_trait]
impl EventHandler for UpdateDispatcher {
    async fn handle(&self, event: &ConfigEvent, scope: &mut dyn CommitScope) -> Result<()> {
        let ConfigEvent::ConfigurationModified { device_id } = event else {
            return Ok(());
        };
        let connections = match scope.credentials() {
            Some(tx) => tx.count_connections(device_id).await?,
            None => self.credential_store.count_connections(device_id).await?,
        };
        self.on_configuration_modified(device_id, connections > 0, scope);
        Ok(())
    }
}
