// Job Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::DeviceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Job ID (UUID v4 for jobs created by the SQLite queue)
pub type JobId = String;

/// Identity of a queue worker as reported by introspection
pub type WorkerId = String;

/// Wire name of the configuration push job
pub const UPDATE_CONFIG: &str = "update_config";

/// Typed job descriptor
///
/// The string name only exists at the queue boundary; everything inside
/// the crate matches on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Push the current configuration to a device
    UpdateConfig { device_id: DeviceId },
}

impl JobKind {
    pub fn update_config(device_id: DeviceId) -> Self {
        JobKind::UpdateConfig { device_id }
    }

    /// Name under which the queue knows this job
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::UpdateConfig { .. } => UPDATE_CONFIG,
        }
    }

    /// Positional arguments as serialized for the queue
    pub fn args(&self) -> Vec<serde_json::Value> {
        match self {
            JobKind::UpdateConfig { device_id } => {
                vec![serde_json::Value::String(device_id.to_string())]
            }
        }
    }

    /// Key identifying logically identical jobs (native queue dedup)
    pub fn dedup_key(&self) -> String {
        match self {
            JobKind::UpdateConfig { device_id } => format!("{}:{}", UPDATE_CONFIG, device_id),
        }
    }

    /// Rebuild a descriptor from its queue representation
    pub fn from_parts(name: &str, args: &[serde_json::Value]) -> Result<Self> {
        match (name, args) {
            (UPDATE_CONFIG, [arg]) => {
                let device_id = DeviceId::new(arg_as_string(arg))?;
                Ok(JobKind::UpdateConfig { device_id })
            }
            (UPDATE_CONFIG, _) => Err(DomainError::ValidationError(format!(
                "{} expects exactly one argument, got {}",
                UPDATE_CONFIG,
                args.len()
            ))),
            _ => Err(DomainError::UnknownJob(name.to_string())),
        }
    }
}

/// Render a job argument the way device ids are compared
///
/// JSON strings compare by content, every other value by its JSON text,
/// so `42` and `"42"` both match device `42`.
fn arg_as_string(arg: &serde_json::Value) -> String {
    match arg {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Queue-side job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Active,
    Done,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "PENDING"),
            JobState::Active => write!(f, "ACTIVE"),
            JobState::Done => write!(f, "DONE"),
            JobState::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for JobState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(JobState::Pending),
            "ACTIVE" => Ok(JobState::Active),
            "DONE" => Ok(JobState::Done),
            "FAILED" => Ok(JobState::Failed),
            other => Err(DomainError::UnknownJobState(other.to_string())),
        }
    }
}

/// Job as persisted by a queue adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub id: JobId,
    pub kind: JobKind,
    pub state: JobState,
    pub worker_id: Option<WorkerId>,
    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
}

/// Result of handing a job to the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new job was created
    Enqueued(JobId),
    /// An equivalent job was still pending; no new job was created
    Coalesced(JobId),
}

impl EnqueueOutcome {
    pub fn job_id(&self) -> &JobId {
        match self {
            EnqueueOutcome::Enqueued(id) | EnqueueOutcome::Coalesced(id) => id,
        }
    }
}

/// A job a worker reports as currently executing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveJob {
    pub id: JobId,
    pub name: String,
    pub args: Vec<serde_json::Value>,
}

impl ActiveJob {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Vec<serde_json::Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// Whether this is a configuration push for `device_id`
    pub fn is_update_for(&self, device_id: &DeviceId) -> bool {
        self.name == UPDATE_CONFIG
            && self
                .args
                .iter()
                .any(|arg| arg_as_string(arg) == device_id.as_str())
    }
}

/// Point-in-time view of in-flight jobs per worker
///
/// Advisory only: it can be stale by the time it is read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveJobSnapshot {
    workers: BTreeMap<WorkerId, Vec<ActiveJob>>,
}

impl ActiveJobSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, worker: impl Into<String>, job: ActiveJob) {
        self.workers.entry(worker.into()).or_default().push(job);
    }

    pub fn with_job(mut self, worker: impl Into<String>, job: ActiveJob) -> Self {
        self.insert(worker, job);
        self
    }

    /// True when no worker reported anything
    pub fn is_empty(&self) -> bool {
        self.workers.values().all(Vec::is_empty)
    }

    pub fn workers(&self) -> impl Iterator<Item = (&WorkerId, &[ActiveJob])> {
        self.workers.iter().map(|(w, jobs)| (w, jobs.as_slice()))
    }

    /// First in-flight configuration push for `device_id`, with its worker
    pub fn find_update_for(&self, device_id: &DeviceId) -> Option<(&WorkerId, &ActiveJob)> {
        self.workers.iter().find_map(|(worker, jobs)| {
            jobs.iter()
                .find(|job| job.is_update_for(device_id))
                .map(|job| (worker, job))
        })
    }
}
