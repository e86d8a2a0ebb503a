// Domain Layer - Pure business logic and entities

pub mod credentials;
pub mod device;
pub mod error;
pub mod event;
pub mod job;

// Re-exports
pub use credentials::{Credentials, DeviceConnection};
pub use device::{ConfigRecord, Device, DeviceId};
pub use error::DomainError;
pub use event::{ConfigEvent, EventKind};
pub use job::{
    ActiveJob, ActiveJobSnapshot, EnqueueOutcome, JobId, JobKind, JobState, QueuedJob, WorkerId,
    UPDATE_CONFIG,
};
