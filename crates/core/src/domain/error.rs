// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid device id: {0:?}")]
    InvalidDeviceId(String),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Unknown job state: {0}")]
    UnknownJobState(String),

    #[error("Unknown event kind: {0}")]
    UnknownEventKind(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
