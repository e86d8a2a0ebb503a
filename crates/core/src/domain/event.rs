// Configuration Events

use crate::domain::error::{DomainError, Result};
use crate::domain::{ConfigRecord, DeviceId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event emitted by the configuration store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigEvent {
    /// A device's configuration changed (fired once the change is committed)
    ConfigurationModified { device_id: DeviceId },
    /// A new configuration record was persisted
    RecordCreated { record: ConfigRecord },
}

impl ConfigEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ConfigEvent::ConfigurationModified { .. } => EventKind::ConfigurationModified,
            ConfigEvent::RecordCreated { .. } => EventKind::RecordCreated,
        }
    }

    /// Device the event is about
    pub fn device_id(&self) -> &DeviceId {
        match self {
            ConfigEvent::ConfigurationModified { device_id } => device_id,
            ConfigEvent::RecordCreated { record } => &record.device.id,
        }
    }
}

/// Event discriminant used for subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ConfigurationModified,
    RecordCreated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ConfigurationModified => "configuration_modified",
            EventKind::RecordCreated => "record_created",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "configuration_modified" => Ok(EventKind::ConfigurationModified),
            "record_created" => Ok(EventKind::RecordCreated),
            other => Err(DomainError::UnknownEventKind(other.to_string())),
        }
    }
}
