// Device Domain Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque device identifier
///
/// Only ever used as a correlation token between configuration events,
/// the active-job check and the arguments of an enqueued job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device id, rejecting blank values
    pub fn new(id: impl Into<String>) -> crate::domain::error::Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(crate::domain::DomainError::InvalidDeviceId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<uuid::Uuid> for DeviceId {
    fn from(id: uuid::Uuid) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for DeviceId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Managed network device (the subset this crate needs)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    /// Owning organization; `None` for devices outside any tenant
    pub organization_id: Option<String>,
}

impl Device {
    pub fn new(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            organization_id: None,
        }
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }
}

/// Configuration record as announced by the configuration store on creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub device: Device,
    /// Firmware backend the configuration is rendered for (e.g. "openwrt")
    pub backend: String,
    pub created_at: DateTime<Utc>,
}

impl ConfigRecord {
    pub fn new(device: Device, backend: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            device,
            backend: backend.into(),
            created_at,
        }
    }
}
