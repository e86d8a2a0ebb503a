// Credentials Domain Model

use crate::domain::{Device, DeviceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection credentials (SSH keys, passwords, ...) usable by update jobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub id: String,
    pub name: String,
    /// Connector the credentials are meant for (e.g. "ssh")
    pub connector: String,
    /// `None` means shared across all organizations
    pub organization_id: Option<String>,
    /// Attach automatically to every new device in scope
    pub auto_add: bool,
    /// Connector parameters, stored opaque
    pub params: serde_json::Value,
}

impl Credentials {
    /// Whether these credentials are a default for `device`
    ///
    /// Defaults are `auto_add` credentials that are either shared or
    /// belong to the device's organization.
    pub fn is_default_for(&self, device: &Device) -> bool {
        if !self.auto_add {
            return false;
        }
        match &self.organization_id {
            None => true,
            Some(org) => device.organization_id.as_deref() == Some(org.as_str()),
        }
    }
}

/// Association of a device with credentials (one transport to push through)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConnection {
    pub id: String,
    pub device_id: DeviceId,
    pub credentials_id: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}
