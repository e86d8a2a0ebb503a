// Credential auto-provisioning for newly created configuration records

use crate::application::events::EventHandler;
use crate::domain::{ConfigEvent, ConfigRecord, Device};
use crate::error::Result;
use crate::port::{CommitScope, CredentialStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Attaches default credentials to devices as their configuration appears
///
/// Pure bookkeeping on the side: a failure is logged and never reaches the
/// publisher, so the configuration record itself is unaffected.
pub struct CredentialProvisioner {
    store: Arc<dyn CredentialStore>,
}

impl CredentialProvisioner {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Ensure the record's device has its default credentials
    ///
    /// Returns the number of associations created (0 on repeat calls and
    /// on failure).
    pub async fn provision(&self, record: &ConfigRecord) -> usize {
        let device = &record.device;
        let result = self.store.ensure_default_credentials(device).await;
        Self::report(device, result)
    }

    /// Same as `provision`, but inside `scope` when it carries its own
    /// credential view, so the associations commit with the record
    pub async fn provision_within(
        &self,
        record: &ConfigRecord,
        scope: &mut dyn CommitScope,
    ) -> usize {
        let device = &record.device;
        let result = match scope.credentials() {
            Some(tx) => tx.ensure_default_credentials(device).await,
            None => self.store.ensure_default_credentials(device).await,
        };
        Self::report(device, result)
    }

    fn report(device: &Device, result: Result<usize>) -> usize {
        match result {
            Ok(0) => {
                debug!(device_id = %device.id, "Default credentials already present");
                0
            }
            Ok(created) => {
                info!(device_id = %device.id, created, "Default credentials attached");
                created
            }
            Err(e) => {
                warn!(device_id = %device.id, error = %e, "Credential auto-provisioning failed");
                0
            }
        }
    }
}

#[async_trait]
impl EventHandler for CredentialProvisioner {
    async fn handle(&self, event: &ConfigEvent, scope: &mut dyn CommitScope) -> Result<()> {
        if let ConfigEvent::RecordCreated { record } = event {
            self.provision_within(record, scope).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Credentials, Device, DeviceId};
    use crate::port::credential_store::mocks::{MockCredentialScope, MockCredentialStore};

    fn record(org: Option<&str>) -> ConfigRecord {
        let mut device = Device::new(DeviceId::new("dev-1").unwrap(), "ap-lobby");
        device.organization_id = org.map(str::to_string);
        ConfigRecord::new(device, "openwrt", chrono::Utc::now())
    }

    fn credentials(id: &str, org: Option<&str>) -> Credentials {
        Credentials {
            id: id.to_string(),
            name: format!("{} creds", id),
            connector: "ssh".to_string(),
            organization_id: org.map(str::to_string),
            auto_add: true,
            params: serde_json::json!({"username": "root"}),
        }
    }

    #[tokio::test]
    async fn test_first_creation_attaches_exactly_once() {
        let store = Arc::new(MockCredentialStore::new());
        store.add_credentials(credentials("shared", None));
        let provisioner = CredentialProvisioner::new(store.clone());
        let record = record(Some("org-a"));

        assert_eq!(provisioner.provision(&record).await, 1);
        assert_eq!(provisioner.provision(&record).await, 0);
        assert_eq!(store.connections_for(&record.device.id), vec!["shared"]);
    }

    #[tokio::test]
    async fn test_foreign_organization_credentials_skipped() {
        let store = Arc::new(MockCredentialStore::new());
        store.add_credentials(credentials("org-a-key", Some("org-a")));
        store.add_credentials(credentials("org-b-key", Some("org-b")));
        let provisioner = CredentialProvisioner::new(store.clone());
        let record = record(Some("org-a"));

        provisioner.provision(&record).await;
        assert_eq!(store.connections_for(&record.device.id), vec!["org-a-key"]);
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let store = Arc::new(MockCredentialStore::new());
        store.fail_with("disk full");
        let provisioner = CredentialProvisioner::new(store.clone());

        let event = ConfigEvent::RecordCreated { record: record(None) };
        let mut hooks = crate::application::CommitHooks::new();
        assert!(provisioner.handle(&event, &mut hooks).await.is_ok());
        assert_eq!(store.ensure_calls(), 1);
    }

    #[tokio::test]
    async fn test_other_events_ignored() {
        let store = Arc::new(MockCredentialStore::new());
        let provisioner = CredentialProvisioner::new(store.clone());

        let event = ConfigEvent::ConfigurationModified {
            device_id: DeviceId::new("dev-1").unwrap(),
        };
        let mut hooks = crate::application::CommitHooks::new();
        provisioner.handle(&event, &mut hooks).await.unwrap();
        assert_eq!(store.ensure_calls(), 0);
    }

    #[tokio::test]
    async fn test_scoped_provisioning_bypasses_store() {
        let store = Arc::new(MockCredentialStore::new());
        let provisioner = CredentialProvisioner::new(store.clone());
        let record = record(None);

        let mut scope = MockCredentialScope::new();
        let event = ConfigEvent::RecordCreated { record: record.clone() };
        provisioner.handle(&event, &mut scope).await.unwrap();

        assert_eq!(scope.ensured(), &[record.device.id.clone()]);
        assert_eq!(store.ensure_calls(), 0);
    }

    #[tokio::test]
    async fn test_scoped_failure_is_swallowed() {
        let store = Arc::new(MockCredentialStore::new());
        let provisioner = CredentialProvisioner::new(store);

        let mut scope = MockCredentialScope::new().failing("savepoint rolled back");
        assert_eq!(provisioner.provision_within(&record(None), &mut scope).await, 0);
    }
}
