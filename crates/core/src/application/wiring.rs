// One-time registration of the connection handlers on the event bus

use crate::application::dispatcher::UpdateDispatcher;
use crate::application::events::EventBus;
use crate::application::provisioning::CredentialProvisioner;
use crate::domain::EventKind;
use std::sync::Arc;

/// Subscription uid of the update dispatcher
pub const UPDATE_CONFIG_UID: &str = "connection.update_config";

/// Subscription uid of the credential provisioner
pub const AUTO_ADD_CREDENTIALS_UID: &str = "connection.auto_add_credentials";

/// Connect `configuration_modified` to the dispatcher and `record_created`
/// to the credential provisioner
///
/// Safe to call repeatedly; returns how many handlers were newly added.
pub fn register_connection_handlers(
    bus: &mut EventBus,
    dispatcher: Arc<UpdateDispatcher>,
    provisioner: Arc<CredentialProvisioner>,
) -> usize {
    let mut added = 0;
    if bus.subscribe(UPDATE_CONFIG_UID, EventKind::ConfigurationModified, dispatcher) {
        added += 1;
    }
    if bus.subscribe(AUTO_ADD_CREDENTIALS_UID, EventKind::RecordCreated, provisioner) {
        added += 1;
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::credential_store::mocks::MockCredentialStore;
    use crate::port::job_queue::mocks::MockJobQueue;

    #[test]
    fn test_registration_is_idempotent() {
        let store = Arc::new(MockCredentialStore::new());
        let dispatcher = Arc::new(UpdateDispatcher::new(
            Arc::new(MockJobQueue::new_idle()),
            store.clone(),
        ));
        let provisioner = Arc::new(CredentialProvisioner::new(store));
        let mut bus = EventBus::new();

        assert_eq!(
            register_connection_handlers(&mut bus, dispatcher.clone(), provisioner.clone()),
            2
        );
        assert_eq!(register_connection_handlers(&mut bus, dispatcher, provisioner), 0);
        assert_eq!(bus.subscriber_count(EventKind::ConfigurationModified), 1);
        assert_eq!(bus.subscriber_count(EventKind::RecordCreated), 1);
    }
}
