//! Credential auto-provisioning against the SQLite credential store

mod common;

use common::{credentials, device, Harness};
use confpush_core::domain::{ConfigEvent, ConfigRecord, Device, JobState};
use confpush_core::port::{CredentialStore, Transaction};

fn created(device: Device) -> ConfigEvent {
    ConfigEvent::RecordCreated {
        record: ConfigRecord::new(device, "openwrt", chrono::Utc::now()),
    }
}

#[tokio::test]
async fn test_first_record_attaches_defaults_once() {
    let h = Harness::new().await;
    h.store
        .insert_credentials(&credentials("default-ssh", None, true))
        .await
        .unwrap();
    let ap = Device::new(device("ap-1"), "lobby");

    h.bus.publish_autocommit(&created(ap.clone())).await;
    assert_eq!(h.store.count_connections(&ap.id).await.unwrap(), 1);

    h.bus.publish_autocommit(&created(ap.clone())).await;
    assert_eq!(h.store.count_connections(&ap.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_only_shared_and_own_organization_credentials() {
    let h = Harness::new().await;
    for (id, org) in [("shared", None), ("acme", Some("acme")), ("globex", Some("globex"))] {
        h.store
            .insert_credentials(&credentials(id, org, true))
            .await
            .unwrap();
    }
    let ap = Device::new(device("ap-1"), "lobby").with_organization("acme");

    h.bus.publish_autocommit(&created(ap.clone())).await;

    let mut attached: Vec<String> = h
        .store
        .list_connections(&ap.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.credentials_id)
        .collect();
    attached.sort();
    assert_eq!(attached, vec!["acme", "shared"]);
}

#[tokio::test]
async fn test_provisioned_device_receives_updates() {
    let h = Harness::new().await;
    h.store
        .insert_credentials(&credentials("default-ssh", None, true))
        .await
        .unwrap();
    let ap = Device::new(device("ap-1"), "lobby");
    let modified = ConfigEvent::ConfigurationModified {
        device_id: ap.id.clone(),
    };

    // Before provisioning there is nothing to push through
    h.bus.publish_autocommit(&modified).await;
    assert_eq!(h.queue.count_by_state(JobState::Pending).await.unwrap(), 0);

    h.bus.publish_autocommit(&created(ap)).await;
    h.bus.publish_autocommit(&modified).await;
    assert_eq!(h.queue.count_by_state(JobState::Pending).await.unwrap(), 1);
}

#[tokio::test]
async fn test_record_created_inside_open_transaction() {
    let h = Harness::new().await;
    h.store
        .insert_credentials(&credentials("default-ssh", None, true))
        .await
        .unwrap();
    let ap = Device::new(device("ap-1"), "lobby");
    let record_created = created(ap.clone());
    let modified = ConfigEvent::ConfigurationModified {
        device_id: ap.id.clone(),
    };

    // The writer already holds the write lock when handlers run
    let mut uow = h.begin().await;
    uow.record_event(&record_created).await.unwrap();
    assert!(h.bus.publish(&record_created, &mut uow).await.all_succeeded());
    assert!(h.bus.publish(&modified, &mut uow).await.all_succeeded());
    assert_eq!(h.store.count_connections(&ap.id).await.unwrap(), 0);
    assert_eq!(uow.pending_hooks(), 1);

    Box::new(uow).commit().await.unwrap();

    assert_eq!(h.store.count_connections(&ap.id).await.unwrap(), 1);
    assert_eq!(h.queue.count_by_state(JobState::Pending).await.unwrap(), 1);
}

#[tokio::test]
async fn test_rolled_back_record_leaves_no_credentials() {
    let h = Harness::new().await;
    h.store
        .insert_credentials(&credentials("default-ssh", None, true))
        .await
        .unwrap();
    let ap = Device::new(device("ap-1"), "lobby");
    let record_created = created(ap.clone());

    let mut uow = h.begin().await;
    uow.record_event(&record_created).await.unwrap();
    h.bus.publish(&record_created, &mut uow).await;
    Box::new(uow).rollback().await.unwrap();

    assert_eq!(h.store.count_connections(&ap.id).await.unwrap(), 0);
}
