//! Outbox relay end to end: events written with a change are relayed
//! exactly once and turn into jobs after the relay commits.

mod common;

use std::time::Duration;

use common::{credentials, device, Harness};
use confpush_core::application::{shutdown_channel, EventRelay, RelayConfig};
use confpush_core::domain::{ConfigEvent, ConfigRecord, Device, JobState};
use confpush_core::port::{CredentialStore, Transaction};

fn relay(h: &Harness) -> EventRelay {
    let config = RelayConfig {
        batch_size: 10,
        idle_sleep: Duration::from_millis(10),
        error_sleep: Duration::from_millis(10),
    };
    EventRelay::new(h.outbox.clone(), h.bus.clone(), config)
}

#[tokio::test]
async fn test_committed_events_are_relayed_once() {
    let h = Harness::new().await;
    h.store
        .insert_credentials(&credentials("default-ssh", None, true))
        .await
        .unwrap();
    let ap = Device::new(device("ap-1"), "lobby");

    let mut uow = h.begin().await;
    uow.record_event(&ConfigEvent::RecordCreated {
        record: ConfigRecord::new(ap.clone(), "openwrt", chrono::Utc::now()),
    })
    .await
    .unwrap();
    uow.record_event(&ConfigEvent::ConfigurationModified {
        device_id: ap.id.clone(),
    })
    .await
    .unwrap();
    Box::new(uow).commit().await.unwrap();

    let relay = relay(&h);
    assert_eq!(relay.relay_once().await.unwrap(), 2);
    assert_eq!(h.outbox.pending_count().await.unwrap(), 0);
    assert_eq!(h.store.count_connections(&ap.id).await.unwrap(), 1);
    assert_eq!(h.queue.count_by_state(JobState::Pending).await.unwrap(), 1);

    assert_eq!(relay.relay_once().await.unwrap(), 0);
    assert_eq!(h.queue.count_by_state(JobState::Pending).await.unwrap(), 1);
}

#[tokio::test]
async fn test_rolled_back_events_are_never_relayed() {
    let h = Harness::new().await;
    h.connect(&device("42")).await;

    let mut uow = h.begin().await;
    uow.record_event(&ConfigEvent::ConfigurationModified {
        device_id: device("42"),
    })
    .await
    .unwrap();
    Box::new(uow).rollback().await.unwrap();

    assert_eq!(relay(&h).relay_once().await.unwrap(), 0);
    assert_eq!(h.queue.count_by_state(JobState::Pending).await.unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_row_is_skipped() {
    let h = Harness::new().await;
    sqlx::query(
        "INSERT INTO config_events (kind, device_id, payload, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind("device_deleted")
    .bind("42")
    .bind("{}")
    .bind(0_i64)
    .execute(&h.pool)
    .await
    .unwrap();

    assert_eq!(relay(&h).relay_once().await.unwrap(), 0);
    assert_eq!(h.outbox.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_running_relay_picks_up_new_events() {
    let h = Harness::new().await;
    h.connect(&device("42")).await;

    let relay = relay(&h);
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let handle = tokio::spawn(async move { relay.run(shutdown_rx).await });

    h.outbox
        .record_now(&ConfigEvent::ConfigurationModified {
            device_id: device("42"),
        })
        .await
        .unwrap();

    let mut enqueued = false;
    for _ in 0..100 {
        if h.queue.count_by_state(JobState::Pending).await.unwrap() == 1 {
            enqueued = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(enqueued, "relay never dispatched the event");

    shutdown_tx.shutdown();
    let stopped = tokio::time::timeout(Duration::from_secs(2), handle).await;
    assert!(stopped.expect("relay did not stop").unwrap().is_ok());
}
