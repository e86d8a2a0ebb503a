// Credential Store Port (Interface)

use crate::domain::{Device, DeviceId};
use crate::error::Result;
use async_trait::async_trait;

/// Device credentials and connections
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Number of connections configured for a device
    async fn count_connections(&self, device_id: &DeviceId) -> Result<u64>;

    /// Attach every default credential to `device`
    ///
    /// Idempotent: existing associations are left alone. Returns how many
    /// associations were created by this call.
    async fn ensure_default_credentials(&self, device: &Device) -> Result<usize>;
}

/// Credential operations bound to an open unit of work
///
/// Reads see the unit of work's uncommitted writes, and writes become
/// durable with it. A failed `ensure_default_credentials` leaves the rest
/// of the unit of work intact.
#[async_trait]
pub trait CredentialTransaction: Send {
    async fn count_connections(&mut self, device_id: &DeviceId) -> Result<u64>;

    async fn ensure_default_credentials(&mut self, device: &Device) -> Result<usize>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::Credentials;
    use crate::error::AppError;
    use crate::port::{CommitCallback, CommitScope};
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::{Arc, Mutex};

    /// In-memory credential store
    #[derive(Default)]
    pub struct MockCredentialStore {
        credentials: Arc<Mutex<Vec<Credentials>>>,
        connections: Arc<Mutex<BTreeSet<(DeviceId, String)>>>,
        failure: Arc<Mutex<Option<String>>>,
        ensure_calls: Arc<Mutex<usize>>,
    }

    impl MockCredentialStore {
        pub fn new() -> Self {
            Self::default()
        }
        pub fn add_credentials(&self, credentials: Credentials) {
            self.credentials.lock().unwrap().push(credentials);
        }
        pub fn add_connection(&self, device_id: &DeviceId, credentials_id: impl Into<String>) {
            self.connections
                .lock()
                .unwrap()
                .insert((device_id.clone(), credentials_id.into()));
        }
        pub fn connections_for(&self, device_id: &DeviceId) -> Vec<String> {
            self.connections
                .lock()
                .unwrap()
                .iter()
                .filter(|(d, _)| d == device_id)
                .map(|(_, c)| c.clone())
                .collect()
        }
        /// Make every call fail with `message`
        pub fn fail_with(&self, message: impl Into<String>) {
            *self.failure.lock().unwrap() = Some(message.into());
        }
        pub fn recover(&self) {
            *self.failure.lock().unwrap() = None;
        }
        pub fn ensure_calls(&self) -> usize {
            *self.ensure_calls.lock().unwrap()
        }
        fn check_failure(&self) -> Result<()> {
            match self.failure.lock().unwrap().clone() {
                Some(msg) => Err(AppError::Credentials(msg)),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl CredentialStore for MockCredentialStore {
        async fn count_connections(&self, device_id: &DeviceId) -> Result<u64> {
            self.check_failure()?;
            Ok(self.connections_for(device_id).len() as u64)
        }

        async fn ensure_default_credentials(&self, device: &Device) -> Result<usize> {
            *self.ensure_calls.lock().unwrap() += 1;
            self.check_failure()?;

            let defaults: Vec<String> = self
                .credentials
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.is_default_for(device))
                .map(|c| c.id.clone())
                .collect();

            let mut connections = self.connections.lock().unwrap();
            let created = defaults
                .into_iter()
                .filter(|id| connections.insert((device.id.clone(), id.clone())))
                .count();
            Ok(created)
        }
    }

    /// Commit scope with its own credential view, standing in for a
    /// database unit of work
    #[derive(Default)]
    pub struct MockCredentialScope {
        connections: BTreeMap<DeviceId, u64>,
        failure: Option<String>,
        ensured: Vec<DeviceId>,
        callbacks: Vec<CommitCallback>,
    }

    impl MockCredentialScope {
        pub fn new() -> Self {
            Self::default()
        }
        pub fn with_connections(mut self, device_id: &DeviceId, count: u64) -> Self {
            self.connections.insert(device_id.clone(), count);
            self
        }
        pub fn failing(mut self, message: impl Into<String>) -> Self {
            self.failure = Some(message.into());
            self
        }
        pub fn ensured(&self) -> &[DeviceId] {
            &self.ensured
        }
        pub fn hook_count(&self) -> usize {
            self.callbacks.len()
        }
        pub async fn commit(self) {
            for callback in self.callbacks {
                callback().await;
            }
        }
    }

    impl CommitScope for MockCredentialScope {
        fn on_commit(&mut self, callback: CommitCallback) {
            self.callbacks.push(callback);
        }

        fn credentials(&mut self) -> Option<&mut dyn CredentialTransaction> {
            Some(self as &mut dyn CredentialTransaction)
        }
    }

    #[async_trait]
    impl CredentialTransaction for MockCredentialScope {
        async fn count_connections(&mut self, device_id: &DeviceId) -> Result<u64> {
            if let Some(msg) = &self.failure {
                return Err(AppError::Credentials(msg.clone()));
            }
            Ok(self.connections.get(device_id).copied().unwrap_or(0))
        }

        async fn ensure_default_credentials(&mut self, device: &Device) -> Result<usize> {
            if let Some(msg) = &self.failure {
                return Err(AppError::Credentials(msg.clone()));
            }
            self.ensured.push(device.id.clone());
            let count = self.connections.entry(device.id.clone()).or_insert(0);
            if *count == 0 {
                *count = 1;
                return Ok(1);
            }
            Ok(0)
        }
    }
}
