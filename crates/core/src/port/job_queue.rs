// Job Queue Port (Interface)

use crate::domain::{ActiveJobSnapshot, EnqueueOutcome, JobKind};
use crate::error::Result;
use async_trait::async_trait;

/// Asynchronous job queue with worker introspection
///
/// Implementations:
/// - SqliteJobQueue: jobs table shared with external workers
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Jobs every worker currently reports as executing
    ///
    /// # Errors
    /// Any broker or transport failure. Callers decide whether to fail open.
    async fn inspect_active(&self) -> Result<ActiveJobSnapshot>;

    /// Submit a job for asynchronous execution (fire-and-forget)
    ///
    /// Returns as soon as the queue accepted the job; never waits for it to
    /// start or finish.
    async fn enqueue(&self, job: &JobKind) -> Result<EnqueueOutcome>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::{Arc, Mutex};

    /// Mock introspection behavior
    #[derive(Debug, Clone)]
    pub enum InspectBehavior {
        /// Report this snapshot
        Snapshot(ActiveJobSnapshot),
        /// Fail with message (broker unreachable)
        Fail(String),
    }

    /// Mock Job Queue recording every enqueue
    pub struct MockJobQueue {
        inspect: Arc<Mutex<InspectBehavior>>,
        enqueue_failure: Arc<Mutex<Option<String>>>,
        enqueued: Arc<Mutex<Vec<JobKind>>>,
        inspect_count: Arc<Mutex<usize>>,
    }

    impl MockJobQueue {
        pub fn new(inspect: InspectBehavior) -> Self {
            Self {
                inspect: Arc::new(Mutex::new(inspect)),
                enqueue_failure: Arc::new(Mutex::new(None)),
                enqueued: Arc::new(Mutex::new(Vec::new())),
                inspect_count: Arc::new(Mutex::new(0)),
            }
        }
        pub fn new_idle() -> Self {
            Self::new(InspectBehavior::Snapshot(ActiveJobSnapshot::new()))
        }
        pub fn with_snapshot(snapshot: ActiveJobSnapshot) -> Self {
            Self::new(InspectBehavior::Snapshot(snapshot))
        }
        pub fn new_unreachable(message: impl Into<String>) -> Self {
            Self::new(InspectBehavior::Fail(message.into()))
        }
        pub fn set_snapshot(&self, snapshot: ActiveJobSnapshot) {
            *self.inspect.lock().unwrap() = InspectBehavior::Snapshot(snapshot);
        }
        pub fn fail_enqueue(&self, message: impl Into<String>) {
            *self.enqueue_failure.lock().unwrap() = Some(message.into());
        }
        pub fn enqueued(&self) -> Vec<JobKind> {
            self.enqueued.lock().unwrap().clone()
        }
        pub fn enqueue_count(&self) -> usize {
            self.enqueued.lock().unwrap().len()
        }
        pub fn inspect_count(&self) -> usize {
            *self.inspect_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl JobQueue for MockJobQueue {
        async fn inspect_active(&self) -> Result<ActiveJobSnapshot> {
            *self.inspect_count.lock().unwrap() += 1;
            match self.inspect.lock().unwrap().clone() {
                InspectBehavior::Snapshot(snapshot) => Ok(snapshot),
                InspectBehavior::Fail(msg) => Err(AppError::Queue(msg)),
            }
        }

        async fn enqueue(&self, job: &JobKind) -> Result<EnqueueOutcome> {
            if let Some(msg) = self.enqueue_failure.lock().unwrap().clone() {
                return Err(AppError::Queue(msg));
            }
            let mut enqueued = self.enqueued.lock().unwrap();
            enqueued.push(job.clone());
            Ok(EnqueueOutcome::Enqueued(format!("mock-{}", enqueued.len())))
        }
    }
}
