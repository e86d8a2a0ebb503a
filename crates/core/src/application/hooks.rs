// Post-commit hook list

use crate::port::{CommitCallback, CommitScope};
use std::fmt;
use tracing::debug;

/// Callbacks waiting for a unit of work to commit
///
/// Used as the scope of SQL units of work and, run immediately, as the
/// scope of autocommit publication.
#[derive(Default)]
pub struct CommitHooks {
    callbacks: Vec<CommitCallback>,
}

impl CommitHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Run every callback in registration order
    pub async fn run(self) {
        let count = self.callbacks.len();
        for callback in self.callbacks {
            callback().await;
        }
        if count > 0 {
            debug!(hooks = count, "Post-commit hooks executed");
        }
    }

    /// Drop the callbacks without running them (rollback)
    pub fn discard(self) -> usize {
        let count = self.callbacks.len();
        if count > 0 {
            debug!(hooks = count, "Post-commit hooks discarded");
        }
        count
    }
}

impl CommitScope for CommitHooks {
    fn on_commit(&mut self, callback: CommitCallback) {
        self.callbacks.push(callback);
    }
}

impl fmt::Debug for CommitHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitHooks")
            .field("pending", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::CommitFuture;
    use std::sync::{Arc, Mutex};

    fn recorder(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> CommitCallback {
        let log = log.clone();
        Box::new(move || -> CommitFuture {
            Box::pin(async move {
                log.lock().unwrap().push(value);
            })
        })
    }

    #[tokio::test]
    async fn test_hooks_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = CommitHooks::new();
        hooks.on_commit(recorder(&log, 1));
        hooks.on_commit(recorder(&log, 2));
        hooks.on_commit(recorder(&log, 3));

        assert_eq!(hooks.len(), 3);
        assert!(log.lock().unwrap().is_empty(), "nothing runs before commit");

        hooks.run().await;
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_discarded_hooks_never_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = CommitHooks::new();
        hooks.on_commit(recorder(&log, 1));

        assert_eq!(hooks.discard(), 1);
        tokio::task::yield_now().await;
        assert!(log.lock().unwrap().is_empty());
    }
}
