// Transaction port: commit/rollback plus post-commit callbacks

use crate::error::Result;
use crate::port::CredentialTransaction;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

/// Future produced by a post-commit callback
pub type CommitFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Work deferred until the enclosing unit of work has committed
pub type CommitCallback = Box<dyn FnOnce() -> CommitFuture + Send + 'static>;

/// Anything that accepts post-commit callbacks
pub trait CommitScope: Send {
    /// Register `callback` to run after a successful commit
    ///
    /// Callbacks run in registration order. They never run if the unit of
    /// work is rolled back.
    fn on_commit(&mut self, callback: CommitCallback);

    /// Credential access inside this scope, when it wraps a database
    /// transaction
    fn credentials(&mut self) -> Option<&mut dyn CredentialTransaction> {
        None
    }
}

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: CommitScope {
    /// Commit the transaction, then run the registered callbacks
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction and drop the registered callbacks
    async fn rollback(self: Box<Self>) -> Result<()>;
}
