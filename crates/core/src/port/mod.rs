// Port Layer - Interfaces for external dependencies

pub mod credential_store;
pub mod id_provider; // For deterministic testing
pub mod job_queue;
pub mod outbox;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use credential_store::{CredentialStore, CredentialTransaction};
pub use id_provider::IdProvider;
pub use job_queue::JobQueue;
pub use outbox::{EventOutbox, OutboxEntry, OutboxTransaction};
pub use time_provider::TimeProvider;
pub use transaction::{CommitCallback, CommitFuture, CommitScope, Transaction};
