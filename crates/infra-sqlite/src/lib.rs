// Confpush Infrastructure - SQLite Adapter
// Implements: JobQueue, CredentialStore, EventOutbox (+ unit of work)

mod connection;
mod credential_store;
mod error;
mod job_queue;
mod migration;
mod outbox;
mod transaction;

pub use connection::create_pool;
pub use credential_store::SqliteCredentialStore;
pub use job_queue::SqliteJobQueue;
pub use migration::run_migrations;
pub use outbox::SqliteOutbox;
pub use transaction::SqliteUnitOfWork;
