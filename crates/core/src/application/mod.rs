// Application Layer - Use Cases and Business Logic

pub mod dispatcher;
pub mod events;
pub mod hooks;
pub mod provisioning;
pub mod relay;
pub mod wiring;

// Re-exports
pub use dispatcher::{DispatchOutcome, UpdateDispatcher};
pub use events::{EventBus, EventHandler, PublishReport};
pub use hooks::CommitHooks;
pub use provisioning::CredentialProvisioner;
pub use relay::{shutdown_channel, EventRelay, RelayConfig, ShutdownSender, ShutdownToken};
pub use wiring::register_connection_handlers;
