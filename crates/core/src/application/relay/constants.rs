// Relay constants (No magic values)
use std::time::Duration;

/// Sleep duration when the outbox is empty (200ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(200);

/// Sleep duration after a relay error before retry (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Outbox entries fetched per round
pub const DEFAULT_BATCH_SIZE: usize = 100;
