// Event Outbox Port
// Committed configuration events waiting to be relayed to the event bus

use crate::domain::{ConfigEvent, DomainError, EventKind};
use crate::error::Result;
use crate::port::{CommitScope, Transaction};
use async_trait::async_trait;

/// One outbox row
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub id: i64,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: i64, // epoch ms
}

impl OutboxEntry {
    /// Decode the stored event, checking it against the recorded kind
    pub fn decode(&self) -> Result<ConfigEvent> {
        let kind: EventKind = self.kind.parse()?;
        let event: ConfigEvent = serde_json::from_value(self.payload.clone())?;
        if event.kind() != kind {
            return Err(DomainError::ValidationError(format!(
                "outbox entry {} recorded as {} but holds {}",
                self.id,
                kind,
                event.kind()
            ))
            .into());
        }
        Ok(event)
    }
}

/// Read side of the outbox
#[async_trait]
pub trait EventOutbox: Send + Sync {
    /// Oldest unprocessed entries, at most `limit`
    async fn next_batch(&self, limit: usize) -> Result<Vec<OutboxEntry>>;

    /// Begin a unit of work for consuming entries
    async fn begin(&self) -> Result<Box<dyn OutboxTransaction>>;
}

/// Outbox operations within a transaction
#[async_trait]
pub trait OutboxTransaction: Transaction {
    /// Mark an entry consumed (visible once committed)
    async fn mark_processed(&mut self, entry_id: i64) -> Result<()>;

    /// This transaction as a plain commit scope
    fn as_scope(&mut self) -> &mut dyn CommitScope;
}
