// Event Bus - typed publish/subscribe for configuration events

use crate::application::hooks::CommitHooks;
use crate::domain::{ConfigEvent, EventKind};
use crate::error::Result;
use crate::port::CommitScope;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Receiver of configuration events
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle `event` synchronously within the publisher's flow
    ///
    /// Work that must only happen once the publisher's unit of work is
    /// durable goes through `scope.on_commit`.
    async fn handle(&self, event: &ConfigEvent, scope: &mut dyn CommitScope) -> Result<()>;
}

/// Outcome of one publication
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Handlers the event was delivered to
    pub invoked: usize,
    /// Handlers that returned an error
    pub failed: usize,
}

impl PublishReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

struct Subscription {
    dispatch_uid: String,
    kind: EventKind,
    handler: Arc<dyn EventHandler>,
}

/// In-process event bus
///
/// Built once at startup, then shared as `Arc<EventBus>`. Handlers are
/// invoked one after the other, in subscription order.
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to events of `kind`
    ///
    /// A `dispatch_uid` can only be registered once; later registrations
    /// under the same uid are ignored and return `false`.
    pub fn subscribe(
        &mut self,
        dispatch_uid: impl Into<String>,
        kind: EventKind,
        handler: Arc<dyn EventHandler>,
    ) -> bool {
        let dispatch_uid = dispatch_uid.into();
        if self
            .subscriptions
            .iter()
            .any(|s| s.dispatch_uid == dispatch_uid)
        {
            debug!(dispatch_uid = %dispatch_uid, "Handler already registered");
            return false;
        }
        debug!(dispatch_uid = %dispatch_uid, kind = %kind, "Handler registered");
        self.subscriptions.push(Subscription {
            dispatch_uid,
            kind,
            handler,
        });
        true
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscriptions.iter().filter(|s| s.kind == kind).count()
    }

    /// Deliver `event` to its subscribers
    ///
    /// A failing handler is logged and does not prevent the remaining
    /// handlers from running; the report counts it so the publisher can
    /// decide whether to keep its unit of work.
    pub async fn publish(&self, event: &ConfigEvent, scope: &mut dyn CommitScope) -> PublishReport {
        let kind = event.kind();
        let mut report = PublishReport::default();

        for subscription in self.subscriptions.iter().filter(|s| s.kind == kind) {
            report.invoked += 1;
            if let Err(e) = subscription.handler.handle(event, &mut *scope).await {
                report.failed += 1;
                warn!(
                    dispatch_uid = %subscription.dispatch_uid,
                    kind = %kind,
                    device_id = %event.device_id(),
                    error = %e,
                    "Event handler failed"
                );
            }
        }

        report
    }

    /// Publish outside any transaction: post-commit work runs right away
    pub async fn publish_autocommit(&self, event: &ConfigEvent) -> PublishReport {
        let mut hooks = CommitHooks::new();
        let report = self.publish(event, &mut hooks).await;
        hooks.run().await;
        report
    }
}
