use std::sync::Arc;

use console_core::{AuditEvent, AuditSink};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::debug;

/// Hands audit events to a background task; `record` never waits.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    tx: UnboundedSender<AuditEvent>,
}

impl ChannelAuditSink {
    pub fn new() -> (Self, UnboundedReceiver<AuditEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AuditSink for ChannelAuditSink {
    fn record(&self, event: &AuditEvent) {
        if self.tx.send(event.clone()).is_err() {
            debug!("audit forwarder stopped; dropping event");
        }
    }
}

/// Drains `rx` into `inner` until every sender is dropped.
/// Must be called from inside a tokio runtime.
pub fn spawn_audit_forwarder(
    mut rx: UnboundedReceiver<AuditEvent>,
    inner: Arc<dyn AuditSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            inner.record(&event);
        }
    })
}
