//! Audit trail for classification decisions and component rejections.
//!
//! Sinks are infallible: a sink that cannot deliver an event drops it
//! rather than disturbing the caller.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{ClassificationResult, ComponentRejection};

pub const AUDIT_TARGET: &str = "console_audit";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    Classified(ClassificationResult),
    ComponentRejected(ComponentRejection),
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Writes each event as a structured `tracing` event on [`AUDIT_TARGET`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        match event {
            AuditEvent::Classified(result) => info!(
                target: AUDIT_TARGET,
                category = %result.detected_intent,
                matched_pattern = result.matched_pattern.as_deref().unwrap_or("<none>"),
                allowed_components = ?result.allowed_components,
                query = %result.query,
                "query classified"
            ),
            AuditEvent::ComponentRejected(rejection) => warn!(
                target: AUDIT_TARGET,
                component = %rejection.component,
                category = %rejection.category,
                allowed_components = ?rejection.allowed_components,
                "component not authorized for intent"
            ),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// Keeps events in memory; meant for tests and local inspection.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        self.events.lock().push(event.clone());
    }
}
