pub mod audit;
pub mod error;
pub mod intent;
pub mod models;
pub mod patterns;
pub mod policy;

pub use audit::{AuditEvent, AuditSink, MemoryAuditSink, NoopAuditSink, TracingAuditSink};
pub use error::IntentError;
pub use intent::{normalize_query, IntentClassifier};
pub use models::*;
pub use patterns::{PatternRule, PatternRuleSpec, PatternTable, PRIORITY_ORDER};
pub use policy::{
    catalog, categories, components_for, components_for_name, description_for, examples_for,
    FALLBACK_COMPONENT,
};
