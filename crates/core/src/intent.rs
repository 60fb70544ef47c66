use std::sync::Arc;

use chrono::Utc;

use crate::audit::{AuditEvent, AuditSink, TracingAuditSink};
use crate::models::{ClassificationResult, ComponentRejection, Confidence, IntentCategory};
use crate::patterns::PatternTable;
use crate::policy::components_for;

pub fn normalize_query(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Deterministic query → intent mapping plus the component guard renderers
/// call before showing anything.
///
/// Holds only read-only state after construction, so one instance can be
/// shared across threads behind an `Arc`.
#[derive(Clone)]
pub struct IntentClassifier {
    patterns: PatternTable,
    audit: Arc<dyn AuditSink>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(PatternTable::builtin(), Arc::new(TracingAuditSink))
    }
}

impl IntentClassifier {
    pub fn new(patterns: PatternTable, audit: Arc<dyn AuditSink>) -> Self {
        Self { patterns, audit }
    }

    pub fn with_audit(audit: Arc<dyn AuditSink>) -> Self {
        Self::new(PatternTable::builtin(), audit)
    }

    /// Total over all input: anything no rule matches is `Unsupported`.
    pub fn classify(&self, query: &str) -> ClassificationResult {
        let normalized = normalize_query(query);

        let (detected_intent, matched_pattern) = match self.patterns.first_match(&normalized) {
            Some(rule) => (rule.category(), Some(rule.as_str().to_string())),
            None => (IntentCategory::Unsupported, None),
        };

        // Matching is binary, so a miss is as certain as a hit.
        let result = ClassificationResult {
            query: query.to_string(),
            detected_intent,
            confidence: Confidence::High,
            matched_pattern,
            allowed_components: owned_components(detected_intent),
            timestamp: Utc::now(),
        };

        self.audit.record(&AuditEvent::Classified(result.clone()));
        result
    }

    pub fn is_component_allowed(&self, component: &str, category: IntentCategory) -> bool {
        if components_for(category)
            .iter()
            .any(|allowed| *allowed == component)
        {
            return true;
        }

        self.audit
            .record(&AuditEvent::ComponentRejected(ComponentRejection {
                component: component.to_string(),
                category,
                allowed_components: owned_components(category),
                at: Utc::now(),
            }));
        false
    }
}

fn owned_components(category: IntentCategory) -> Vec<String> {
    components_for(category)
        .iter()
        .map(ToString::to_string)
        .collect()
}
