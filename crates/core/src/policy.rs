use crate::error::IntentError;
use crate::models::{IntentCategory, IntentDescriptor};

pub const FALLBACK_COMPONENT: &str = "FallbackIntent";

pub fn categories() -> &'static [IntentCategory] {
    &IntentCategory::ALL
}

/// UI components authorized to render for a category. Never empty.
pub fn components_for(category: IntentCategory) -> &'static [&'static str] {
    match category {
        IntentCategory::DeploymentMonitoring => &["DeploymentTable"],
        IntentCategory::DeploymentFailures => &["DeploymentTable", "ActionPanel"],
        IntentCategory::OperationalApprovals => &["ApprovalQueue"],
        IntentCategory::SystemHealth => &["SystemStatusSummary"],
        IntentCategory::Unsupported => &[FALLBACK_COMPONENT],
    }
}

/// Lookup by wire name, for callers holding a category as text.
pub fn components_for_name(category: &str) -> Result<&'static [&'static str], IntentError> {
    Ok(components_for(category.parse()?))
}

pub fn description_for(category: IntentCategory) -> &'static str {
    match category {
        IntentCategory::DeploymentMonitoring => "Browse recent deployments and their status",
        IntentCategory::DeploymentFailures => {
            "Investigate failed or rolled back deployments and act on them"
        }
        IntentCategory::OperationalApprovals => "Review operational changes waiting for approval",
        IntentCategory::SystemHealth => "Check whether services are healthy, degraded or down",
        IntentCategory::Unsupported => "Requests outside the operations console",
    }
}

pub fn examples_for(category: IntentCategory) -> &'static [&'static str] {
    match category {
        IntentCategory::DeploymentMonitoring => &[
            "Show recent deployments",
            "What was deployed to production today?",
        ],
        IntentCategory::DeploymentFailures => &["Show failed deployments", "What's broken?"],
        IntentCategory::OperationalApprovals => {
            &["What needs my approval?", "Show pending approvals"]
        }
        IntentCategory::SystemHealth => &["Any services down?", "How is system health?"],
        IntentCategory::Unsupported => &[],
    }
}

pub fn catalog() -> Vec<IntentDescriptor> {
    categories()
        .iter()
        .map(|&category| IntentDescriptor {
            category,
            description: description_for(category).to_string(),
            examples: examples_for(category)
                .iter()
                .map(ToString::to_string)
                .collect(),
            components: components_for(category)
                .iter()
                .map(ToString::to_string)
                .collect(),
        })
        .collect()
}
