mod fixtures;

use anyhow::Result;
use console_core::{ApprovalRequest, Deployment, IntentCategory, ServiceHealth};
use serde::Serialize;

pub use fixtures::FixtureDataSource;

/// Data-access collaborator behind the console's read-only tools.
pub trait DataSource: Send + Sync {
    fn recent_deployments(&self, limit: usize) -> Result<Vec<Deployment>>;
    fn failed_deployments(&self, limit: usize) -> Result<Vec<Deployment>>;
    fn pending_approvals(&self) -> Result<Vec<ApprovalRequest>>;
    fn service_health(&self) -> Result<Vec<ServiceHealth>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Deployments,
    FailedDeployments,
    PendingApprovals,
    SystemHealth,
}

impl ToolKind {
    pub fn for_category(category: IntentCategory) -> Option<Self> {
        match category {
            IntentCategory::DeploymentMonitoring => Some(Self::Deployments),
            IntentCategory::DeploymentFailures => Some(Self::FailedDeployments),
            IntentCategory::OperationalApprovals => Some(Self::PendingApprovals),
            IntentCategory::SystemHealth => Some(Self::SystemHealth),
            IntentCategory::Unsupported => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Deployments => "getDeployments",
            Self::FailedDeployments => "getFailedDeployments",
            Self::PendingApprovals => "getPendingApprovals",
            Self::SystemHealth => "getSystemHealth",
        }
    }
}
