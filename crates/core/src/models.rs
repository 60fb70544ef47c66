use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IntentError;

/// The closed set of outcomes a chat query can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentCategory {
    DeploymentMonitoring,
    DeploymentFailures,
    OperationalApprovals,
    SystemHealth,
    Unsupported,
}

impl IntentCategory {
    pub const ALL: [IntentCategory; 5] = [
        Self::DeploymentMonitoring,
        Self::DeploymentFailures,
        Self::OperationalApprovals,
        Self::SystemHealth,
        Self::Unsupported,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeploymentMonitoring => "DEPLOYMENT_MONITORING",
            Self::DeploymentFailures => "DEPLOYMENT_FAILURES",
            Self::OperationalApprovals => "OPERATIONAL_APPROVALS",
            Self::SystemHealth => "SYSTEM_HEALTH",
            Self::Unsupported => "UNSUPPORTED",
        }
    }

    /// Position in [`IntentCategory::ALL`]; stable for per-category counters.
    pub fn index(self) -> usize {
        match self {
            Self::DeploymentMonitoring => 0,
            Self::DeploymentFailures => 1,
            Self::OperationalApprovals => 2,
            Self::SystemHealth => 3,
            Self::Unsupported => 4,
        }
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentCategory {
    type Err = IntentError;

    /// Accepts `DEPLOYMENT_FAILURES`, `deployment_failures` and `deployment-failures`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| IntentError::InvalidCategory(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Outcome of classifying one query. Built once, audited, then handed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub query: String,
    pub detected_intent: IntentCategory,
    pub confidence: Confidence,
    pub matched_pattern: Option<String>,
    pub allowed_components: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRejection {
    pub component: String,
    pub category: IntentCategory,
    pub allowed_components: Vec<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentDescriptor {
    pub category: IntentCategory,
    pub description: String,
    pub examples: Vec<String>,
    pub components: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInput {
    pub session_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderBlock {
    pub component: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleReply {
    pub session_id: String,
    pub reply_text: String,
    pub classification: ClassificationResult,
    pub tool: Option<String>,
    pub blocks: Vec<RenderBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Succeeded,
    Failed,
    InProgress,
    RolledBack,
}

impl DeploymentStatus {
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::RolledBack)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub service: String,
    pub environment: String,
    pub version: String,
    pub status: DeploymentStatus,
    pub author: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    pub title: String,
    pub requester: String,
    pub kind: String,
    pub risk: RiskLevel,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub service: String,
    pub status: HealthStatus,
    pub latency_ms: u32,
    pub uptime_percent: f32,
    pub checked_at: DateTime<Utc>,
}
