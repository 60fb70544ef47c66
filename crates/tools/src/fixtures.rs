use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use console_core::{
    ApprovalRequest, Deployment, DeploymentStatus, HealthStatus, RiskLevel, ServiceHealth,
};

use crate::DataSource;

const SERVICES: [&str; 6] = [
    "api-gateway",
    "auth",
    "billing",
    "checkout",
    "search",
    "notifications",
];
const AUTHORS: [&str; 4] = ["mkim", "jdoe", "apatel", "lnguyen"];
const FAILURE_REASONS: [&str; 3] = [
    "health check timed out after rollout",
    "migration 0042 failed: lock wait timeout",
    "image pull backoff: tag not found",
];
const DEPLOYMENT_COUNT: usize = 14;

const APPROVALS: [(&str, &str, &str, RiskLevel); 4] = [
    (
        "Promote billing v2.38.0 to production",
        "jdoe",
        "deployment_promotion",
        RiskLevel::High,
    ),
    (
        "Scale search cluster from 6 to 9 nodes",
        "apatel",
        "capacity_change",
        RiskLevel::Medium,
    ),
    (
        "Rotate auth service signing keys",
        "lnguyen",
        "secret_rotation",
        RiskLevel::High,
    ),
    (
        "Open maintenance window for checkout",
        "mkim",
        "maintenance_window",
        RiskLevel::Low,
    ),
];

/// Deterministic mock data. The same anchor always yields the same records,
/// newest first.
#[derive(Debug, Clone)]
pub struct FixtureDataSource {
    anchor: DateTime<Utc>,
}

impl Default for FixtureDataSource {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl FixtureDataSource {
    pub fn new(anchor: DateTime<Utc>) -> Self {
        Self { anchor }
    }

    fn deployments(&self) -> impl Iterator<Item = Deployment> + '_ {
        (0..DEPLOYMENT_COUNT).map(|index| self.deployment(index))
    }

    fn deployment(&self, index: usize) -> Deployment {
        let status = match index {
            0 => DeploymentStatus::InProgress,
            i if i % 5 == 2 => DeploymentStatus::Failed,
            i if i % 7 == 4 => DeploymentStatus::RolledBack,
            _ => DeploymentStatus::Succeeded,
        };
        let started_at = self.anchor - Duration::minutes(37 * index as i64 + 5);
        let finished_at = (status != DeploymentStatus::InProgress)
            .then(|| started_at + Duration::minutes(4 + (index % 6) as i64));

        Deployment {
            id: format!("dep-{:04}", 2400 - index),
            service: SERVICES[index % SERVICES.len()].to_string(),
            environment: if index % 4 == 3 { "staging" } else { "production" }.to_string(),
            version: format!("v2.{}.{}", 40 - index, index % 3),
            status,
            author: AUTHORS[index % AUTHORS.len()].to_string(),
            started_at,
            finished_at,
            failure_reason: status
                .is_failure()
                .then(|| FAILURE_REASONS[index % FAILURE_REASONS.len()].to_string()),
        }
    }
}

impl DataSource for FixtureDataSource {
    fn recent_deployments(&self, limit: usize) -> Result<Vec<Deployment>> {
        Ok(self.deployments().take(limit).collect())
    }

    fn failed_deployments(&self, limit: usize) -> Result<Vec<Deployment>> {
        Ok(self
            .deployments()
            .filter(|deployment| deployment.status.is_failure())
            .take(limit)
            .collect())
    }

    fn pending_approvals(&self) -> Result<Vec<ApprovalRequest>> {
        Ok(APPROVALS
            .iter()
            .enumerate()
            .map(|(index, (title, requester, kind, risk))| ApprovalRequest {
                id: format!("apr-{}", 1001 + index),
                title: title.to_string(),
                requester: requester.to_string(),
                kind: kind.to_string(),
                risk: *risk,
                requested_at: self.anchor - Duration::minutes(53 * index as i64 + 12),
            })
            .collect())
    }

    fn service_health(&self) -> Result<Vec<ServiceHealth>> {
        Ok(SERVICES
            .iter()
            .enumerate()
            .map(|(index, service)| {
                let (status, latency_ms, uptime_percent) = match *service {
                    "search" => (HealthStatus::Degraded, 840, 99.41),
                    "notifications" => (HealthStatus::Down, 0, 97.2),
                    _ => (HealthStatus::Healthy, 40 + 13 * index as u32, 99.98),
                };
                ServiceHealth {
                    service: service.to_string(),
                    status,
                    latency_ms,
                    uptime_percent,
                    checked_at: self.anchor,
                }
            })
            .collect())
    }
}
