use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use console_core::{
    catalog, description_for, examples_for, ChatInput, ClassificationResult, ConsoleReply,
    Deployment, IntentCategory, IntentClassifier, IntentDescriptor, RenderBlock, ServiceHealth,
    FALLBACK_COMPONENT,
};
use console_observability::AppMetrics;
use console_tools::{DataSource, ToolKind};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

const DEPLOYMENT_LIMIT: usize = 10;

#[derive(Clone)]
pub struct ConsoleAgent {
    classifier: Arc<IntentClassifier>,
    data: Arc<dyn DataSource>,
    metrics: Arc<AppMetrics>,
}

impl ConsoleAgent {
    pub fn new(
        classifier: Arc<IntentClassifier>,
        data: Arc<dyn DataSource>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            classifier,
            data,
            metrics,
        }
    }

    pub fn classify(&self, query: &str) -> ClassificationResult {
        let started = Instant::now();
        let result = self.classify_counted(query);
        self.metrics.observe_latency(started.elapsed());
        result
    }

    fn classify_counted(&self, query: &str) -> ClassificationResult {
        self.metrics.inc_request();
        let result = self.classifier.classify(query);
        self.metrics.record_classification(result.detected_intent);
        result
    }

    pub fn is_component_allowed(&self, component: &str, category: IntentCategory) -> bool {
        let allowed = self.classifier.is_component_allowed(component, category);
        if !allowed {
            self.metrics.inc_rejected_component();
        }
        allowed
    }

    pub fn catalog(&self) -> Vec<IntentDescriptor> {
        catalog()
    }

    #[instrument(skip(self, input))]
    pub fn handle_chat(&self, input: ChatInput) -> Result<ConsoleReply> {
        let started = Instant::now();
        let classification = self.classify_counted(&input.text);
        let category = classification.detected_intent;
        let tool = ToolKind::for_category(category);

        let planned = match tool {
            Some(tool) => self
                .run_tool(tool)
                .with_context(|| format!("tool {} failed", tool.name()))?,
            None => vec![fallback_block()],
        };

        let blocks = planned
            .into_iter()
            .filter(|block| self.is_component_allowed(&block.component, category))
            .collect::<Vec<_>>();

        let session_id = input
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        self.metrics.observe_latency(started.elapsed());
        info!(
            session_id = %session_id,
            intent = %category,
            tool = tool.map(ToolKind::name).unwrap_or("none"),
            blocks = blocks.len(),
            "chat handled"
        );

        Ok(ConsoleReply {
            session_id,
            reply_text: reply_text_for(category, &blocks),
            classification,
            tool: tool.map(|tool| tool.name().to_string()),
            blocks,
        })
    }

    fn run_tool(&self, tool: ToolKind) -> Result<Vec<RenderBlock>> {
        let blocks = match tool {
            ToolKind::Deployments => {
                let deployments = self.data.recent_deployments(DEPLOYMENT_LIMIT)?;
                vec![deployment_table(&deployments)]
            }
            ToolKind::FailedDeployments => {
                let deployments = self.data.failed_deployments(DEPLOYMENT_LIMIT)?;
                vec![
                    deployment_table(&deployments),
                    action_panel(&deployments),
                ]
            }
            ToolKind::PendingApprovals => {
                let approvals = self.data.pending_approvals()?;
                vec![block(
                    "ApprovalQueue",
                    json!({ "count": approvals.len(), "approvals": approvals }),
                )]
            }
            ToolKind::SystemHealth => {
                let services = self.data.service_health()?;
                vec![status_summary(&services)]
            }
        };
        Ok(blocks)
    }
}

fn block(component: &str, payload: Value) -> RenderBlock {
    RenderBlock {
        component: component.to_string(),
        payload,
    }
}

fn deployment_table(deployments: &[Deployment]) -> RenderBlock {
    block(
        "DeploymentTable",
        json!({ "count": deployments.len(), "deployments": deployments }),
    )
}

fn action_panel(deployments: &[Deployment]) -> RenderBlock {
    let actions = deployments
        .iter()
        .flat_map(|deployment| {
            [
                json!({
                    "action": "retry",
                    "deployment_id": deployment.id,
                    "label": format!("Retry {} {}", deployment.service, deployment.version),
                }),
                json!({
                    "action": "rollback",
                    "deployment_id": deployment.id,
                    "label": format!("Roll back {}", deployment.service),
                }),
            ]
        })
        .collect::<Vec<_>>();

    block("ActionPanel", json!({ "actions": actions }))
}

fn status_summary(services: &[ServiceHealth]) -> RenderBlock {
    let mut counts = BTreeMap::new();
    for service in services {
        *counts.entry(service.status).or_insert(0_usize) += 1;
    }
    let counts = counts
        .into_iter()
        .map(|(status, total)| json!({ "status": status, "total": total }))
        .collect::<Vec<_>>();

    block(
        "SystemStatusSummary",
        json!({ "counts": counts, "services": services }),
    )
}

fn fallback_block() -> RenderBlock {
    let supported = IntentCategory::ALL
        .into_iter()
        .filter(|category| *category != IntentCategory::Unsupported)
        .map(|category| {
            json!({
                "category": category,
                "description": description_for(category),
                "examples": examples_for(category),
            })
        })
        .collect::<Vec<_>>();

    block(
        FALLBACK_COMPONENT,
        json!({
            "message": description_for(IntentCategory::Unsupported),
            "supported": supported,
        }),
    )
}

fn reply_text_for(category: IntentCategory, blocks: &[RenderBlock]) -> String {
    let count = |component: &str| {
        blocks
            .iter()
            .find(|block| block.component == component)
            .and_then(|block| block.payload.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };

    match category {
        IntentCategory::DeploymentMonitoring => {
            format!("Here are the {} most recent deployments.", count("DeploymentTable"))
        }
        IntentCategory::DeploymentFailures => format!(
            "{} deployments failed or were rolled back. Retry and rollback actions are available.",
            count("DeploymentTable")
        ),
        IntentCategory::OperationalApprovals => {
            format!("{} requests are waiting for your approval.", count("ApprovalQueue"))
        }
        IntentCategory::SystemHealth => "Current service health across the platform.".to_string(),
        IntentCategory::Unsupported => "I can help with deployments, failures, approvals and \
                                        system health. Try one of the example questions."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use console_core::{AuditEvent, MemoryAuditSink};
    use console_tools::FixtureDataSource;

    fn agent() -> (ConsoleAgent, Arc<MemoryAuditSink>, Arc<AppMetrics>) {
        let sink = Arc::new(MemoryAuditSink::new());
        let metrics = AppMetrics::shared();
        let anchor = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        let agent = ConsoleAgent::new(
            Arc::new(IntentClassifier::with_audit(sink.clone())),
            Arc::new(FixtureDataSource::new(anchor)),
            metrics.clone(),
        );
        (agent, sink, metrics)
    }

    fn chat(agent: &ConsoleAgent, text: &str) -> ConsoleReply {
        agent
            .handle_chat(ChatInput {
                session_id: None,
                text: text.to_string(),
            })
            .unwrap()
    }

    fn components(reply: &ConsoleReply) -> Vec<&str> {
        reply
            .blocks
            .iter()
            .map(|block| block.component.as_str())
            .collect()
    }

    #[test]
    fn failures_render_table_and_actions() {
        let (agent, _, _) = agent();
        let reply = chat(&agent, "What's broken?");
        assert_eq!(
            reply.classification.detected_intent,
            IntentCategory::DeploymentFailures
        );
        assert_eq!(reply.tool.as_deref(), Some("getFailedDeployments"));
        assert_eq!(components(&reply), vec!["DeploymentTable", "ActionPanel"]);
        assert_eq!(reply.blocks[0].payload["count"], 5);
    }

    #[test]
    fn health_renders_summary() {
        let (agent, _, _) = agent();
        let reply = chat(&agent, "Any services down?");
        assert_eq!(components(&reply), vec!["SystemStatusSummary"]);
        assert_eq!(reply.blocks[0].payload["services"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn unsupported_renders_fallback_only() {
        let (agent, _, metrics) = agent();
        let reply = chat(&agent, "What's the weather?");
        assert_eq!(reply.tool, None);
        assert_eq!(components(&reply), vec![FALLBACK_COMPONENT]);
        assert_eq!(
            reply.blocks[0].payload["supported"].as_array().unwrap().len(),
            4
        );
        assert_eq!(metrics.snapshot().fallback_total, 1);
    }

    #[test]
    fn session_id_is_echoed_or_minted() {
        let (agent, _, _) = agent();
        let reply = agent
            .handle_chat(ChatInput {
                session_id: Some("s-1".to_string()),
                text: "Show recent deployments".to_string(),
            })
            .unwrap();
        assert_eq!(reply.session_id, "s-1");
        assert!(!chat(&agent, "hello").session_id.is_empty());
    }

    #[test]
    fn every_request_contributes_one_latency_sample() {
        let (agent, _, metrics) = agent();
        for _ in 0..50 {
            agent.classify("Show recent deployments");
        }
        chat(&agent, "What's broken?");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_total, 51);
        assert_eq!(snapshot.latency_samples, 51);
        assert_eq!(snapshot.classifications_total, 51);
    }

    #[test]
    fn rejected_component_is_counted_and_audited() {
        let (agent, sink, metrics) = agent();
        assert!(!agent.is_component_allowed("ApprovalQueue", IntentCategory::SystemHealth));
        assert_eq!(metrics.snapshot().rejected_components_total, 1);
        assert!(matches!(
            sink.events().as_slice(),
            [AuditEvent::ComponentRejected(_)]
        ));
    }
}
