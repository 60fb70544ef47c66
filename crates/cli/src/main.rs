use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console_agents::ConsoleAgent;
use console_core::{
    components_for, ChatInput, IntentCategory, IntentClassifier, PatternRuleSpec, PatternTable,
    TracingAuditSink,
};
use console_observability::{init_tracing, AppMetrics};
use console_tools::FixtureDataSource;

#[derive(Debug, Parser)]
#[command(name = "console")]
#[command(about = "Ops console intent CLI")]
struct Cli {
    /// JSON file of extra pattern rules, appended after the built-in ones.
    #[arg(long, env = "CONSOLE_EXTRA_PATTERNS")]
    patterns: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Classify {
        query: String,
    },
    Authorize {
        #[arg(long)]
        component: String,
        #[arg(long)]
        category: String,
    },
    Intents,
    Chat,
}

fn main() -> Result<()> {
    init_tracing("console_cli");
    let cli = Cli::parse();

    let agent = build_agent(cli.patterns.as_ref())?;

    match cli.command {
        Command::Classify { query } => {
            let result = agent.classify(&query);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Authorize {
            component,
            category,
        } => {
            let category = category
                .parse::<IntentCategory>()
                .context("invalid --category value")?;
            let allowed = agent.is_component_allowed(&component, category);
            println!(
                "{}",
                serde_json::to_string_pretty(&authorization_report(&component, category, allowed))?
            );
        }
        Command::Intents => {
            println!("{}", serde_json::to_string_pretty(&agent.catalog())?);
        }
        Command::Chat => run_chat(&agent)?,
    }

    Ok(())
}

/// Same shape as the `/v1/authorize` response body.
fn authorization_report(
    component: &str,
    category: IntentCategory,
    allowed: bool,
) -> serde_json::Value {
    serde_json::json!({
        "component": component,
        "category": category,
        "allowed": allowed,
        "allowed_components": components_for(category),
    })
}

fn run_chat(agent: &ConsoleAgent) -> Result<()> {
    let mut session_id: Option<String> = None;

    println!("Ops console chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let reply = agent.handle_chat(ChatInput {
            session_id: session_id.clone(),
            text: message.to_string(),
        })?;
        session_id = Some(reply.session_id.clone());

        println!("\n[{}] {}", reply.classification.detected_intent, reply.reply_text);
        for block in &reply.blocks {
            println!("- {}", block.component);
        }
        println!();
    }

    Ok(())
}

fn build_agent(patterns: Option<&PathBuf>) -> Result<ConsoleAgent> {
    let mut table = PatternTable::builtin();
    if let Some(path) = patterns {
        let specs = PatternRuleSpec::load_file(path)?;
        table = table
            .with_rules(specs)
            .with_context(|| format!("invalid pattern rules in {}", path.display()))?;
    }

    Ok(ConsoleAgent::new(
        Arc::new(IntentClassifier::new(table, Arc::new(TracingAuditSink))),
        Arc::new(FixtureDataSource::default()),
        AppMetrics::shared(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn authorization_report_lists_allowed_components() {
        let report =
            authorization_report("ApprovalQueue", IntentCategory::DeploymentFailures, false);
        assert_eq!(
            report,
            json!({
                "component": "ApprovalQueue",
                "category": "DEPLOYMENT_FAILURES",
                "allowed": false,
                "allowed_components": ["DeploymentTable", "ActionPanel"],
            })
        );
    }
}
