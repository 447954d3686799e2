// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent graph management on a running node
//!
//! Commands: list, register, discover, retire, lifecycle, events

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use synapse_cortex::AgentStatus;
use synapse_orchestrator_core::domain::node_config::StaticAgentConfig;

use crate::daemon::client::AgentInfo;
use crate::daemon::{connect, NodeAddress};

#[derive(Subcommand)]
pub enum AgentsCommand {
    /// List agents in the graph
    List {
        /// Only dynamically provisioned agents
        #[arg(long)]
        dynamic: bool,

        /// Include retired agents
        #[arg(long)]
        all: bool,
    },

    /// Register a static agent from a YAML file
    Register {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Show ranked candidates for a concept
    Discover {
        #[arg(value_name = "CONCEPT")]
        concept: String,

        #[arg(long, default_value = "define")]
        intent: String,

        /// Preferred domain
        #[arg(long)]
        domain: Option<String>,
    },

    /// Retire a dynamic agent
    Retire {
        #[arg(value_name = "AGENT_ID")]
        agent_id: String,
    },

    /// Show lifecycle records and the creation queue
    Lifecycle,

    /// Follow domain events
    Events {
        /// Only one category (lifecycle, cortex, routing)
        #[arg(long)]
        category: Option<String>,
    },
}

pub async fn handle_command(command: AgentsCommand, node: &NodeAddress) -> Result<()> {
    let client = connect(node).await?;

    match command {
        AgentsCommand::List { dynamic, all } => {
            let agents = client.list_agents().await?;
            print_agents(&filter_agents(agents, dynamic, all));
            Ok(())
        }
        AgentsCommand::Register { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read agent file {:?}", file))?;
            let agent: StaticAgentConfig =
                serde_yaml::from_str(&content).with_context(|| format!("Invalid agent definition in {:?}", file))?;
            let agent_id = client.register_agent(&agent).await?;
            println!("{}", format!("✓ Agent registered: {}", agent_id).green());
            Ok(())
        }
        AgentsCommand::Discover {
            concept,
            intent,
            domain,
        } => {
            let candidates = client.discover(&concept, &intent, domain.as_deref()).await?;
            if candidates.is_empty() {
                println!("{}", format!("No agent handles '{}'", concept).yellow());
                return Ok(());
            }
            println!(
                "{:<4} {:<36} {:<8} {:<8} {:<8} {}",
                "#", "AGENT", "SCORE", "SUCCESS", "WEIGHT", "REGION"
            );
            for (rank, candidate) in candidates.iter().enumerate() {
                println!(
                    "{:<4} {:<36} {:<8.3} {:<8.3} {:<8.3} {}",
                    rank + 1,
                    candidate.agent.id.as_str().bold(),
                    candidate.score,
                    candidate.success_rate,
                    candidate.hebbian_weight,
                    candidate.region.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        AgentsCommand::Retire { agent_id } => {
            if client.retire_agent(&agent_id).await? {
                println!("{}", format!("✓ Agent {} retired", agent_id).green());
            } else {
                println!(
                    "{}",
                    format!("Agent {} is not a dynamic agent tracked by this node", agent_id).yellow()
                );
            }
            Ok(())
        }
        AgentsCommand::Lifecycle => {
            let view = client.lifecycle().await?;
            println!("{}", serde_yaml::to_string(&view)?);
            Ok(())
        }
        AgentsCommand::Events { category } => client.stream_events(category.as_deref()).await,
    }
}

fn filter_agents(agents: Vec<AgentInfo>, dynamic_only: bool, include_retired: bool) -> Vec<AgentInfo> {
    agents
        .into_iter()
        .filter(|a| !dynamic_only || a.agent.is_dynamic)
        .filter(|a| include_retired || a.agent.status != AgentStatus::Retired)
        .collect()
}

fn print_agents(agents: &[AgentInfo]) {
    if agents.is_empty() {
        println!("{}", "No agents found".yellow());
        return;
    }

    println!("{} agents found:", agents.len());
    println!(
        "{:<36} {:<9} {:<8} {:<19} {:<17} {}",
        "ID", "STATUS", "KIND", "TEMPLATE", "CREATED", "ENDPOINT"
    );

    for info in agents {
        let agent = &info.agent;
        let status = match agent.status {
            AgentStatus::Healthy => "healthy".green(),
            AgentStatus::Degraded => "degraded".yellow(),
            AgentStatus::Failed => "failed".red(),
            AgentStatus::Retired => "retired".dimmed(),
        };
        let kind = if agent.is_dynamic { "dynamic" } else { "static" };
        let template = agent
            .template_kind
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<36} {:<9} {:<8} {:<19} {:<17} {}",
            agent.id.as_str().bold(),
            status,
            kind,
            template,
            agent.created_at.format("%Y-%m-%d %H:%M"),
            agent.endpoint
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_cortex::{AgentId, AgentNode};

    fn info(id: &str, dynamic: bool, status: AgentStatus) -> AgentInfo {
        let mut agent = AgentNode::new_static(AgentId::from(id), id, "http://agent:1");
        agent.is_dynamic = dynamic;
        agent.status = status;
        AgentInfo {
            agent,
            lifecycle_state: None,
        }
    }

    #[test]
    fn test_filter_hides_retired_by_default() {
        let agents = vec![
            info("static-1", false, AgentStatus::Healthy),
            info("dyn-a", true, AgentStatus::Degraded),
            info("dyn-b", true, AgentStatus::Retired),
        ];

        let visible = filter_agents(agents.clone(), false, false);
        assert_eq!(visible.len(), 2);

        let dynamic = filter_agents(agents.clone(), true, false);
        assert_eq!(dynamic.len(), 1);
        assert_eq!(dynamic[0].agent.id.as_str(), "dyn-a");

        assert_eq!(filter_agents(agents, true, true).len(), 2);
    }
}
