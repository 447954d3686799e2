// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Template agent hosting
//!
//! `synapse agent serve` runs one template agent over the agent protocol.
//! The process and Docker runtimes launch it with the knowledge payload in
//! `SYNAPSE_AGENT_KNOWLEDGE`.

use anyhow::{Context, Result};
use clap::Subcommand;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use synapse_sdk::template::KNOWLEDGE_ENV_VAR;
use synapse_sdk::{AgentBehavior, KnowledgePayload, TemplateKind};

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Serve one template agent until interrupted
    Serve {
        /// Agent identifier reported by /health
        #[arg(long)]
        id: String,

        /// Template behaviour (basic_knowledge, enhanced_knowledge, function, specialist)
        #[arg(long)]
        template: TemplateKind,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        #[arg(long)]
        port: u16,

        /// Concept used when no knowledge payload is provided
        #[arg(long)]
        concept: Option<String>,
    },
}

pub async fn handle_command(command: AgentCommand) -> Result<()> {
    match command {
        AgentCommand::Serve {
            id,
            template,
            bind,
            port,
            concept,
        } => serve(id, template, bind, port, concept).await,
    }
}

async fn serve(id: String, template: TemplateKind, bind: String, port: u16, concept: Option<String>) -> Result<()> {
    let knowledge = load_knowledge(std::env::var(KNOWLEDGE_ENV_VAR).ok(), concept.as_deref().unwrap_or(&id))?;
    let behavior = AgentBehavior::new(template, knowledge);

    let addr = format!("{}:{}", bind, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind agent to {}", addr))?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_termination().await;
        info!("Termination requested");
        trigger.cancel();
    });

    synapse_sdk::server::serve(listener, id, behavior, shutdown).await
}

fn load_knowledge(encoded: Option<String>, fallback_concept: &str) -> Result<KnowledgePayload> {
    match encoded {
        Some(value) => KnowledgePayload::from_env_value(&value)
            .with_context(|| format!("{} does not hold a valid knowledge payload", KNOWLEDGE_ENV_VAR)),
        None => {
            warn!(
                concept = fallback_concept,
                "{} is not set; serving fallback knowledge", KNOWLEDGE_ENV_VAR
            );
            Ok(KnowledgePayload::fallback(fallback_concept))
        }
    }
}

async fn wait_for_termination() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
