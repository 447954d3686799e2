// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Synapse CLI
//!
//! The `synapse` binary runs an orchestrator node, hosts template agents and
//! talks to a running node over its HTTP API.
//!
//! ## Commands
//!
//! - `synapse serve` - Run an orchestrator node
//! - `synapse agent serve` - Run one template agent (spawned by the process and Docker runtimes)
//! - `synapse task run` - Route tasks through a running node
//! - `synapse agents list|discover|retire` - Inspect and manage the agent graph
//! - `synapse config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use synapse_cli::commands::{self, AgentCommand, AgentsCommand, ConfigCommand, TaskCommand};
use synapse_cli::daemon::{self, NodeAddress};
use synapse_orchestrator_core::domain::node_config::SynapseConfigManifest;

/// Synapse - graph-backed agent discovery with neurogenesis
#[derive(Parser)]
#[command(name = "synapse")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "SYNAPSE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Node API host (bind address for `serve`, target for client commands)
    #[arg(long, global = true, env = "SYNAPSE_HOST")]
    host: Option<String>,

    /// Node API port
    #[arg(long, global = true, env = "SYNAPSE_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SYNAPSE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an orchestrator node
    #[command(name = "serve")]
    Serve,

    /// Template agent hosting
    #[command(name = "agent")]
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },

    /// Agent graph management on a running node
    #[command(name = "agents")]
    Agents {
        #[command(subcommand)]
        command: AgentsCommand,
    },

    /// Task routing
    #[command(name = "task")]
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is not an error
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve) => {
            let config = SynapseConfigManifest::load_or_default(cli.config.clone())
                .context("Failed to load configuration")?;
            let logging = config
                .spec
                .observability
                .as_ref()
                .and_then(|o| o.logging.clone())
                .unwrap_or_default();
            let level = cli.log_level.as_deref().unwrap_or(&logging.level);
            init_logging(level, logging.format.eq_ignore_ascii_case("json"))?;
            daemon::start_node(config, cli.host, cli.port).await
        }
        Some(Commands::Agent { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"), false)?;
            commands::agent::handle_command(command).await
        }
        Some(Commands::Agents { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), false)?;
            let node = NodeAddress::resolve(cli.host, cli.port);
            commands::agents::handle_command(command, &node).await
        }
        Some(Commands::Task { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), false)?;
            let node = NodeAddress::resolve(cli.host, cli.port);
            commands::task::handle_command(command, &node).await
        }
        Some(Commands::Config { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), false)?;
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
