// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use synapse_orchestrator_core::domain::node_config::{
    LoggingConfig, MetricsConfig, ObservabilityConfig, StaticAgentConfig, SynapseConfigManifest, CONFIG_PATH_ENV,
};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./synapse-config.yaml")]
        output: PathBuf,

        /// Include a sample static agent and observability settings
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(&output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = SynapseConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./synapse-config.yaml");
        println!("  4. ~/.synapse/config.yaml");
        println!("  5. /etc/synapse/config.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Node:".bold());
    println!("  Name: {}", config.metadata.name);
    println!("  API: {}:{}", spec.network.bind_address, spec.network.port);
    println!("  Dispatch timeout: {}ms", spec.network.dispatch_timeout_ms);
    println!();

    println!("{}", "Hebbian learning:".bold());
    println!(
        "  Delta: +{} / -{}",
        spec.hebbian.delta_success, spec.hebbian.delta_failure
    );
    println!(
        "  Decay: {} every {}s",
        spec.hebbian.decay_rate, spec.hebbian.decay_interval_secs
    );
    println!();

    println!("{}", "Lifecycle:".bold());
    let lifecycle = &spec.lifecycle;
    println!("  Max concurrent agents: {}", lifecycle.max_concurrent_agents);
    println!(
        "  Ports: {}-{}",
        lifecycle.port_range_start, lifecycle.port_range_end
    );
    println!(
        "  Idle timeout: {}min, max age: {}h",
        lifecycle.idle_timeout_min, lifecycle.max_age_hours
    );
    println!("  Duplicate requests: {:?}", lifecycle.duplicate_request_policy);
    println!("  Runtime: {:?}", spec.runtime.isolation);
    println!();

    println!("{}", "Static agents:".bold());
    if spec.agents.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for agent in &spec.agents {
        println!(
            "  {} → {} [{}]",
            agent.id.bold(),
            agent.endpoint,
            agent.concepts.join(", ")
        );
    }
    println!();

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = SynapseConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: &Path, with_examples: bool) -> Result<()> {
    sample_config(with_examples)
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

fn sample_config(with_examples: bool) -> SynapseConfigManifest {
    let mut config = SynapseConfigManifest::default();
    if with_examples {
        config.spec.agents.push(StaticAgentConfig {
            id: "physics-agent".to_string(),
            name: Some("Physics reference agent".to_string()),
            endpoint: "http://127.0.0.1:9001".to_string(),
            capabilities: vec!["define".to_string(), "explain".to_string()],
            concepts: vec!["entropy".to_string(), "thermodynamics".to_string()],
            region: "Science".to_string(),
            complexity_score: 0.6,
        });
        config.spec.observability = Some(ObservabilityConfig {
            logging: Some(LoggingConfig::default()),
            metrics: Some(MetricsConfig::default()),
        });
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_config_round_trips_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synapse-config.yaml");

        generate(&path, true).unwrap();

        let loaded = SynapseConfigManifest::from_yaml_file(&path).unwrap();
        assert!(loaded.validate().is_ok());
        assert_eq!(loaded.spec.agents.len(), 1);
        assert_eq!(loaded.spec.agents[0].id, "physics-agent");
        assert!(loaded.spec.observability.is_some());
    }

    #[test]
    fn test_minimal_config_has_no_agents() {
        let config = sample_config(false);
        assert!(config.spec.agents.is_empty());
        assert!(config.validate().is_ok());
    }
}
