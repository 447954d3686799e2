// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Task routing commands
//!
//! Commands: run

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::Value;
use uuid::Uuid;

use synapse_cortex::application::QueryContext;
use synapse_orchestrator_core::domain::task::{QueryRequest, QueryResponse, Task, TaskStatus};

use crate::daemon::{connect, NodeAddress};

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Route one or more tasks through the node
    Run {
        /// Tasks as INTENT:CONCEPT, e.g. define:entropy
        #[arg(value_name = "TASK", required = true)]
        tasks: Vec<String>,

        /// Arguments passed to every task (JSON string or @file.json)
        #[arg(short, long, value_name = "ARGS")]
        args: Option<String>,

        /// Preferred domain for ranking
        #[arg(long)]
        domain: Option<String>,

        /// Print the raw response as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle_command(command: TaskCommand, node: &NodeAddress) -> Result<()> {
    match command {
        TaskCommand::Run {
            tasks,
            args,
            domain,
            json,
        } => {
            let args = parse_args(args.as_deref())?;
            let request = build_request(&tasks, args, domain)?;
            let client = connect(node).await?;
            let response = client.process(&request).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&request, &response);
            }
            Ok(())
        }
    }
}

fn parse_args(raw: Option<&str>) -> Result<Value> {
    let Some(raw) = raw else {
        return Ok(Value::Null);
    };
    let content = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read args file {}", path))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&content).context("Task arguments must be valid JSON")
}

fn build_request(specs: &[String], args: Value, domain: Option<String>) -> Result<QueryRequest> {
    let tasks = specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let (intent, concept) = spec
                .split_once(':')
                .filter(|(intent, concept)| !intent.trim().is_empty() && !concept.trim().is_empty())
                .with_context(|| format!("Invalid task '{}', expected INTENT:CONCEPT", spec))?;
            Ok(Task::new(
                format!("t{}", i + 1),
                intent.trim(),
                concept.trim(),
                args.clone(),
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QueryRequest {
        query_id: Uuid::new_v4().to_string(),
        tasks,
        context: QueryContext { domain },
    })
}

fn print_response(request: &QueryRequest, response: &QueryResponse) {
    println!("Query {}", response.query_id.dimmed());

    for task in &request.tasks {
        let Some(result) = response.collected_results.get(&task.task_id) else {
            println!("  {} {}:{} {}", task.task_id, task.intent, task.concept, "missing".red());
            continue;
        };

        let status = match result.status {
            TaskStatus::Success => "success".green(),
            TaskStatus::Queued => "queued".yellow(),
            TaskStatus::Error => "error".red(),
        };
        let agent = result.agent.as_deref().unwrap_or("-");
        println!(
            "  {} {}:{} {} via {}",
            task.task_id.bold(),
            task.intent,
            task.concept,
            status,
            agent
        );
        if let Some(confidence) = result.confidence {
            println!("    confidence: {:.2}", confidence);
        }
        let body = serde_json::to_string_pretty(&result.data).unwrap_or_default();
        for line in body.lines() {
            println!("    {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_from_task_specs() {
        let request = build_request(
            &["define:entropy".to_string(), "explain: Quantum Computer".to_string()],
            serde_json::json!({"depth": 2}),
            Some("Science".into()),
        )
        .unwrap();

        assert_eq!(request.tasks.len(), 2);
        assert_eq!(request.tasks[0].task_id, "t1");
        assert_eq!(request.tasks[0].intent, "define");
        assert_eq!(request.tasks[1].concept, "Quantum Computer");
        assert_eq!(request.tasks[1].args["depth"], 2);
        assert_eq!(request.context.domain.as_deref(), Some("Science"));
        assert!(Uuid::parse_str(&request.query_id).is_ok());
    }

    #[test]
    fn test_malformed_task_spec_is_rejected() {
        assert!(build_request(&["entropy".to_string()], Value::Null, None).is_err());
        assert!(build_request(&["define:".to_string()], Value::Null, None).is_err());
    }

    #[test]
    fn test_args_from_inline_json_and_file() {
        assert_eq!(parse_args(None).unwrap(), Value::Null);
        assert_eq!(parse_args(Some(r#"{"a":1}"#)).unwrap()["a"], 1);
        assert!(parse_args(Some("not json")).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("args.json");
        std::fs::write(&path, r#"{"expression":"2+2"}"#).unwrap();
        let args = parse_args(Some(&format!("@{}", path.display()))).unwrap();
        assert_eq!(args["expression"], "2+2");
    }
}
