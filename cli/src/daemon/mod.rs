// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Node mode implementation
//!
//! Handles:
//! - Node bootstrap and graceful shutdown
//! - HTTP health checks against a running node
//! - The API client used by the management commands

use anyhow::Result;
use std::time::Duration;

pub mod client;
pub mod server;

pub use client::NodeClient;
pub use server::start_node;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8700;

/// Where the management commands find the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress {
    pub base_url: String,
}

impl NodeAddress {
    pub fn resolve(host: Option<String>, port: Option<u16>) -> Self {
        let host = host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = port.unwrap_or(DEFAULT_PORT);
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}:{}", host.trim_end_matches('/'), port)
        } else {
            format!("http://{}:{}", host, port)
        };
        Self { base_url }
    }
}

#[derive(Debug, Clone)]
pub enum NodeStatus {
    Running { uptime: Option<u64>, active_dynamic_agents: Option<u64> },
    Stopped,
    Unhealthy { error: String },
}

/// Check whether a node answers its health endpoint
pub async fn check_node_running(node: &NodeAddress) -> Result<NodeStatus> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(500))
        .build()?;

    let health_url = format!("{}/health", node.base_url);

    match client.get(&health_url).send().await {
        Ok(resp) if resp.status().is_success() => {
            let body = resp.json::<serde_json::Value>().await.ok();
            Ok(NodeStatus::Running {
                uptime: body.as_ref().and_then(|v| v["uptime_seconds"].as_u64()),
                active_dynamic_agents: body.as_ref().and_then(|v| v["active_dynamic_agents"].as_u64()),
            })
        }
        Ok(resp) => Ok(NodeStatus::Unhealthy {
            error: format!("HTTP {}", resp.status()),
        }),
        Err(e) if e.is_connect() || e.is_timeout() => Ok(NodeStatus::Stopped),
        Err(e) => Ok(NodeStatus::Unhealthy { error: e.to_string() }),
    }
}

/// Client for a node that is known to be up
pub async fn connect(node: &NodeAddress) -> Result<NodeClient> {
    match check_node_running(node).await? {
        NodeStatus::Running { .. } => NodeClient::new(node.base_url.clone()),
        NodeStatus::Unhealthy { error } => {
            anyhow::bail!("Node at {} is unhealthy: {}", node.base_url, error)
        }
        NodeStatus::Stopped => anyhow::bail!(
            "No node is running at {}. Start one with 'synapse serve'.",
            node.base_url
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_address_resolution() {
        assert_eq!(NodeAddress::resolve(None, None).base_url, "http://127.0.0.1:8700");
        assert_eq!(
            NodeAddress::resolve(Some("node.local".into()), Some(9000)).base_url,
            "http://node.local:9000"
        );
        assert_eq!(
            NodeAddress::resolve(Some("https://node.example/".into()), Some(443)).base_url,
            "https://node.example:443"
        );
    }

    #[tokio::test]
    async fn test_running_node_reports_uptime() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"healthy","uptime_seconds":42,"active_dynamic_agents":3}"#)
            .create_async()
            .await;

        let node = NodeAddress { base_url: server.url() };
        match check_node_running(&node).await.unwrap() {
            NodeStatus::Running {
                uptime,
                active_dynamic_agents,
            } => {
                assert_eq!(uptime, Some(42));
                assert_eq!(active_dynamic_agents, Some(3));
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_is_unhealthy() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/health").with_status(500).create_async().await;

        let node = NodeAddress { base_url: server.url() };
        assert!(matches!(
            check_node_running(&node).await.unwrap(),
            NodeStatus::Unhealthy { .. }
        ));
    }
}
