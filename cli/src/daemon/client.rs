// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for communicating with a node's API

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use synapse_cortex::AgentNode;
use synapse_orchestrator_core::domain::lifecycle::LifecycleState;
use synapse_orchestrator_core::domain::node_config::StaticAgentConfig;
use synapse_orchestrator_core::domain::task::{QueryRequest, QueryResponse};

#[derive(Debug, Clone)]
pub struct NodeClient {
    client: Client,
    base_url: String,
}

impl NodeClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            // No global timeout: /process may wait on neurogenesis and /events is long-lived
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("Failed to reach node")?;

        parse_json(response, "health check").await
    }

    pub async fn process(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let response = self
            .client
            .post(format!("{}/process", self.base_url))
            .json(request)
            .send()
            .await
            .context("Failed to submit query")?;

        parse_json(response, "process query").await
    }

    pub async fn list_agents(&self) -> Result<Vec<AgentInfo>> {
        let response = self
            .client
            .get(format!("{}/agents", self.base_url))
            .send()
            .await
            .context("Failed to list agents")?;

        parse_json(response, "list agents").await
    }

    pub async fn register_agent(&self, agent: &StaticAgentConfig) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/agents", self.base_url))
            .json(agent)
            .send()
            .await
            .context("Failed to register agent")?;

        #[derive(Deserialize)]
        struct RegisterResponse {
            agent_id: String,
        }

        let registered: RegisterResponse = parse_json(response, "register agent").await?;
        Ok(registered.agent_id)
    }

    /// Returns false when the node does not track the agent
    pub async fn retire_agent(&self, agent_id: &str) -> Result<bool> {
        let response = self
            .client
            .delete(format!("{}/agents/{}", self.base_url, agent_id))
            .send()
            .await
            .context("Failed to retire agent")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to retire agent: {}", error_text);
        }
        Ok(true)
    }

    pub async fn discover(&self, concept: &str, intent: &str, domain: Option<&str>) -> Result<Vec<CandidateInfo>> {
        let mut query = vec![("concept", concept), ("intent", intent)];
        if let Some(domain) = domain {
            query.push(("domain", domain));
        }
        let response = self
            .client
            .get(format!("{}/discover", self.base_url))
            .query(&query)
            .send()
            .await
            .context("Failed to query discovery")?;

        #[derive(Deserialize)]
        struct DiscoverResponse {
            candidates: Vec<CandidateInfo>,
        }

        let body: DiscoverResponse = parse_json(response, "discover").await?;
        Ok(body.candidates)
    }

    pub async fn lifecycle(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/lifecycle", self.base_url))
            .send()
            .await
            .context("Failed to fetch lifecycle state")?;

        parse_json(response, "lifecycle").await
    }

    /// Print domain events until the node closes the stream
    pub async fn stream_events(&self, category: Option<&str>) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/events", self.base_url))
            .send()
            .await
            .context("Failed to connect to event stream")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to stream events: {}", error_text);
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read event stream chunk")?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(end) = buffer.find('\n') {
                let line = buffer[..end].trim_end_matches('\r').to_string();
                buffer.drain(..=end);

                if let Some(json_str) = line.strip_prefix("data:") {
                    if let Ok(event) = serde_json::from_str::<serde_json::Value>(json_str.trim_start()) {
                        if category.is_some_and(|c| event["type"].as_str() != Some(c)) {
                            continue;
                        }
                        print_event(&event);
                    }
                }
            }
        }

        Ok(())
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response, action: &str) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Failed to {} ({}): {}", action, status, error_text);
    }

    response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", action))
}

/// Row of `GET /agents`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentInfo {
    #[serde(flatten)]
    pub agent: AgentNode,
    #[serde(default)]
    pub lifecycle_state: Option<LifecycleState>,
}

/// Ranked candidate of `GET /discover`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CandidateInfo {
    pub agent: AgentNode,
    #[serde(default)]
    pub region: Option<String>,
    pub score: f64,
    pub success_rate: f64,
    pub hebbian_weight: f64,
}

fn print_event(event: &serde_json::Value) {
    use colored::Colorize;

    let category = event["type"].as_str().unwrap_or("unknown");
    let payload = &event["payload"];
    let name = payload["event"].as_str().unwrap_or("event");

    let label = match category {
        "lifecycle" => format!("[{}]", category).magenta(),
        "cortex" => format!("[{}]", category).cyan(),
        "routing" => format!("[{}]", category).yellow(),
        _ => format!("[{}]", category).normal(),
    };

    let mut fields: Vec<String> = Vec::new();
    if let Some(object) = payload.as_object() {
        for (key, value) in object {
            if key == "event" {
                continue;
            }
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            fields.push(format!("{}={}", key, rendered));
        }
    }

    println!("{} {} {}", label, name.bold(), fields.join(" ").dimmed());
}
