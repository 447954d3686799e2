// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::time::Duration;

use synapse_sdk::{AgentClient, AgentClientError, HealthResponse, ProcessRequest, ProcessResponse};

use crate::domain::gateway::AgentGateway;

/// [`AgentGateway`] over HTTP, sharing one connection pool
#[derive(Clone, Default)]
pub struct HttpAgentGateway {
    client: AgentClient,
}

impl HttpAgentGateway {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;
        Ok(Self {
            client: AgentClient::with_client(client),
        })
    }
}

#[async_trait]
impl AgentGateway for HttpAgentGateway {
    async fn health(&self, endpoint: &str, timeout: Duration) -> Result<HealthResponse, AgentClientError> {
        self.client.health(endpoint, timeout).await
    }

    async fn process(
        &self,
        endpoint: &str,
        request: &ProcessRequest,
        timeout: Duration,
    ) -> Result<ProcessResponse, AgentClientError> {
        self.client.process(endpoint, request, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gateway_dispatches_over_http() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"healthy"}"#)
            .create_async()
            .await;

        let gateway = HttpAgentGateway::new().unwrap();
        let health = gateway
            .health(&server.url(), Duration::from_secs(2))
            .await
            .unwrap();
        assert!(health.is_healthy());
    }
}
