// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::time::Duration;

use synapse_sdk::{AgentClientError, HealthResponse, ProcessRequest, ProcessResponse};

/// Outbound side of the agent protocol: dispatch, research and health probes
#[async_trait]
pub trait AgentGateway: Send + Sync {
    async fn health(&self, endpoint: &str, timeout: Duration) -> Result<HealthResponse, AgentClientError>;

    async fn process(
        &self,
        endpoint: &str,
        request: &ProcessRequest,
        timeout: Duration,
    ) -> Result<ProcessResponse, AgentClientError>;
}
