// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::types::{HealthResponse, ProcessRequest, ProcessResponse};

#[derive(Debug, Clone, Error)]
pub enum AgentClientError {
    #[error("Agent at {endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("Agent at {endpoint} is unreachable: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("Agent at {endpoint} answered HTTP {status}")]
    HttpStatus { endpoint: String, status: u16 },

    #[error("Agent at {endpoint} returned an invalid body: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl AgentClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentClientError::Timeout { .. })
    }
}

/// HTTP client for the agent protocol.
///
/// Timeouts are per call so dispatch, research and health probes can each
/// apply their own deadline through one shared connection pool.
#[derive(Clone, Default)]
pub struct AgentClient {
    client: Client,
}

impl AgentClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// `GET {endpoint}/health`
    pub async fn health(
        &self,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<HealthResponse, AgentClientError> {
        let url = format!("{}/health", endpoint.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(endpoint, timeout, e))?;

        if !response.status().is_success() {
            return Err(AgentClientError::HttpStatus {
                endpoint: endpoint.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json::<HealthResponse>()
            .await
            .map_err(|e| classify(endpoint, timeout, e))
    }

    /// `POST {endpoint}/process`
    pub async fn process(
        &self,
        endpoint: &str,
        request: &ProcessRequest,
        timeout: Duration,
    ) -> Result<ProcessResponse, AgentClientError> {
        let url = format!("{}/process", endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(endpoint, timeout, e))?;

        if !response.status().is_success() {
            return Err(AgentClientError::HttpStatus {
                endpoint: endpoint.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json::<ProcessResponse>()
            .await
            .map_err(|e| classify(endpoint, timeout, e))
    }
}

fn classify(endpoint: &str, timeout: Duration, error: reqwest::Error) -> AgentClientError {
    if error.is_timeout() {
        AgentClientError::Timeout {
            endpoint: endpoint.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else if error.is_decode() {
        AgentClientError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: error.to_string(),
        }
    } else {
        AgentClientError::Unreachable {
            endpoint: endpoint.to_string(),
            reason: error.to_string(),
        }
    }
}
