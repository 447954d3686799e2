// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Runtime abstraction for dynamically provisioned agents.
//!
//! A runtime turns a template plus a knowledge payload into a running agent
//! that speaks the agent protocol on an allocated port. Build and start are
//! separate steps so the lifecycle manager can report which one failed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use synapse_cortex::AgentId;
use synapse_sdk::{KnowledgePayload, TemplateKind};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu_millis: Option<u32>,
    pub memory_bytes: Option<u64>,
}

/// Everything a runtime needs to launch one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLaunchSpec {
    pub agent_id: AgentId,
    pub template: TemplateKind,
    pub knowledge: KnowledgePayload,
    pub port: u16,
    pub resources: ResourceLimits,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output of the build step, consumed by start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentArtifact {
    /// Image, binary path or template name, depending on the runtime
    pub reference: String,
    pub template: TemplateKind,
}

/// A started agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInstance {
    pub id: InstanceId,
    /// Base URL of the agent protocol
    pub endpoint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Running,
    Exited,
    Unknown,
}

#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("Failed to build agent: {0}")]
    BuildFailed(String),
    #[error("Failed to start agent: {0}")]
    StartFailed(String),
    #[error("Failed to stop agent: {0}")]
    StopFailed(String),
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),
}

#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Prepare whatever `start` needs (pull an image, locate a binary)
    async fn build(&self, spec: &AgentLaunchSpec) -> Result<AgentArtifact, RuntimeError>;

    async fn start(&self, spec: &AgentLaunchSpec, artifact: &AgentArtifact) -> Result<AgentInstance, RuntimeError>;

    /// Stop and clean up. Stopping an instance that already exited is not an error.
    async fn stop(&self, id: &InstanceId) -> Result<(), RuntimeError>;

    async fn status(&self, id: &InstanceId) -> Result<InstanceStatus, RuntimeError>;
}
