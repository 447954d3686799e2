// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-process runtime: each dynamic agent is a tokio task serving its
//! template behaviour on the allocated port of the orchestrator host.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use synapse_sdk::AgentBehavior;

use crate::domain::runtime::{
    AgentArtifact, AgentInstance, AgentLaunchSpec, AgentRuntime, InstanceId, InstanceStatus, RuntimeError,
};

const STOP_GRACE: Duration = Duration::from_secs(5);

struct RunningAgent {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct InProcessRuntime {
    host: String,
    agents: Mutex<HashMap<InstanceId, RunningAgent>>,
}

impl InProcessRuntime {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            agents: Mutex::new(HashMap::new()),
        }
    }

    pub fn running(&self) -> usize {
        self.agents.lock().len()
    }
}

#[async_trait]
impl AgentRuntime for InProcessRuntime {
    async fn build(&self, spec: &AgentLaunchSpec) -> Result<AgentArtifact, RuntimeError> {
        // behaviours are compiled in
        Ok(AgentArtifact {
            reference: format!("builtin:{}", spec.template),
            template: spec.template,
        })
    }

    async fn start(&self, spec: &AgentLaunchSpec, artifact: &AgentArtifact) -> Result<AgentInstance, RuntimeError> {
        let addr = format!("{}:{}", self.host, spec.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RuntimeError::StartFailed(format!("Failed to bind {}: {}", addr, e)))?;

        let behavior = AgentBehavior::new(artifact.template, spec.knowledge.clone());
        let shutdown = CancellationToken::new();
        let agent_id = spec.agent_id.to_string();
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = synapse_sdk::server::serve(listener, agent_id.clone(), behavior, token).await {
                warn!(agent_id = %agent_id, error = %e, "In-process agent server exited with error");
            }
        });

        let id = InstanceId::new(format!("task-{}", spec.agent_id));
        self.agents
            .lock()
            .insert(id.clone(), RunningAgent { shutdown, handle });

        info!(agent_id = %spec.agent_id, %addr, "Started in-process agent");
        Ok(AgentInstance {
            id,
            endpoint: format!("http://{}", addr),
        })
    }

    async fn stop(&self, id: &InstanceId) -> Result<(), RuntimeError> {
        let agent = self.agents.lock().remove(id);
        let Some(agent) = agent else {
            debug!("In-process agent {} already gone", id);
            return Ok(());
        };

        agent.shutdown.cancel();
        let abort = agent.handle.abort_handle();
        if tokio::time::timeout(STOP_GRACE, agent.handle).await.is_err() {
            warn!("In-process agent {} did not stop within {:?}, aborting", id, STOP_GRACE);
            abort.abort();
        }
        info!("Stopped in-process agent: {}", id);
        Ok(())
    }

    async fn status(&self, id: &InstanceId) -> Result<InstanceStatus, RuntimeError> {
        let agents = self.agents.lock();
        let agent = agents
            .get(id)
            .ok_or_else(|| RuntimeError::InstanceNotFound(id.to_string()))?;
        if agent.handle.is_finished() {
            Ok(InstanceStatus::Exited)
        } else {
            Ok(InstanceStatus::Running)
        }
    }
}
