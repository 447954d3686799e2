// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Child-process runtime: each dynamic agent is `synapse agent serve` in its
//! own process on the allocated port.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use synapse_sdk::template::KNOWLEDGE_ENV_VAR;

use crate::domain::runtime::{
    AgentArtifact, AgentInstance, AgentLaunchSpec, AgentRuntime, InstanceId, InstanceStatus, RuntimeError,
};

pub struct ProcessRuntime {
    binary: Option<PathBuf>,
    agent_host: String,
    children: Mutex<HashMap<InstanceId, Child>>,
}

impl ProcessRuntime {
    /// `binary` defaults to the running executable
    pub fn new(binary: Option<PathBuf>, agent_host: impl Into<String>) -> Self {
        Self {
            binary,
            agent_host: agent_host.into(),
            children: Mutex::new(HashMap::new()),
        }
    }

    fn resolve_binary(&self) -> Result<PathBuf, RuntimeError> {
        let path = match &self.binary {
            Some(path) => path.clone(),
            None => std::env::current_exe()
                .map_err(|e| RuntimeError::BuildFailed(format!("Cannot locate current executable: {}", e)))?,
        };
        if !path.exists() {
            return Err(RuntimeError::BuildFailed(format!(
                "Agent binary not found: {}",
                path.display()
            )));
        }
        Ok(path)
    }
}

#[async_trait]
impl AgentRuntime for ProcessRuntime {
    async fn build(&self, spec: &AgentLaunchSpec) -> Result<AgentArtifact, RuntimeError> {
        let binary = self.resolve_binary()?;
        debug!(agent_id = %spec.agent_id, binary = %binary.display(), "Agent binary resolved");
        Ok(AgentArtifact {
            reference: binary.to_string_lossy().into_owned(),
            template: spec.template,
        })
    }

    async fn start(&self, spec: &AgentLaunchSpec, artifact: &AgentArtifact) -> Result<AgentInstance, RuntimeError> {
        let knowledge = spec
            .knowledge
            .to_env_value()
            .map_err(|e| RuntimeError::StartFailed(format!("Failed to encode knowledge payload: {}", e)))?;

        let child = Command::new(&artifact.reference)
            .args(["agent", "serve", "--id"])
            .arg(spec.agent_id.as_str())
            .arg("--template")
            .arg(artifact.template.as_str())
            .arg("--bind")
            .arg(&self.agent_host)
            .arg("--port")
            .arg(spec.port.to_string())
            .env(KNOWLEDGE_ENV_VAR, knowledge)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RuntimeError::StartFailed(format!("Failed to spawn {}: {}", artifact.reference, e)))?;

        let pid = child.id().unwrap_or_default();
        let id = InstanceId::new(format!("pid-{}-{}", pid, spec.agent_id));
        self.children.lock().insert(id.clone(), child);

        info!(agent_id = %spec.agent_id, pid, port = spec.port, "Spawned agent process");
        Ok(AgentInstance {
            id,
            endpoint: format!("http://{}:{}", self.agent_host, spec.port),
        })
    }

    async fn stop(&self, id: &InstanceId) -> Result<(), RuntimeError> {
        let child = self.children.lock().remove(id);
        let Some(mut child) = child else {
            debug!("Agent process {} already gone", id);
            return Ok(());
        };

        if let Err(e) = child.kill().await {
            warn!("Failed to kill agent process {}: {}", id, e);
            return Err(RuntimeError::StopFailed(e.to_string()));
        }
        info!("Stopped agent process: {}", id);
        Ok(())
    }

    async fn status(&self, id: &InstanceId) -> Result<InstanceStatus, RuntimeError> {
        let mut children = self.children.lock();
        let child = children
            .get_mut(id)
            .ok_or_else(|| RuntimeError::InstanceNotFound(id.to_string()))?;
        match child.try_wait() {
            Ok(None) => Ok(InstanceStatus::Running),
            Ok(Some(_)) => Ok(InstanceStatus::Exited),
            Err(_) => Ok(InstanceStatus::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_cortex::AgentId;
    use synapse_sdk::{KnowledgePayload, TemplateKind};

    fn spec() -> AgentLaunchSpec {
        AgentLaunchSpec {
            agent_id: AgentId::from("dyn-entropy-1"),
            template: TemplateKind::BasicKnowledge,
            knowledge: KnowledgePayload::fallback("entropy"),
            port: 41_999,
            resources: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_fails_build() {
        let runtime = ProcessRuntime::new(Some(PathBuf::from("/nonexistent/synapse")), "127.0.0.1");
        let err = runtime.build(&spec()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::BuildFailed(_)));
    }

    #[tokio::test]
    async fn test_stop_unknown_instance_is_ok() {
        let runtime = ProcessRuntime::new(None, "127.0.0.1");
        runtime.stop(&InstanceId::new("pid-0-x")).await.unwrap();
        assert!(matches!(
            runtime.status(&InstanceId::new("pid-0-x")).await,
            Err(RuntimeError::InstanceNotFound(_))
        ));
    }
}
