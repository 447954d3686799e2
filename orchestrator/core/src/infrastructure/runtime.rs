// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Docker runtime: each dynamic agent runs `synapse agent serve` in its own
//! container, with the allocated port published on the host.

use async_trait::async_trait;
use bollard::container::{Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::ContainerStateStatusEnum;
use bollard::service::{HostConfig, PortBinding};
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use synapse_sdk::template::KNOWLEDGE_ENV_VAR;

use crate::domain::node_config::RuntimeConfig;
use crate::domain::runtime::{
    AgentArtifact, AgentInstance, AgentLaunchSpec, AgentRuntime, InstanceId, InstanceStatus, RuntimeError,
};

pub struct DockerRuntime {
    docker: Docker,
    image: String,
    autopull: bool,
    network_mode: Option<String>,
    agent_host: String,
}

impl DockerRuntime {
    pub fn new(settings: &RuntimeConfig, agent_host: impl Into<String>) -> Result<Self, RuntimeError> {
        let docker = if let Some(path) = &settings.docker_socket_path {
            #[cfg(unix)]
            let result = Docker::connect_with_unix(path, 120, bollard::API_DEFAULT_VERSION);

            #[cfg(windows)]
            let result = Docker::connect_with_named_pipe(path, 120, bollard::API_DEFAULT_VERSION);

            result.map_err(|e| {
                RuntimeError::StartFailed(format!(
                    "Failed to connect to Docker at {}: {}\n\n\
                     Ensure Docker is running and the socket path is correct.",
                    path, e
                ))
            })?
        } else {
            Docker::connect_with_local_defaults().map_err(|e| {
                RuntimeError::StartFailed(format!(
                    "Failed to connect to Docker: {}\n\n\
                     Common causes:\n\
                     - Docker daemon not running (check: docker ps)\n\
                     - Permission denied accessing Docker socket\n\
                     - On Linux: Current user not in 'docker' group",
                    e
                ))
            })?
        };

        Ok(Self {
            docker,
            image: settings.agent_image.clone(),
            autopull: settings.autopull,
            network_mode: settings.docker_network.clone(),
            agent_host: agent_host.into(),
        })
    }

    /// Verify Docker daemon is accessible
    pub async fn healthcheck(&self) -> Result<(), RuntimeError> {
        self.docker.ping().await.map_err(|e| {
            RuntimeError::StartFailed(format!(
                "Cannot connect to Docker daemon: {}\n\nVerify with: docker ps",
                e
            ))
        })?;
        Ok(())
    }

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        info!("Pulling image: {}", image);
        let options = Some(CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        });

        let mut stream = self.docker.create_image(options, None, None);
        while let Some(result) = stream.next().await {
            if let Err(e) = result {
                return Err(RuntimeError::BuildFailed(format!(
                    "Failed to pull image {}: {}\n\nTry manually: docker pull {}",
                    image, e, image
                )));
            }
        }
        info!("Successfully pulled image: {}", image);
        Ok(())
    }
}

fn is_not_found(error: &BollardError) -> bool {
    matches!(
        error,
        BollardError::DockerResponseServerError { status_code: 404, .. }
    )
}

fn container_name(spec: &AgentLaunchSpec) -> String {
    format!("synapse-agent-{}", spec.agent_id)
}

#[async_trait]
impl AgentRuntime for DockerRuntime {
    async fn build(&self, spec: &AgentLaunchSpec) -> Result<AgentArtifact, RuntimeError> {
        let image_exists = self.docker.inspect_image(&self.image).await.is_ok();
        if !image_exists {
            if !self.autopull {
                return Err(RuntimeError::BuildFailed(format!(
                    "Image {} not found locally and autopull is disabled",
                    self.image
                )));
            }
            self.pull_image(&self.image).await?;
        }

        debug!(agent_id = %spec.agent_id, image = %self.image, "Agent image ready");
        Ok(AgentArtifact {
            reference: self.image.clone(),
            template: spec.template,
        })
    }

    async fn start(&self, spec: &AgentLaunchSpec, artifact: &AgentArtifact) -> Result<AgentInstance, RuntimeError> {
        let container_port = format!("{}/tcp", spec.port);

        let mut host_config = HostConfig {
            port_bindings: Some(HashMap::from([(
                container_port.clone(),
                Some(vec![PortBinding {
                    host_ip: Some(self.agent_host.clone()),
                    host_port: Some(spec.port.to_string()),
                }]),
            )])),
            network_mode: self.network_mode.clone(),
            ..Default::default()
        };

        if let Some(memory_bytes) = spec.resources.memory_bytes {
            host_config.memory = Some(memory_bytes as i64);
        }
        if let Some(cpu_millis) = spec.resources.cpu_millis {
            // Docker nano_cpus: 1 CPU = 1e9 nano CPUs, 1 milli CPU = 1e6 nano CPUs
            host_config.nano_cpus = Some((cpu_millis as i64) * 1_000_000);
        }

        let knowledge = spec
            .knowledge
            .to_env_value()
            .map_err(|e| RuntimeError::StartFailed(format!("Failed to encode knowledge payload: {}", e)))?;

        let cmd = vec![
            "synapse".to_string(),
            "agent".to_string(),
            "serve".to_string(),
            "--id".to_string(),
            spec.agent_id.to_string(),
            "--template".to_string(),
            artifact.template.to_string(),
            "--bind".to_string(),
            "0.0.0.0".to_string(),
            "--port".to_string(),
            spec.port.to_string(),
        ];

        let config = Config {
            image: Some(artifact.reference.clone()),
            cmd: Some(cmd),
            env: Some(vec![format!("{}={}", KNOWLEDGE_ENV_VAR, knowledge)]),
            exposed_ports: Some(HashMap::from([(container_port, HashMap::new())])),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: container_name(spec),
            platform: None,
        };

        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| RuntimeError::StartFailed(e.to_string()))?;

        if let Err(e) = self
            .docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
        {
            let remove = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };
            if let Err(cleanup) = self.docker.remove_container(&created.id, Some(remove)).await {
                warn!(container_id = %created.id, error = %cleanup, "Failed to remove unstarted container");
            }
            return Err(RuntimeError::StartFailed(format!("Failed to start container: {}", e)));
        }

        info!(agent_id = %spec.agent_id, container_id = %created.id, port = spec.port, "Spawned agent container");
        Ok(AgentInstance {
            id: InstanceId::new(created.id),
            endpoint: format!("http://{}:{}", self.agent_host, spec.port),
        })
    }

    async fn stop(&self, id: &InstanceId) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        match self.docker.remove_container(id.as_str(), Some(options)).await {
            Ok(()) => {
                info!("Removed agent container: {}", id);
                Ok(())
            }
            Err(e) if is_not_found(&e) => {
                debug!("Agent container {} already gone", id);
                Ok(())
            }
            Err(e) => Err(RuntimeError::StopFailed(e.to_string())),
        }
    }

    async fn status(&self, id: &InstanceId) -> Result<InstanceStatus, RuntimeError> {
        let inspect = self
            .docker
            .inspect_container(id.as_str(), None)
            .await
            .map_err(|e| RuntimeError::InstanceNotFound(format!("{}: {}", id, e)))?;

        let status = match inspect.state.and_then(|s| s.status) {
            Some(ContainerStateStatusEnum::RUNNING) => InstanceStatus::Running,
            Some(ContainerStateStatusEnum::EXITED) | Some(ContainerStateStatusEnum::DEAD) => InstanceStatus::Exited,
            _ => InstanceStatus::Unknown,
        };
        Ok(status)
    }
}
