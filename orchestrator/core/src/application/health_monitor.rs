// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent health monitor - background task probing `/health` of every agent
//!
//! A failed probe marks the agent Degraded; `failure_threshold` consecutive
//! failures mark it Failed. A successful probe restores Healthy. Retired
//! agents are not probed.

use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use synapse_cortex::application::AgentRegistrar;
use synapse_cortex::{AgentId, AgentNode, AgentStatus, GraphError, GraphNode, GraphRepository};

use crate::domain::gateway::AgentGateway;
use crate::domain::node_config::HealthMonitorConfig;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthReport {
    pub probed: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub failed: usize,
}

pub struct AgentHealthMonitor {
    graph: Arc<dyn GraphRepository>,
    registrar: Arc<AgentRegistrar>,
    gateway: Arc<dyn AgentGateway>,
    config: HealthMonitorConfig,
    consecutive_failures: DashMap<AgentId, u32>,
    shutdown_token: CancellationToken,
}

impl AgentHealthMonitor {
    pub fn new(
        graph: Arc<dyn GraphRepository>,
        registrar: Arc<AgentRegistrar>,
        gateway: Arc<dyn AgentGateway>,
        config: HealthMonitorConfig,
    ) -> Self {
        Self {
            graph,
            registrar,
            gateway,
            config,
            consecutive_failures: DashMap::new(),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = token;
        self
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Start the monitor background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        if !self.config.enabled || self.config.interval_secs == 0 {
            info!("Agent health monitor is disabled");
            return;
        }

        info!(
            interval_seconds = self.config.interval_secs,
            failure_threshold = self.config.failure_threshold,
            "Starting agent health monitor"
        );

        let mut tick = interval(Duration::from_secs(self.config.interval_secs));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    match self.probe_all().await {
                        Ok(report) => debug!(
                            probed = report.probed,
                            healthy = report.healthy,
                            degraded = report.degraded,
                            failed = report.failed,
                            "Health probe cycle completed"
                        ),
                        Err(e) => warn!("Health probe cycle failed: {}", e),
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping agent health monitor");
                    break;
                }
            }
        }
    }

    /// Probe every non-retired agent once
    pub async fn probe_all(&self) -> Result<HealthReport, GraphError> {
        let predicate = |node: &GraphNode| {
            node.as_agent()
                .map(|a| a.status != AgentStatus::Retired)
                .unwrap_or(false)
        };
        let agents: Vec<AgentNode> = self
            .graph
            .find_nodes(&predicate)
            .await?
            .into_iter()
            .filter_map(|n| n.as_agent().cloned())
            .collect();

        let timeout = Duration::from_millis(self.config.probe_timeout_ms);
        let probes = agents.iter().map(|agent| async move {
            let healthy = matches!(
                self.gateway.health(&agent.endpoint, timeout).await,
                Ok(health) if health.is_healthy()
            );
            (agent, healthy)
        });

        let mut report = HealthReport::default();
        for (agent, healthy) in join_all(probes).await {
            report.probed += 1;
            let status = self.next_status(&agent.id, healthy);
            match status {
                AgentStatus::Healthy => report.healthy += 1,
                AgentStatus::Degraded => report.degraded += 1,
                AgentStatus::Failed => report.failed += 1,
                AgentStatus::Retired => {}
            }
            if status != agent.status {
                match self.registrar.transition_status(&agent.id, agent.status, status).await {
                    Ok(true) => {
                        info!(agent_id = %agent.id, from = ?agent.status, to = ?status, "Agent health changed")
                    }
                    // retired or otherwise changed while the probe was in flight
                    Ok(false) => {
                        debug!(agent_id = %agent.id, "Agent status changed during probe, result discarded");
                        self.consecutive_failures.remove(&agent.id);
                    }
                    // removed since the listing
                    Err(GraphError::NodeNotFound(_)) => {
                        self.consecutive_failures.remove(&agent.id);
                    }
                    Err(e) => warn!(agent_id = %agent.id, error = %e, "Failed to record health status"),
                }
            }
        }
        Ok(report)
    }

    fn next_status(&self, agent_id: &AgentId, healthy: bool) -> AgentStatus {
        if healthy {
            self.consecutive_failures.remove(agent_id);
            return AgentStatus::Healthy;
        }
        let mut failures = self.consecutive_failures.entry(agent_id.clone()).or_insert(0);
        *failures += 1;
        if *failures >= self.config.failure_threshold.max(1) {
            AgentStatus::Failed
        } else {
            AgentStatus::Degraded
        }
    }
}
