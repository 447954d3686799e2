// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Hebbian decay scheduler - background task for time-decay of edge weights
//!
//! Every `decay_interval_secs` the scheduler decays HandlesConcept edges that
//! were strengthened or weakened within the recent window. Unused pairings
//! fade; stale edges outside the window are left alone.

use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::hebbian::{DecayReport, HebbianEngine};
use crate::domain::GraphError;

pub struct HebbianDecayScheduler {
    engine: Arc<HebbianEngine>,
    shutdown_token: CancellationToken,
}

impl HebbianDecayScheduler {
    pub fn new(engine: Arc<HebbianEngine>) -> Self {
        Self {
            engine,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Use an externally owned token so one cancel stops every background task
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = token;
        self
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Start the scheduler background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        let config = self.engine.config();
        if !config.decay_enabled || config.decay_interval_secs == 0 {
            info!("Hebbian decay scheduler is disabled");
            return;
        }

        info!(
            interval_seconds = config.decay_interval_secs,
            decay_rate = config.decay_rate,
            window_intervals = config.recent_window_intervals,
            "Starting Hebbian decay scheduler"
        );

        let mut tick = interval(Duration::from_secs(config.decay_interval_secs));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    debug!("Running Hebbian decay cycle");
                    match self.decay_cycle().await {
                        Ok(report) => {
                            info!(
                                edges_decayed = report.edges_decayed,
                                decay_rate = report.decay_rate,
                                "Hebbian decay cycle completed"
                            );
                        }
                        Err(e) => {
                            warn!("Hebbian decay cycle failed: {}", e);
                        }
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping Hebbian decay scheduler");
                    break;
                }
            }
        }

        info!("Hebbian decay scheduler stopped");
    }

    async fn decay_cycle(&self) -> Result<DecayReport, GraphError> {
        let report = self.engine.decay_recent().await?;
        counter!("synapse_decay_edges_total").increment(report.edges_decayed as u64);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{HebbianConfig, NoopEventBus};
    use crate::domain::{AgentId, AgentNode, GraphNode};
    use crate::infrastructure::{GraphRepository, InMemoryGraphRepository};

    async fn setup(config: HebbianConfig) -> (Arc<HebbianEngine>, Arc<InMemoryGraphRepository>) {
        let graph = Arc::new(InMemoryGraphRepository::new());
        graph
            .upsert_node(GraphNode::Agent(AgentNode::new_static(AgentId::from("a"), "a", "http://a")))
            .await
            .unwrap();
        let engine = Arc::new(HebbianEngine::new(graph.clone(), Arc::new(NoopEventBus), config));
        (engine, graph)
    }

    #[tokio::test]
    async fn test_decay_cycle() {
        let (engine, graph) = setup(HebbianConfig::default()).await;
        engine.strengthen(&AgentId::from("a"), "entropy").await.unwrap();

        let scheduler = HebbianDecayScheduler::new(engine);
        let report = scheduler.decay_cycle().await.unwrap();
        assert_eq!(report.edges_decayed, 1);

        let edge = graph
            .get_handles_edge(&AgentId::from("a"), "entropy")
            .await
            .unwrap()
            .unwrap();
        assert!((edge.weight - 0.55 * 0.99).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_shutdown() {
        let config = HebbianConfig {
            decay_interval_secs: 1,
            ..HebbianConfig::default()
        };
        let (engine, _) = setup(config).await;
        let scheduler = Arc::new(HebbianDecayScheduler::new(engine));
        let token = scheduler.shutdown_token();
        let handle = scheduler.start();

        token.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_scheduler_disabled() {
        let config = HebbianConfig {
            decay_enabled: false,
            ..HebbianConfig::default()
        };
        let (engine, _) = setup(config).await;
        let handle = Arc::new(HebbianDecayScheduler::new(engine)).start();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("disabled scheduler should return immediately")
            .unwrap();
    }
}
