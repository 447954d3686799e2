// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Hebbian Learning Engine
//!
//! The only mutator of HandlesConcept learning state. Task outcomes move an
//! edge's weight up by `delta_success` or down by `delta_failure`; a periodic
//! decay pass multiplies recently active weights by `1 - decay_rate`. Every
//! mutation goes through the repository's per-edge lock.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::EventBus;
use crate::domain::{
    canonicalize_concept, AgentId, ConceptNode, CortexEvent, EdgeType, GraphError, GraphNode, HandlesConceptEdge,
    NodeId,
};
use crate::infrastructure::GraphRepository;
use synapse_sdk::template::FALLBACK_DOMAIN;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HebbianConfig {
    #[serde(default = "default_delta_success")]
    pub delta_success: f64,

    #[serde(default = "default_delta_failure")]
    pub delta_failure: f64,

    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,

    /// Seconds between decay passes
    #[serde(default = "default_decay_interval_secs")]
    pub decay_interval_secs: u64,

    /// Decay only touches edges updated within this many intervals
    #[serde(default = "default_recent_window_intervals")]
    pub recent_window_intervals: u32,

    #[serde(default = "default_enabled")]
    pub decay_enabled: bool,
}

fn default_delta_success() -> f64 {
    0.05
}

fn default_delta_failure() -> f64 {
    0.02
}

fn default_decay_rate() -> f64 {
    0.01
}

fn default_decay_interval_secs() -> u64 {
    900
}

fn default_recent_window_intervals() -> u32 {
    10
}

fn default_enabled() -> bool {
    true
}

impl Default for HebbianConfig {
    fn default() -> Self {
        Self {
            delta_success: default_delta_success(),
            delta_failure: default_delta_failure(),
            decay_rate: default_decay_rate(),
            decay_interval_secs: default_decay_interval_secs(),
            recent_window_intervals: default_recent_window_intervals(),
            decay_enabled: default_enabled(),
        }
    }
}

impl HebbianConfig {
    pub fn recent_window(&self) -> ChronoDuration {
        let secs = self.decay_interval_secs.saturating_mul(self.recent_window_intervals as u64);
        ChronoDuration::seconds(secs.min(i64::MAX as u64) as i64)
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("delta_success", self.delta_success),
            ("delta_failure", self.delta_failure),
            ("decay_rate", self.decay_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("hebbian.{} must be within [0, 1], got {}", name, value));
            }
        }
        if self.decay_enabled && self.decay_interval_secs == 0 {
            return Err("hebbian.decay_interval_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Which edges a decay pass touches
#[derive(Debug, Clone, PartialEq)]
pub enum DecayScope {
    /// Edges whose `last_updated` is at or after `since`
    RecentlyActive { since: DateTime<Utc> },
    /// Every edge into one concept
    Concept(String),
    All,
}

impl DecayScope {
    fn label(&self) -> String {
        match self {
            DecayScope::RecentlyActive { since } => format!("recently_active(since={})", since.to_rfc3339()),
            DecayScope::Concept(concept) => format!("concept({})", concept),
            DecayScope::All => "all".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecayReport {
    pub edges_decayed: usize,
    pub decay_rate: f64,
    pub scope: String,
}

pub struct HebbianEngine {
    graph: Arc<dyn GraphRepository>,
    event_bus: Arc<dyn EventBus>,
    config: HebbianConfig,
}

impl HebbianEngine {
    pub fn new(graph: Arc<dyn GraphRepository>, event_bus: Arc<dyn EventBus>, config: HebbianConfig) -> Self {
        Self {
            graph,
            event_bus,
            config,
        }
    }

    pub fn config(&self) -> &HebbianConfig {
        &self.config
    }

    pub async fn strengthen(&self, agent_id: &AgentId, concept: &str) -> Result<HandlesConceptEdge, GraphError> {
        self.record_outcome(agent_id, concept, true).await
    }

    pub async fn weaken(&self, agent_id: &AgentId, concept: &str) -> Result<HandlesConceptEdge, GraphError> {
        self.record_outcome(agent_id, concept, false).await
    }

    /// Apply one task outcome to the (agent, concept) edge, creating the
    /// edge with default weight if needed. The agent node must exist; a
    /// missing concept node is created in the fallback domain.
    pub async fn record_outcome(
        &self,
        agent_id: &AgentId,
        concept: &str,
        success: bool,
    ) -> Result<HandlesConceptEdge, GraphError> {
        let concept = canonicalize_concept(concept);
        let concept_id = NodeId::concept(&concept);
        if self.graph.get_node(&concept_id).await?.is_none() {
            self.graph
                .upsert_node(GraphNode::Concept(ConceptNode::new(&concept, FALLBACK_DOMAIN, 0.5)))
                .await?;
        }

        let (delta_success, delta_failure) = (self.config.delta_success, self.config.delta_failure);
        let update = self
            .graph
            .modify_handles_edge(
                agent_id,
                &concept,
                true,
                Box::new(move |edge| {
                    edge.apply_outcome(success, delta_success, delta_failure);
                }),
            )
            .await?;

        debug!(
            agent_id = %agent_id,
            concept = %concept,
            success,
            old_weight = update.previous_weight,
            new_weight = update.edge.weight,
            "Hebbian update applied"
        );

        let event = CortexEvent::EdgeReinforced {
            agent_id: agent_id.clone(),
            concept,
            old_weight: update.previous_weight,
            new_weight: update.edge.weight,
            success,
            usage_count: update.edge.usage_count,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.event_bus.publish(event).await {
            warn!("Failed to publish edge reinforcement event: {}", e);
        }

        Ok(update.edge)
    }

    /// Multiply the weight of every edge in `scope` by `1 - rate`.
    pub async fn decay(&self, scope: DecayScope, rate: f64) -> Result<DecayReport, GraphError> {
        let rate = rate.clamp(0.0, 1.0);
        let keys: Vec<(AgentId, String)> = match &scope {
            DecayScope::RecentlyActive { since } => self.graph.handles_edges_updated_since(*since).await?,
            DecayScope::Concept(concept) => self
                .graph
                .get_incoming_edges(&NodeId::concept(concept), EdgeType::HandlesConcept)
                .await?
                .iter()
                .filter_map(|e| e.as_handles())
                .map(|e| (e.agent_id.clone(), e.concept.clone()))
                .collect(),
            DecayScope::All => self.graph.handles_edges_updated_since(DateTime::<Utc>::MIN_UTC).await?,
        };

        let mut edges_decayed = 0;
        for (agent_id, concept) in keys {
            let result = self
                .graph
                .modify_handles_edge(
                    &agent_id,
                    &concept,
                    false,
                    Box::new(move |edge| {
                        edge.apply_decay(rate);
                    }),
                )
                .await;
            match result {
                Ok(_) => edges_decayed += 1,
                // removed since the scan
                Err(GraphError::EdgeNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        let report = DecayReport {
            edges_decayed,
            decay_rate: rate,
            scope: scope.label(),
        };

        let event = CortexEvent::DecayApplied {
            edges_decayed,
            decay_rate: rate,
            scope: report.scope.clone(),
            timestamp: Utc::now(),
        };
        if let Err(e) = self.event_bus.publish(event).await {
            warn!("Failed to publish decay event: {}", e);
        }

        Ok(report)
    }

    /// One scheduled pass: configured rate over the recent-activity window
    pub async fn decay_recent(&self) -> Result<DecayReport, GraphError> {
        let since = Utc::now() - self.config.recent_window();
        self.decay(DecayScope::RecentlyActive { since }, self.config.decay_rate)
            .await
    }
}
