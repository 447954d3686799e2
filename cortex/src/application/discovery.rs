// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Discovery & Relevance Scorer
//!
//! Finds the agents handling a concept by walking incoming HandlesConcept
//! edges, scores each with [`ScoreBreakdown`], and returns the top
//! `max_agents_per_query` in a deterministic order: score, then success
//! rate, then Hebbian weight, then agent id. All descending except the id.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use crate::application::telemetry::AgentTelemetry;
use crate::domain::{
    availability_factor, canonicalize_concept, capability_match, domain_overlap, expertise_match, performance_factor,
    AgentNode, EdgeType, GraphError, NodeId, RelatedDomains, ScoreBreakdown, ScoreWeights,
};
use crate::infrastructure::GraphRepository;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_max_agents_per_query")]
    pub max_agents_per_query: usize,

    /// In-flight requests at which availability bottoms out
    #[serde(default = "default_max_load_per_agent")]
    pub max_load_per_agent: u32,

    /// Latency at which the latency term of the performance factor is 0.5
    #[serde(default = "default_latency_reference_ms")]
    pub latency_reference_ms: f64,

    #[serde(default)]
    pub weights: ScoreWeights,

    #[serde(default)]
    pub related_domains: RelatedDomains,
}

fn default_max_agents_per_query() -> usize {
    5
}

fn default_max_load_per_agent() -> u32 {
    8
}

fn default_latency_reference_ms() -> f64 {
    1000.0
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_agents_per_query: default_max_agents_per_query(),
            max_load_per_agent: default_max_load_per_agent(),
            latency_reference_ms: default_latency_reference_ms(),
            weights: ScoreWeights::default(),
            related_domains: RelatedDomains::default(),
        }
    }
}

/// Optional hints from the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryContext {
    /// Overrides the concept node's domain as the query domain
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredAgent {
    pub agent: AgentNode,
    pub region: Option<String>,
    pub score: f64,
    pub success_rate: f64,
    pub hebbian_weight: f64,
    pub breakdown: ScoreBreakdown,
}

/// Discovery result with the reason for a miss
#[derive(Debug, Clone)]
pub enum DiscoveryOutcome {
    Candidates(Vec<ScoredAgent>),
    /// No concept node with that name
    ConceptUnknown,
    /// Concept exists but no routable agent handles it
    NoCandidateAgents,
}

impl DiscoveryOutcome {
    pub fn into_candidates(self) -> Vec<ScoredAgent> {
        match self {
            DiscoveryOutcome::Candidates(agents) => agents,
            _ => Vec::new(),
        }
    }

    pub fn is_miss(&self) -> bool {
        !matches!(self, DiscoveryOutcome::Candidates(_))
    }
}

pub struct DiscoveryService {
    graph: Arc<dyn GraphRepository>,
    telemetry: Arc<AgentTelemetry>,
    config: DiscoveryConfig,
}

impl DiscoveryService {
    pub fn new(graph: Arc<dyn GraphRepository>, telemetry: Arc<AgentTelemetry>, config: DiscoveryConfig) -> Self {
        Self {
            graph,
            telemetry,
            config,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Ranked candidates; empty on a miss
    pub async fn discover(
        &self,
        concept: &str,
        intent: &str,
        context: &QueryContext,
    ) -> Result<Vec<ScoredAgent>, GraphError> {
        Ok(self.lookup(concept, intent, context).await?.into_candidates())
    }

    pub async fn lookup(
        &self,
        concept: &str,
        intent: &str,
        context: &QueryContext,
    ) -> Result<DiscoveryOutcome, GraphError> {
        let concept = canonicalize_concept(concept);
        let concept_id = NodeId::concept(&concept);
        let concept_node = match self.graph.get_node(&concept_id).await? {
            Some(node) => match node.as_concept() {
                Some(c) => c.clone(),
                None => return Err(GraphError::WrongNodeKind(concept_id)),
            },
            None => {
                debug!(concept = %concept, "Discovery miss: concept unknown");
                return Ok(DiscoveryOutcome::ConceptUnknown);
            }
        };

        let query_domain = context.domain.clone().unwrap_or(concept_node.domain.clone());
        let edges = self
            .graph
            .get_incoming_edges(&concept_id, EdgeType::HandlesConcept)
            .await?;

        let mut candidates = Vec::with_capacity(edges.len());
        for edge in edges.iter().filter_map(|e| e.as_handles()) {
            let agent = match self.graph.get_node(&NodeId::agent(&edge.agent_id)).await? {
                Some(node) => match node.as_agent() {
                    Some(agent) if agent.status.is_routable() => agent.clone(),
                    _ => continue,
                },
                None => continue,
            };

            let region = self
                .graph
                .get_outgoing_edges(&NodeId::agent(&agent.id), EdgeType::BelongsTo)
                .await?
                .into_iter()
                .find_map(|e| e.as_belongs_to().map(|b| b.region.clone()));

            let load = self.telemetry.snapshot(&agent.id);
            let success_rate = edge.success_rate();
            let breakdown = ScoreBreakdown {
                expertise_match: expertise_match(&agent.expertise, &concept),
                capability_match: capability_match(&agent.capabilities, intent),
                domain_overlap: domain_overlap(
                    region.as_deref(),
                    Some(query_domain.as_str()),
                    &self.config.related_domains,
                ),
                performance_factor: performance_factor(success_rate, &load, self.config.latency_reference_ms),
                availability_factor: availability_factor(
                    agent.status,
                    load.in_flight,
                    self.config.max_load_per_agent,
                ),
                hebbian_weight: edge.weight,
            };

            candidates.push(ScoredAgent {
                score: breakdown.score(&self.config.weights),
                success_rate,
                hebbian_weight: edge.weight,
                breakdown,
                region,
                agent,
            });
        }

        if candidates.is_empty() {
            debug!(concept = %concept, "Discovery miss: no candidate agents");
            return Ok(DiscoveryOutcome::NoCandidateAgents);
        }

        candidates.sort_by(rank);
        candidates.truncate(self.config.max_agents_per_query.max(1));

        debug!(
            concept = %concept,
            intent = %intent,
            top_agent = %candidates[0].agent.id,
            top_score = candidates[0].score,
            candidates = candidates.len(),
            "Discovery hit"
        );
        Ok(DiscoveryOutcome::Candidates(candidates))
    }
}

fn rank(a: &ScoredAgent, b: &ScoredAgent) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.success_rate.total_cmp(&a.success_rate))
        .then_with(|| b.hebbian_weight.total_cmp(&a.hebbian_weight))
        .then_with(|| a.agent.id.cmp(&b.agent.id))
}
