// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent/concept graph entities for the Cortex
//!
//! Typed nodes (Agent, Concept, Region) and typed edges (HandlesConcept,
//! BelongsTo). HandlesConcept edges carry the Hebbian learning state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use synapse_sdk::TemplateKind;
use uuid::Uuid;

/// Weight given to a HandlesConcept edge when it is first created
pub const DEFAULT_EDGE_WEIGHT: f64 = 0.5;

/// Default per-edge decay rate
pub const DEFAULT_DECAY_RATE: f64 = 0.01;

/// Canonical concept name: trimmed, lowercase, words joined with `_`.
pub fn canonicalize_concept(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Agent identifier, stable across the agent's lifetime
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh identifier for a dynamically provisioned agent
    pub fn new_dynamic(concept: &str) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("dyn-{}-{}", canonicalize_concept(concept), &suffix[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Node identifier in the graph, namespaced by node kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn agent(id: &AgentId) -> Self {
        Self(format!("agent:{}", id.0))
    }

    pub fn concept(name: &str) -> Self {
        Self(format!("concept:{}", canonicalize_concept(name)))
    }

    pub fn region(name: &str) -> Self {
        Self(format!("region:{}", name.trim().to_lowercase()))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Healthy,
    Degraded,
    Failed,
    /// Stopped dynamic agent whose record is kept for history
    Retired,
}

impl AgentStatus {
    /// Retired agents keep their history but never receive traffic
    pub fn is_routable(&self) -> bool {
        !matches!(self, AgentStatus::Retired)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentNode {
    pub id: AgentId,
    pub name: String,
    pub endpoint: String,
    /// Intents the agent answers
    pub capabilities: BTreeSet<String>,
    /// Canonical concept names the agent declares expertise in
    #[serde(default)]
    pub expertise: BTreeSet<String>,
    pub status: AgentStatus,
    pub is_dynamic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_kind: Option<TemplateKind>,
    pub created_at: DateTime<Utc>,
}

impl AgentNode {
    pub fn new_static(id: AgentId, name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            endpoint: endpoint.into(),
            capabilities: BTreeSet::new(),
            expertise: BTreeSet::new(),
            status: AgentStatus::Healthy,
            is_dynamic: false,
            template_kind: None,
            created_at: Utc::now(),
        }
    }

    pub fn new_dynamic(
        id: AgentId,
        name: impl Into<String>,
        endpoint: impl Into<String>,
        template_kind: TemplateKind,
    ) -> Self {
        Self {
            is_dynamic: true,
            template_kind: Some(template_kind),
            ..Self::new_static(id, name, endpoint)
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.capabilities.extend(
            capabilities
                .into_iter()
                .map(|c| synapse_sdk::intent::normalize(c.as_ref())),
        );
        self
    }

    pub fn with_expertise<I, S>(mut self, concepts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.expertise
            .extend(concepts.into_iter().map(|c| canonicalize_concept(c.as_ref())));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    /// Canonical name
    pub name: String,
    pub domain: String,
    /// 0.0-1.0
    pub complexity_score: f64,
    pub created_at: DateTime<Utc>,
}

impl ConceptNode {
    pub fn new(name: &str, domain: impl Into<String>, complexity_score: f64) -> Self {
        Self {
            name: canonicalize_concept(name),
            domain: domain.into(),
            complexity_score: complexity_score.clamp(0.0, 1.0),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionNode {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl RegionNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Agent,
    Concept,
    Region,
}

/// Node in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphNode {
    Agent(AgentNode),
    Concept(ConceptNode),
    Region(RegionNode),
}

impl GraphNode {
    pub fn id(&self) -> NodeId {
        match self {
            GraphNode::Agent(a) => NodeId::agent(&a.id),
            GraphNode::Concept(c) => NodeId::concept(&c.name),
            GraphNode::Region(r) => NodeId::region(&r.name),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            GraphNode::Agent(_) => NodeKind::Agent,
            GraphNode::Concept(_) => NodeKind::Concept,
            GraphNode::Region(_) => NodeKind::Region,
        }
    }

    pub fn as_agent(&self) -> Option<&AgentNode> {
        match self {
            GraphNode::Agent(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_concept(&self) -> Option<&ConceptNode> {
        match self {
            GraphNode::Concept(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_region(&self) -> Option<&RegionNode> {
        match self {
            GraphNode::Region(r) => Some(r),
            _ => None,
        }
    }
}

/// Type of edge in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Agent handles concept (weighted, learned)
    HandlesConcept,

    /// Agent or concept belongs to region
    BelongsTo,
}

/// Agent -> Concept edge carrying Hebbian learning state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlesConceptEdge {
    pub agent_id: AgentId,
    /// Canonical concept name
    pub concept: String,
    pub weight: f64,
    pub usage_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub decay_rate: f64,
    /// Last strengthen/weaken. Decay does not touch it.
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_decayed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl HandlesConceptEdge {
    pub fn new(agent_id: AgentId, concept: &str) -> Self {
        let now = Utc::now();
        Self {
            agent_id,
            concept: canonicalize_concept(concept),
            weight: DEFAULT_EDGE_WEIGHT,
            usage_count: 0,
            success_count: 0,
            failure_count: 0,
            decay_rate: DEFAULT_DECAY_RATE,
            last_updated: now,
            last_decayed: None,
            created_at: now,
        }
    }

    /// `success_count / usage_count`, 0.5 before the first outcome
    pub fn success_rate(&self) -> f64 {
        if self.usage_count == 0 {
            0.5
        } else {
            self.success_count as f64 / self.usage_count as f64
        }
    }

    /// Apply one task outcome. Returns the weight before the update.
    pub fn apply_outcome(&mut self, success: bool, delta_success: f64, delta_failure: f64) -> f64 {
        let previous = self.weight;
        let delta = if success { delta_success } else { -delta_failure };
        self.weight = (self.weight + delta).clamp(0.0, 1.0);
        self.usage_count += 1;
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.last_updated = Utc::now();
        previous
    }

    /// Multiplicative decay: `weight *= (1 - rate)`. Never raises the weight.
    pub fn apply_decay(&mut self, rate: f64) -> f64 {
        let previous = self.weight;
        let factor = (1.0 - rate).clamp(0.0, 1.0);
        self.weight = (self.weight * factor).clamp(0.0, 1.0);
        self.last_decayed = Some(Utc::now());
        previous
    }

    pub fn from_node(&self) -> NodeId {
        NodeId::agent(&self.agent_id)
    }

    pub fn to_node(&self) -> NodeId {
        NodeId::concept(&self.concept)
    }
}

/// Agent/Concept -> Region edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BelongsToEdge {
    pub from: NodeId,
    pub region: String,
    pub created_at: DateTime<Utc>,
}

impl BelongsToEdge {
    pub fn new(from: NodeId, region: impl Into<String>) -> Self {
        Self {
            from,
            region: region.into().trim().to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn to_node(&self) -> NodeId {
        NodeId::region(&self.region)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GraphEdge {
    HandlesConcept(HandlesConceptEdge),
    BelongsTo(BelongsToEdge),
}

impl GraphEdge {
    pub fn edge_type(&self) -> EdgeType {
        match self {
            GraphEdge::HandlesConcept(_) => EdgeType::HandlesConcept,
            GraphEdge::BelongsTo(_) => EdgeType::BelongsTo,
        }
    }

    pub fn from_node(&self) -> NodeId {
        match self {
            GraphEdge::HandlesConcept(e) => e.from_node(),
            GraphEdge::BelongsTo(e) => e.from.clone(),
        }
    }

    pub fn to_node(&self) -> NodeId {
        match self {
            GraphEdge::HandlesConcept(e) => e.to_node(),
            GraphEdge::BelongsTo(e) => e.to_node(),
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            from: self.from_node(),
            to: self.to_node(),
            edge_type: self.edge_type(),
        }
    }

    pub fn as_handles(&self) -> Option<&HandlesConceptEdge> {
        match self {
            GraphEdge::HandlesConcept(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_belongs_to(&self) -> Option<&BelongsToEdge> {
        match self {
            GraphEdge::BelongsTo(e) => Some(e),
            _ => None,
        }
    }
}

/// Edges are unique per (from, to, type)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: NodeId,
    pub to: NodeId,
    pub edge_type: EdgeType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_concept() {
        assert_eq!(canonicalize_concept("  Quantum Computer "), "quantum_computer");
        assert_eq!(canonicalize_concept("quantum_computer"), "quantum_computer");
        assert_eq!(canonicalize_concept("Machine-Learning"), "machine_learning");
    }

    #[test]
    fn test_node_ids_are_namespaced() {
        assert_eq!(NodeId::concept("Quantum Computer").0, "concept:quantum_computer");
        assert_eq!(NodeId::region("Science").0, "region:science");
        assert_eq!(NodeId::agent(&AgentId::from("a-1")).0, "agent:a-1");
    }

    #[test]
    fn test_edge_defaults() {
        let edge = HandlesConceptEdge::new(AgentId::from("a"), "Entropy");
        assert_eq!(edge.weight, DEFAULT_EDGE_WEIGHT);
        assert_eq!(edge.concept, "entropy");
        assert_eq!(edge.success_rate(), 0.5);
        assert_eq!(edge.decay_rate, DEFAULT_DECAY_RATE);
    }

    #[test]
    fn test_hebbian_sequence() {
        let mut edge = HandlesConceptEdge::new(AgentId::from("a"), "entropy");
        for _ in 0..5 {
            edge.apply_outcome(true, 0.05, 0.02);
        }
        assert!((edge.weight - 0.75).abs() < 1e-9);
        for _ in 0..2 {
            edge.apply_outcome(false, 0.05, 0.02);
        }
        assert!((edge.weight - 0.71).abs() < 1e-9);
        assert_eq!(edge.usage_count, 7);
        assert!((edge.success_rate() - 5.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_weight_clamped_at_bounds() {
        let mut edge = HandlesConceptEdge::new(AgentId::from("a"), "entropy");
        for _ in 0..50 {
            edge.apply_outcome(true, 0.05, 0.02);
        }
        assert_eq!(edge.weight, 1.0);
        for _ in 0..100 {
            edge.apply_outcome(false, 0.05, 0.02);
        }
        assert_eq!(edge.weight, 0.0);
        assert_eq!(edge.usage_count, 150);
        assert_eq!(edge.success_count + edge.failure_count, edge.usage_count);
    }

    #[test]
    fn test_decay_compounds_geometrically() {
        let mut edge = HandlesConceptEdge::new(AgentId::from("a"), "entropy");
        edge.weight = 0.71;
        let last_updated = edge.last_updated;
        edge.apply_decay(0.1);
        edge.apply_decay(0.1);
        assert!((edge.weight - 0.5751).abs() < 1e-9);
        assert_eq!(edge.last_updated, last_updated);
        assert!(edge.last_decayed.is_some());
    }

    #[test]
    fn test_graph_node_ids() {
        let node = GraphNode::Concept(ConceptNode::new("Quantum Computer", "Science", 1.4));
        assert_eq!(node.id(), NodeId::concept("quantum_computer"));
        assert_eq!(node.kind(), NodeKind::Concept);
        assert_eq!(node.as_concept().unwrap().complexity_score, 1.0);
    }
}
