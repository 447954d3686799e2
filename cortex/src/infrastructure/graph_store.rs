// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory graph repository implementation
//!
//! Nodes live behind one `RwLock`. Each HandlesConcept edge sits in its own
//! `Arc<Mutex<_>>` so outcome updates and decay on the same edge serialize
//! while different edges proceed in parallel. A concept -> agents index keeps
//! incoming-edge traversal off a full scan.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::domain::{
    canonicalize_concept, AgentId, AgentStatus, BelongsToEdge, EdgeKey, EdgeType, GraphEdge, GraphError, GraphNode,
    HandlesConceptEdge, NodeId, NodeKind,
};
use crate::infrastructure::repository::{EdgeMutation, EdgeUpdate, GraphRepository, GraphStats, NodePredicate};

type HandlesKey = (AgentId, String);

pub struct InMemoryGraphRepository {
    nodes: RwLock<HashMap<NodeId, GraphNode>>,
    handles: DashMap<HandlesKey, Arc<Mutex<HandlesConceptEdge>>>,
    concept_index: DashMap<String, BTreeSet<AgentId>>,
    belongs_to: RwLock<HashMap<EdgeKey, BelongsToEdge>>,
}

impl InMemoryGraphRepository {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            handles: DashMap::new(),
            concept_index: DashMap::new(),
            belongs_to: RwLock::new(HashMap::new()),
        }
    }

    fn require_node(&self, id: &NodeId, kind: NodeKind) -> Result<(), GraphError> {
        match self.nodes.read().get(id) {
            Some(node) if node.kind() == kind => Ok(()),
            Some(_) => Err(GraphError::WrongNodeKind(id.clone())),
            None => Err(GraphError::NodeNotFound(id.clone())),
        }
    }

    fn edge_cell(&self, key: &HandlesKey) -> Option<Arc<Mutex<HandlesConceptEdge>>> {
        self.handles.get(key).map(|entry| Arc::clone(entry.value()))
    }

    fn remove_handles(&self, keys: Vec<HandlesKey>) {
        for key in keys {
            self.handles.remove(&key);
            if let Some(mut agents) = self.concept_index.get_mut(&key.1) {
                agents.remove(&key.0);
            }
        }
    }
}

impl Default for InMemoryGraphRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphRepository for InMemoryGraphRepository {
    async fn upsert_node(&self, node: GraphNode) -> Result<NodeId, GraphError> {
        let id = node.id();
        self.nodes.write().insert(id.clone(), node);
        Ok(id)
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<GraphNode>, GraphError> {
        Ok(self.nodes.read().get(id).cloned())
    }

    async fn find_nodes(&self, predicate: NodePredicate<'_>) -> Result<Vec<GraphNode>, GraphError> {
        let nodes = self.nodes.read();
        let mut found: Vec<GraphNode> = nodes.values().filter(|n| predicate(n)).cloned().collect();
        found.sort_by_key(|n| n.id());
        Ok(found)
    }

    async fn remove_node(&self, id: &NodeId) -> Result<GraphNode, GraphError> {
        let removed = self
            .nodes
            .write()
            .remove(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;

        match &removed {
            GraphNode::Agent(agent) => {
                let keys: Vec<HandlesKey> = self
                    .handles
                    .iter()
                    .filter(|entry| entry.key().0 == agent.id)
                    .map(|entry| entry.key().clone())
                    .collect();
                self.remove_handles(keys);
            }
            GraphNode::Concept(concept) => {
                if let Some((_, agents)) = self.concept_index.remove(&concept.name) {
                    for agent in agents {
                        self.handles.remove(&(agent, concept.name.clone()));
                    }
                }
            }
            GraphNode::Region(_) => {}
        }

        self.belongs_to.write().retain(|key, _| &key.from != id && &key.to != id);
        Ok(removed)
    }

    async fn add_edge(&self, edge: GraphEdge) -> Result<EdgeKey, GraphError> {
        let key = edge.key();
        match edge {
            GraphEdge::HandlesConcept(handles) => {
                self.require_node(&key.from, NodeKind::Agent)?;
                self.require_node(&key.to, NodeKind::Concept)?;
                let concept = handles.concept.clone();
                let agent_id = handles.agent_id.clone();
                self.handles
                    .entry((agent_id.clone(), concept.clone()))
                    .or_insert_with(|| Arc::new(Mutex::new(handles)));
                self.concept_index.entry(concept).or_default().insert(agent_id);
            }
            GraphEdge::BelongsTo(belongs) => {
                if self.nodes.read().get(&key.from).is_none() {
                    return Err(GraphError::NodeNotFound(key.from.clone()));
                }
                self.require_node(&key.to, NodeKind::Region)?;
                self.belongs_to.write().entry(key.clone()).or_insert(belongs);
            }
        }
        Ok(key)
    }

    async fn get_outgoing_edges(&self, node: &NodeId, edge_type: EdgeType) -> Result<Vec<GraphEdge>, GraphError> {
        match edge_type {
            EdgeType::HandlesConcept => {
                let agent_id = match self.nodes.read().get(node) {
                    Some(GraphNode::Agent(agent)) => agent.id.clone(),
                    Some(_) => return Ok(Vec::new()),
                    None => return Err(GraphError::NodeNotFound(node.clone())),
                };
                let cells: Vec<_> = self
                    .handles
                    .iter()
                    .filter(|entry| entry.key().0 == agent_id)
                    .map(|entry| Arc::clone(entry.value()))
                    .collect();
                let mut edges: Vec<HandlesConceptEdge> = cells.iter().map(|cell| cell.lock().clone()).collect();
                edges.sort_by(|a, b| a.concept.cmp(&b.concept));
                Ok(edges.into_iter().map(GraphEdge::HandlesConcept).collect())
            }
            EdgeType::BelongsTo => {
                if self.nodes.read().get(node).is_none() {
                    return Err(GraphError::NodeNotFound(node.clone()));
                }
                let mut edges: Vec<BelongsToEdge> = self
                    .belongs_to
                    .read()
                    .iter()
                    .filter(|(key, _)| &key.from == node)
                    .map(|(_, edge)| edge.clone())
                    .collect();
                edges.sort_by(|a, b| a.region.cmp(&b.region));
                Ok(edges.into_iter().map(GraphEdge::BelongsTo).collect())
            }
        }
    }

    async fn get_incoming_edges(&self, node: &NodeId, edge_type: EdgeType) -> Result<Vec<GraphEdge>, GraphError> {
        match edge_type {
            EdgeType::HandlesConcept => {
                let concept = match self.nodes.read().get(node) {
                    Some(GraphNode::Concept(concept)) => concept.name.clone(),
                    Some(_) => return Ok(Vec::new()),
                    None => return Err(GraphError::NodeNotFound(node.clone())),
                };
                let agents: Vec<AgentId> = self
                    .concept_index
                    .get(&concept)
                    .map(|entry| entry.iter().cloned().collect())
                    .unwrap_or_default();
                // BTreeSet iteration keeps agent-id order
                Ok(agents
                    .into_iter()
                    .filter_map(|agent| self.edge_cell(&(agent, concept.clone())))
                    .map(|cell| GraphEdge::HandlesConcept(cell.lock().clone()))
                    .collect())
            }
            EdgeType::BelongsTo => {
                if self.nodes.read().get(node).is_none() {
                    return Err(GraphError::NodeNotFound(node.clone()));
                }
                let mut edges: Vec<BelongsToEdge> = self
                    .belongs_to
                    .read()
                    .iter()
                    .filter(|(key, _)| &key.to == node)
                    .map(|(_, edge)| edge.clone())
                    .collect();
                edges.sort_by(|a, b| a.from.cmp(&b.from));
                Ok(edges.into_iter().map(GraphEdge::BelongsTo).collect())
            }
        }
    }

    async fn get_handles_edge(
        &self,
        agent_id: &AgentId,
        concept: &str,
    ) -> Result<Option<HandlesConceptEdge>, GraphError> {
        let key = (agent_id.clone(), canonicalize_concept(concept));
        Ok(self.edge_cell(&key).map(|cell| cell.lock().clone()))
    }

    async fn modify_handles_edge(
        &self,
        agent_id: &AgentId,
        concept: &str,
        create_if_missing: bool,
        mutation: EdgeMutation,
    ) -> Result<EdgeUpdate, GraphError> {
        let concept = canonicalize_concept(concept);
        let key = (agent_id.clone(), concept.clone());

        let cell = match self.edge_cell(&key) {
            Some(cell) => cell,
            None if create_if_missing => {
                self.require_node(&NodeId::agent(agent_id), NodeKind::Agent)?;
                self.require_node(&NodeId::concept(&concept), NodeKind::Concept)?;
                let cell = Arc::clone(
                    self.handles
                        .entry(key)
                        .or_insert_with(|| Arc::new(Mutex::new(HandlesConceptEdge::new(agent_id.clone(), &concept))))
                        .value(),
                );
                self.concept_index
                    .entry(concept.clone())
                    .or_default()
                    .insert(agent_id.clone());
                cell
            }
            None => {
                return Err(GraphError::EdgeNotFound {
                    agent_id: agent_id.clone(),
                    concept,
                })
            }
        };

        let mut edge = cell.lock();
        let previous_weight = edge.weight;
        mutation(&mut edge);
        edge.weight = edge.weight.clamp(0.0, 1.0);
        Ok(EdgeUpdate {
            previous_weight,
            edge: edge.clone(),
        })
    }

    async fn handles_edges_updated_since(&self, since: DateTime<Utc>) -> Result<Vec<(AgentId, String)>, GraphError> {
        let mut keys: Vec<HandlesKey> = self
            .handles
            .iter()
            .filter(|entry| entry.value().lock().last_updated >= since)
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn set_agent_status(&self, agent_id: &AgentId, status: AgentStatus) -> Result<AgentStatus, GraphError> {
        let id = NodeId::agent(agent_id);
        let mut nodes = self.nodes.write();
        match nodes.get_mut(&id) {
            Some(GraphNode::Agent(agent)) => {
                let previous = agent.status;
                agent.status = status;
                Ok(previous)
            }
            Some(_) => Err(GraphError::WrongNodeKind(id)),
            None => Err(GraphError::NodeNotFound(id)),
        }
    }

    async fn compare_and_set_agent_status(
        &self,
        agent_id: &AgentId,
        expected: AgentStatus,
        status: AgentStatus,
    ) -> Result<bool, GraphError> {
        let id = NodeId::agent(agent_id);
        let mut nodes = self.nodes.write();
        match nodes.get_mut(&id) {
            Some(GraphNode::Agent(agent)) if agent.status == expected => {
                agent.status = status;
                Ok(true)
            }
            Some(GraphNode::Agent(_)) => Ok(false),
            Some(_) => Err(GraphError::WrongNodeKind(id)),
            None => Err(GraphError::NodeNotFound(id)),
        }
    }

    async fn stats(&self) -> Result<GraphStats, GraphError> {
        let mut stats = GraphStats::default();
        for node in self.nodes.read().values() {
            match node.kind() {
                NodeKind::Agent => stats.agents += 1,
                NodeKind::Concept => stats.concepts += 1,
                NodeKind::Region => stats.regions += 1,
            }
        }
        stats.handles_edges = self.handles.len();
        stats.belongs_to_edges = self.belongs_to.read().len();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentNode, ConceptNode, RegionNode};

    async fn seeded() -> InMemoryGraphRepository {
        let repo = InMemoryGraphRepository::new();
        for id in ["b-agent", "a-agent"] {
            let agent = AgentNode::new_static(AgentId::from(id), id, format!("http://{id}"));
            repo.upsert_node(GraphNode::Agent(agent)).await.unwrap();
        }
        repo.upsert_node(GraphNode::Concept(ConceptNode::new("entropy", "Science", 0.6)))
            .await
            .unwrap();
        repo.upsert_node(GraphNode::Region(RegionNode::new("Science")))
            .await
            .unwrap();
        repo
    }

    #[tokio::test]
    async fn test_edge_requires_both_endpoints() {
        let repo = seeded().await;
        let edge = HandlesConceptEdge::new(AgentId::from("a-agent"), "unknown");
        let err = repo.add_edge(GraphEdge::HandlesConcept(edge)).await.unwrap_err();
        assert!(matches!(err, GraphError::NodeNotFound(id) if id == NodeId::concept("unknown")));

        let edge = HandlesConceptEdge::new(AgentId::from("ghost"), "entropy");
        assert!(repo.add_edge(GraphEdge::HandlesConcept(edge)).await.is_err());
    }

    #[tokio::test]
    async fn test_incoming_edges_are_ordered_by_agent() {
        let repo = seeded().await;
        for id in ["b-agent", "a-agent"] {
            let edge = HandlesConceptEdge::new(AgentId::from(id), "entropy");
            repo.add_edge(GraphEdge::HandlesConcept(edge)).await.unwrap();
        }
        let edges = repo
            .get_incoming_edges(&NodeId::concept("entropy"), EdgeType::HandlesConcept)
            .await
            .unwrap();
        let agents: Vec<_> = edges
            .iter()
            .filter_map(|e| e.as_handles())
            .map(|e| e.agent_id.as_str().to_string())
            .collect();
        assert_eq!(agents, vec!["a-agent", "b-agent"]);
    }

    #[tokio::test]
    async fn test_remove_agent_cascades_edges() {
        let repo = seeded().await;
        let agent = AgentId::from("a-agent");
        repo.add_edge(GraphEdge::HandlesConcept(HandlesConceptEdge::new(agent.clone(), "entropy")))
            .await
            .unwrap();
        repo.add_edge(GraphEdge::BelongsTo(BelongsToEdge::new(NodeId::agent(&agent), "Science")))
            .await
            .unwrap();

        repo.remove_node(&NodeId::agent(&agent)).await.unwrap();

        assert!(repo.get_handles_edge(&agent, "entropy").await.unwrap().is_none());
        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.handles_edges, 0);
        assert_eq!(stats.belongs_to_edges, 0);
        assert_eq!(stats.agents, 1);
        let incoming = repo
            .get_incoming_edges(&NodeId::concept("entropy"), EdgeType::HandlesConcept)
            .await
            .unwrap();
        assert!(incoming.is_empty());
    }

    #[tokio::test]
    async fn test_re_adding_edge_keeps_learned_state() {
        let repo = seeded().await;
        let agent = AgentId::from("a-agent");
        repo.add_edge(GraphEdge::HandlesConcept(HandlesConceptEdge::new(agent.clone(), "entropy")))
            .await
            .unwrap();
        repo.modify_handles_edge(&agent, "entropy", false, Box::new(|e| {
            e.apply_outcome(true, 0.05, 0.02);
        }))
        .await
        .unwrap();
        repo.add_edge(GraphEdge::HandlesConcept(HandlesConceptEdge::new(agent.clone(), "entropy")))
            .await
            .unwrap();

        let edge = repo.get_handles_edge(&agent, "entropy").await.unwrap().unwrap();
        assert_eq!(edge.usage_count, 1);
    }

    #[tokio::test]
    async fn test_modify_missing_edge_without_create() {
        let repo = seeded().await;
        let err = repo
            .modify_handles_edge(&AgentId::from("a-agent"), "entropy", false, Box::new(|_| {}))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::EdgeNotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let repo = Arc::new(seeded().await);
        let agent = AgentId::from("a-agent");

        let mut handles = Vec::new();
        for i in 0..200 {
            let repo = repo.clone();
            let agent = agent.clone();
            handles.push(tokio::spawn(async move {
                repo.modify_handles_edge(&agent, "entropy", true, Box::new(move |e| {
                    e.apply_outcome(i % 2 == 0, 0.05, 0.02);
                }))
                .await
                .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let edge = repo.get_handles_edge(&agent, "entropy").await.unwrap().unwrap();
        assert_eq!(edge.usage_count, 200);
        assert_eq!(edge.success_count, 100);
        assert_eq!(edge.failure_count, 100);
        assert!((0.0..=1.0).contains(&edge.weight));
    }

    #[tokio::test]
    async fn test_set_agent_status() {
        let repo = seeded().await;
        let agent = AgentId::from("a-agent");
        let previous = repo.set_agent_status(&agent, AgentStatus::Degraded).await.unwrap();
        assert_eq!(previous, AgentStatus::Healthy);

        let node = repo.get_node(&NodeId::agent(&agent)).await.unwrap().unwrap();
        assert_eq!(node.as_agent().unwrap().status, AgentStatus::Degraded);
        assert!(repo
            .set_agent_status(&AgentId::from("ghost"), AgentStatus::Failed)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_compare_and_set_agent_status() {
        let repo = seeded().await;
        let agent = AgentId::from("a-agent");
        repo.set_agent_status(&agent, AgentStatus::Retired).await.unwrap();

        let written = repo
            .compare_and_set_agent_status(&agent, AgentStatus::Healthy, AgentStatus::Degraded)
            .await
            .unwrap();
        assert!(!written);
        let node = repo.get_node(&NodeId::agent(&agent)).await.unwrap().unwrap();
        assert_eq!(node.as_agent().unwrap().status, AgentStatus::Retired);

        assert!(repo
            .compare_and_set_agent_status(&agent, AgentStatus::Retired, AgentStatus::Healthy)
            .await
            .unwrap());
        assert!(repo
            .compare_and_set_agent_status(&AgentId::from("ghost"), AgentStatus::Healthy, AgentStatus::Failed)
            .await
            .is_err());
    }
}
