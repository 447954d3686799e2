// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository interface for the agent/concept graph

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    AgentId, AgentStatus, EdgeKey, EdgeType, GraphEdge, GraphError, GraphNode, HandlesConceptEdge, NodeId,
};

/// Predicate for [`GraphRepository::find_nodes`]
pub type NodePredicate<'a> = &'a (dyn Fn(&GraphNode) -> bool + Send + Sync);

/// Read-modify-write applied to one HandlesConcept edge under its lock
pub type EdgeMutation = Box<dyn FnOnce(&mut HandlesConceptEdge) + Send>;

/// Result of an edge mutation
#[derive(Debug, Clone)]
pub struct EdgeUpdate {
    pub previous_weight: f64,
    pub edge: HandlesConceptEdge,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphStats {
    pub agents: usize,
    pub concepts: usize,
    pub regions: usize,
    pub handles_edges: usize,
    pub belongs_to_edges: usize,
}

/// Storage for typed nodes and edges.
///
/// Edges require both endpoints to exist. Removing a node removes its
/// incident edges. HandlesConcept edges are only mutated through
/// [`GraphRepository::modify_handles_edge`], which is linearizable per edge.
#[async_trait]
pub trait GraphRepository: Send + Sync {
    /// Insert or replace a node
    async fn upsert_node(&self, node: GraphNode) -> Result<NodeId, GraphError>;

    async fn get_node(&self, id: &NodeId) -> Result<Option<GraphNode>, GraphError>;

    async fn find_nodes(&self, predicate: NodePredicate<'_>) -> Result<Vec<GraphNode>, GraphError>;

    /// Remove a node and every edge incident to it
    async fn remove_node(&self, id: &NodeId) -> Result<GraphNode, GraphError>;

    /// Insert an edge. Re-adding an existing HandlesConcept edge keeps its
    /// learned state.
    async fn add_edge(&self, edge: GraphEdge) -> Result<EdgeKey, GraphError>;

    async fn get_outgoing_edges(&self, node: &NodeId, edge_type: EdgeType) -> Result<Vec<GraphEdge>, GraphError>;

    async fn get_incoming_edges(&self, node: &NodeId, edge_type: EdgeType) -> Result<Vec<GraphEdge>, GraphError>;

    async fn get_handles_edge(&self, agent_id: &AgentId, concept: &str)
        -> Result<Option<HandlesConceptEdge>, GraphError>;

    /// Apply `mutation` to the edge while holding its lock. With
    /// `create_if_missing` a default edge is created first; both endpoints
    /// must still exist.
    async fn modify_handles_edge(
        &self,
        agent_id: &AgentId,
        concept: &str,
        create_if_missing: bool,
        mutation: EdgeMutation,
    ) -> Result<EdgeUpdate, GraphError>;

    /// Keys of HandlesConcept edges whose `last_updated >= since`
    async fn handles_edges_updated_since(&self, since: DateTime<Utc>) -> Result<Vec<(AgentId, String)>, GraphError>;

    /// Set an agent's status, returning the previous one
    async fn set_agent_status(&self, agent_id: &AgentId, status: AgentStatus) -> Result<AgentStatus, GraphError>;

    /// Set an agent's status only if it still equals `expected`. Returns
    /// whether the write happened.
    async fn compare_and_set_agent_status(
        &self,
        agent_id: &AgentId,
        expected: AgentStatus,
        status: AgentStatus,
    ) -> Result<bool, GraphError>;

    async fn stats(&self) -> Result<GraphStats, GraphError>;
}
