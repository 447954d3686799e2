// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent registration as one unit of graph writes.
//!
//! A registration writes the region, any new concept nodes, the agent node,
//! one HandlesConcept edge per concept and the BelongsTo edges. If any write
//! fails, every node the registration created is removed again, which also
//! removes whatever edges were already written.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::EventBus;
use crate::domain::{
    AgentId, AgentNode, AgentStatus, BelongsToEdge, ConceptNode, CortexEvent, EdgeType, GraphEdge, GraphError,
    GraphNode, HandlesConceptEdge, NodeId, RegionNode,
};
use crate::infrastructure::GraphRepository;

#[derive(Debug, Clone)]
pub struct AgentRegistration {
    pub agent: AgentNode,
    /// Concepts the agent handles. Existing concept nodes are left as they are.
    pub concepts: Vec<ConceptNode>,
    pub region: String,
}

pub struct AgentRegistrar {
    graph: Arc<dyn GraphRepository>,
    event_bus: Arc<dyn EventBus>,
}

impl AgentRegistrar {
    pub fn new(graph: Arc<dyn GraphRepository>, event_bus: Arc<dyn EventBus>) -> Self {
        Self { graph, event_bus }
    }

    pub async fn register(&self, registration: AgentRegistration) -> Result<(), GraphError> {
        let agent_id = registration.agent.id.clone();
        let mut created = CreatedNodes::default();

        if let Err(e) = self.write_unit(&registration, &mut created).await {
            warn!(agent_id = %agent_id, error = %e, "Agent registration failed, rolling back");
            self.roll_back(&agent_id, created).await;
            return Err(registration_failed(&agent_id, e));
        }

        let concepts: Vec<String> = registration.concepts.iter().map(|c| c.name.clone()).collect();
        info!(
            agent_id = %agent_id,
            concepts = ?concepts,
            region = %registration.region,
            dynamic = registration.agent.is_dynamic,
            "Agent registered in graph"
        );

        let event = CortexEvent::AgentRegistered {
            agent_id,
            concepts,
            region: registration.region,
            is_dynamic: registration.agent.is_dynamic,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.event_bus.publish(event).await {
            warn!("Failed to publish agent registration event: {}", e);
        }
        Ok(())
    }

    async fn write_unit(&self, registration: &AgentRegistration, created: &mut CreatedNodes) -> Result<(), GraphError> {
        let region_id = NodeId::region(&registration.region);
        if self.graph.get_node(&region_id).await?.is_none() {
            self.graph
                .upsert_node(GraphNode::Region(RegionNode::new(registration.region.clone())))
                .await?;
            created.region = Some(region_id);
        }

        for concept in &registration.concepts {
            let id = NodeId::concept(&concept.name);
            if self.graph.get_node(&id).await?.is_none() {
                self.graph.upsert_node(GraphNode::Concept(concept.clone())).await?;
                created.concepts.push(id);
            }
        }

        let agent_node_id = NodeId::agent(&registration.agent.id);
        self.graph
            .upsert_node(GraphNode::Agent(registration.agent.clone()))
            .await?;
        created.agent = Some(agent_node_id);

        self.write_edges(registration, &created.concepts).await
    }

    /// Undo the nodes this registration created. Removing a node also drops
    /// its edges. Shared nodes another agent started using meanwhile stay.
    async fn roll_back(&self, agent_id: &AgentId, created: CreatedNodes) {
        if let Some(id) = created.agent {
            if let Err(e) = self.graph.remove_node(&id).await {
                warn!(agent_id = %agent_id, error = %e, "Rollback of agent node failed");
            }
        }

        for id in created.concepts {
            match self.graph.get_incoming_edges(&id, EdgeType::HandlesConcept).await {
                Ok(edges) if edges.is_empty() => {
                    if let Err(e) = self.graph.remove_node(&id).await {
                        warn!(agent_id = %agent_id, node = %id, error = %e, "Rollback of concept node failed");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(agent_id = %agent_id, node = %id, error = %e, "Rollback of concept node failed"),
            }
        }

        if let Some(id) = created.region {
            match self.graph.get_incoming_edges(&id, EdgeType::BelongsTo).await {
                Ok(edges) if edges.is_empty() => {
                    if let Err(e) = self.graph.remove_node(&id).await {
                        warn!(agent_id = %agent_id, node = %id, error = %e, "Rollback of region node failed");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(agent_id = %agent_id, node = %id, error = %e, "Rollback of region node failed"),
            }
        }
    }

    /// Remove an agent from routing. With `retain` the node and its edges
    /// stay for history and the agent is marked Retired.
    pub async fn deregister(&self, agent_id: &AgentId, retain: bool) -> Result<(), GraphError> {
        if retain {
            let previous = self.graph.set_agent_status(agent_id, AgentStatus::Retired).await?;
            let event = CortexEvent::AgentStatusChanged {
                agent_id: agent_id.clone(),
                old_status: previous,
                new_status: AgentStatus::Retired,
                timestamp: Utc::now(),
            };
            if let Err(e) = self.event_bus.publish(event).await {
                warn!("Failed to publish agent status event: {}", e);
            }
        } else {
            self.graph.remove_node(&NodeId::agent(agent_id)).await?;
            let event = CortexEvent::AgentRemoved {
                agent_id: agent_id.clone(),
                timestamp: Utc::now(),
            };
            if let Err(e) = self.event_bus.publish(event).await {
                warn!("Failed to publish agent removal event: {}", e);
            }
        }
        info!(agent_id = %agent_id, retained = retain, "Agent deregistered");
        Ok(())
    }

    /// Move an agent from `expected` to `status`. Returns false, writing
    /// nothing, when the status changed since it was read.
    pub async fn transition_status(
        &self,
        agent_id: &AgentId,
        expected: AgentStatus,
        status: AgentStatus,
    ) -> Result<bool, GraphError> {
        if expected == status {
            return Ok(true);
        }
        if !self
            .graph
            .compare_and_set_agent_status(agent_id, expected, status)
            .await?
        {
            return Ok(false);
        }
        let event = CortexEvent::AgentStatusChanged {
            agent_id: agent_id.clone(),
            old_status: expected,
            new_status: status,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.event_bus.publish(event).await {
            warn!("Failed to publish agent status event: {}", e);
        }
        Ok(true)
    }
}

/// Nodes written by one registration that did not exist before it
#[derive(Default)]
struct CreatedNodes {
    region: Option<NodeId>,
    concepts: Vec<NodeId>,
    agent: Option<NodeId>,
}

fn registration_failed(agent_id: &AgentId, error: GraphError) -> GraphError {
    match error {
        GraphError::RegistrationFailed { .. } => error,
        other => GraphError::RegistrationFailed {
            agent_id: agent_id.clone(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::NoopEventBus;
    use crate::infrastructure::{
        EdgeMutation, EdgeUpdate, GraphStats, InMemoryGraphRepository, NodePredicate,
    };
    use async_trait::async_trait;
    use chrono::DateTime;
    use synapse_sdk::TemplateKind;

    fn registration() -> AgentRegistration {
        let agent = AgentNode::new_dynamic(
            AgentId::from("dyn-1"),
            "quantum_computer agent",
            "http://127.0.0.1:41001",
            TemplateKind::EnhancedKnowledge,
        )
        .with_expertise(["quantum_computer"]);
        AgentRegistration {
            agent,
            concepts: vec![ConceptNode::new("quantum_computer", "Science", 0.9)],
            region: "Science".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_writes_full_unit() {
        let graph = Arc::new(InMemoryGraphRepository::new());
        let registrar = AgentRegistrar::new(graph.clone(), Arc::new(NoopEventBus));
        registrar.register(registration()).await.unwrap();

        let edge = graph
            .get_handles_edge(&AgentId::from("dyn-1"), "quantum_computer")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edge.weight, 0.5);

        let regions = graph
            .get_outgoing_edges(&NodeId::agent(&AgentId::from("dyn-1")), EdgeType::BelongsTo)
            .await
            .unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].as_belongs_to().unwrap().region, "Science");

        let stats = graph.stats().await.unwrap();
        assert_eq!(stats.agents, 1);
        assert_eq!(stats.concepts, 1);
        assert_eq!(stats.regions, 1);
        assert_eq!(stats.belongs_to_edges, 2);
    }

    #[tokio::test]
    async fn test_deregister_retain_marks_retired() {
        let graph = Arc::new(InMemoryGraphRepository::new());
        let registrar = AgentRegistrar::new(graph.clone(), Arc::new(NoopEventBus));
        registrar.register(registration()).await.unwrap();
        registrar.deregister(&AgentId::from("dyn-1"), true).await.unwrap();

        let node = graph
            .get_node(&NodeId::agent(&AgentId::from("dyn-1")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(node.as_agent().unwrap().status, AgentStatus::Retired);
        assert!(graph
            .get_handles_edge(&AgentId::from("dyn-1"), "quantum_computer")
            .await
            .unwrap()
            .is_some());

        registrar.deregister(&AgentId::from("dyn-1"), false).await.unwrap();
        assert_eq!(graph.stats().await.unwrap().agents, 0);
    }

    /// Delegates to the in-memory store but refuses BelongsTo edges
    struct FailingBelongsTo(InMemoryGraphRepository);

    #[async_trait]
    impl GraphRepository for FailingBelongsTo {
        async fn upsert_node(&self, node: GraphNode) -> Result<NodeId, GraphError> {
            self.0.upsert_node(node).await
        }
        async fn get_node(&self, id: &NodeId) -> Result<Option<GraphNode>, GraphError> {
            self.0.get_node(id).await
        }
        async fn find_nodes(&self, predicate: NodePredicate<'_>) -> Result<Vec<GraphNode>, GraphError> {
            self.0.find_nodes(predicate).await
        }
        async fn remove_node(&self, id: &NodeId) -> Result<GraphNode, GraphError> {
            self.0.remove_node(id).await
        }
        async fn add_edge(&self, edge: GraphEdge) -> Result<crate::domain::EdgeKey, GraphError> {
            if edge.edge_type() == EdgeType::BelongsTo {
                return Err(GraphError::Storage("disk full".into()));
            }
            self.0.add_edge(edge).await
        }
        async fn get_outgoing_edges(&self, node: &NodeId, t: EdgeType) -> Result<Vec<GraphEdge>, GraphError> {
            self.0.get_outgoing_edges(node, t).await
        }
        async fn get_incoming_edges(&self, node: &NodeId, t: EdgeType) -> Result<Vec<GraphEdge>, GraphError> {
            self.0.get_incoming_edges(node, t).await
        }
        async fn get_handles_edge(
            &self,
            agent_id: &AgentId,
            concept: &str,
        ) -> Result<Option<HandlesConceptEdge>, GraphError> {
            self.0.get_handles_edge(agent_id, concept).await
        }
        async fn modify_handles_edge(
            &self,
            agent_id: &AgentId,
            concept: &str,
            create_if_missing: bool,
            mutation: EdgeMutation,
        ) -> Result<EdgeUpdate, GraphError> {
            self.0.modify_handles_edge(agent_id, concept, create_if_missing, mutation).await
        }
        async fn handles_edges_updated_since(
            &self,
            since: DateTime<Utc>,
        ) -> Result<Vec<(AgentId, String)>, GraphError> {
            self.0.handles_edges_updated_since(since).await
        }
        async fn set_agent_status(&self, agent_id: &AgentId, status: AgentStatus) -> Result<AgentStatus, GraphError> {
            self.0.set_agent_status(agent_id, status).await
        }
        async fn compare_and_set_agent_status(
            &self,
            agent_id: &AgentId,
            expected: AgentStatus,
            status: AgentStatus,
        ) -> Result<bool, GraphError> {
            self.0.compare_and_set_agent_status(agent_id, expected, status).await
        }
        async fn stats(&self) -> Result<GraphStats, GraphError> {
            self.0.stats().await
        }
    }

    #[tokio::test]
    async fn test_failed_registration_rolls_back_agent() {
        let graph = Arc::new(FailingBelongsTo(InMemoryGraphRepository::new()));
        let registrar = AgentRegistrar::new(graph.clone(), Arc::new(NoopEventBus));
        let err = registrar.register(registration()).await.unwrap_err();
        assert!(matches!(err, GraphError::RegistrationFailed { .. }));

        assert!(graph
            .get_node(&NodeId::agent(&AgentId::from("dyn-1")))
            .await
            .unwrap()
            .is_none());
        let stats = graph.stats().await.unwrap();
        assert_eq!(stats.agents, 0);
        assert_eq!(stats.handles_edges, 0);
        assert_eq!(stats.concepts, 0);
        assert_eq!(stats.regions, 0);
        assert_eq!(stats.belongs_to_edges, 0);
    }

    #[tokio::test]
    async fn test_failed_registration_keeps_preexisting_nodes() {
        let graph = Arc::new(FailingBelongsTo(InMemoryGraphRepository::new()));
        graph
            .upsert_node(GraphNode::Region(RegionNode::new("Science")))
            .await
            .unwrap();
        graph
            .upsert_node(GraphNode::Concept(ConceptNode::new("quantum_computer", "Science", 0.4)))
            .await
            .unwrap();

        let registrar = AgentRegistrar::new(graph.clone(), Arc::new(NoopEventBus));
        assert!(registrar.register(registration()).await.is_err());

        let stats = graph.stats().await.unwrap();
        assert_eq!(stats.agents, 0);
        assert_eq!(stats.concepts, 1);
        assert_eq!(stats.regions, 1);
        let concept = graph
            .get_node(&NodeId::concept("quantum_computer"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(concept.as_concept().unwrap().complexity_score, 0.4);
    }
}
