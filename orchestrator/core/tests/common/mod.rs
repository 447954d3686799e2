// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Hand-written trait mocks shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use synapse_cortex::application::{AgentRegistrar, AgentTelemetry};
use synapse_cortex::{
    AgentId, AgentStatus, EdgeKey, EdgeMutation, EdgeType, EdgeUpdate, GraphEdge, GraphError, GraphNode,
    GraphRepository, GraphStats, HandlesConceptEdge, InMemoryGraphRepository, NodeId, NodePredicate,
};
use synapse_sdk::{AgentClientError, HealthResponse, ProcessRequest, ProcessResponse};

use synapse_orchestrator_core::application::{LifecycleManager, ResearchService};
use synapse_orchestrator_core::domain::gateway::AgentGateway;
use synapse_orchestrator_core::domain::node_config::LifecycleConfig;
use synapse_orchestrator_core::domain::research::ResearchResult;
use synapse_orchestrator_core::domain::runtime::{
    AgentArtifact, AgentInstance, AgentLaunchSpec, AgentRuntime, InstanceId, InstanceStatus, RuntimeError,
};
use synapse_orchestrator_core::infrastructure::EventBus;

/// Runtime that only keeps books
#[derive(Default)]
pub struct MockRuntime {
    pub builds: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: Mutex<Vec<InstanceId>>,
    pub build_failures: AtomicUsize,
    pub start_failures: AtomicUsize,
    pub live_ports: Mutex<HashMap<InstanceId, u16>>,
    pub port_conflict: AtomicBool,
}

impl MockRuntime {
    pub fn fail_builds(&self, n: usize) {
        self.build_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_starts(&self, n: usize) {
        self.start_failures.store(n, Ordering::SeqCst);
    }

    pub fn live(&self) -> usize {
        self.live_ports.lock().len()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.lock().len()
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl AgentRuntime for MockRuntime {
    async fn build(&self, spec: &AgentLaunchSpec) -> Result<AgentArtifact, RuntimeError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.build_failures) {
            return Err(RuntimeError::BuildFailed("scripted build failure".into()));
        }
        Ok(AgentArtifact {
            reference: format!("mock:{}", spec.template),
            template: spec.template,
        })
    }

    async fn start(&self, spec: &AgentLaunchSpec, _artifact: &AgentArtifact) -> Result<AgentInstance, RuntimeError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.start_failures) {
            return Err(RuntimeError::StartFailed("scripted start failure".into()));
        }
        let id = InstanceId::new(format!("mock-{}", spec.agent_id));
        let mut live = self.live_ports.lock();
        if live.values().any(|p| *p == spec.port) {
            self.port_conflict.store(true, Ordering::SeqCst);
        }
        live.insert(id.clone(), spec.port);
        Ok(AgentInstance {
            id,
            endpoint: format!("http://mock-agent:{}", spec.port),
        })
    }

    async fn stop(&self, id: &InstanceId) -> Result<(), RuntimeError> {
        self.live_ports.lock().remove(id);
        self.stops.lock().push(id.clone());
        Ok(())
    }

    async fn status(&self, id: &InstanceId) -> Result<InstanceStatus, RuntimeError> {
        if self.live_ports.lock().contains_key(id) {
            Ok(InstanceStatus::Running)
        } else {
            Err(RuntimeError::InstanceNotFound(id.to_string()))
        }
    }
}

/// Gateway answering every endpoint unless told otherwise
#[derive(Default)]
pub struct MockGateway {
    pub unhealthy: AtomicBool,
    pub failing_endpoints: Mutex<HashSet<String>>,
    pub health_calls: AtomicUsize,
    pub process_calls: Mutex<Vec<(String, ProcessRequest)>>,
}

impl MockGateway {
    pub fn fail_endpoint(&self, endpoint: &str) {
        self.failing_endpoints.lock().insert(endpoint.to_string());
    }

    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.process_calls.lock().iter().filter(|(e, _)| e == endpoint).count()
    }
}

#[async_trait]
impl AgentGateway for MockGateway {
    async fn health(&self, _endpoint: &str, _timeout: Duration) -> Result<HealthResponse, AgentClientError> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        if self.unhealthy.load(Ordering::SeqCst) {
            let mut health = HealthResponse::healthy();
            health.status = "starting".into();
            Ok(health)
        } else {
            Ok(HealthResponse::healthy())
        }
    }

    async fn process(
        &self,
        endpoint: &str,
        request: &ProcessRequest,
        _timeout: Duration,
    ) -> Result<ProcessResponse, AgentClientError> {
        self.process_calls.lock().push((endpoint.to_string(), request.clone()));
        if self.failing_endpoints.lock().contains(endpoint) {
            return Ok(ProcessResponse::error("scripted failure"));
        }
        Ok(ProcessResponse::success(
            json!({ "answer": format!("{} via {}", request.concept, endpoint) }),
            0.9,
        ))
    }
}

/// Research with a fixed answer and an optional delay
pub struct FixedResearch {
    pub domain: String,
    pub complexity: f64,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FixedResearch {
    pub fn new(domain: &str, complexity: f64) -> Self {
        Self {
            domain: domain.to_string(),
            complexity,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ResearchService for FixedResearch {
    async fn research(&self, concept: &str, _intent: &str) -> ResearchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        ResearchResult {
            concept: concept.to_string(),
            domain: self.domain.clone(),
            complexity_score: self.complexity,
            definitions: vec![format!("{} is a thing studied in {}", concept, self.domain)],
            related_concepts: Vec::new(),
            sources: vec!["mock-researcher".into()],
            confidence: 0.8,
        }
    }
}

/// In-memory graph whose edge writes can be switched to fail
#[derive(Default)]
pub struct FlakyGraph {
    pub inner: InMemoryGraphRepository,
    pub fail_edges: AtomicBool,
}

#[async_trait]
impl GraphRepository for FlakyGraph {
    async fn upsert_node(&self, node: GraphNode) -> Result<NodeId, GraphError> {
        self.inner.upsert_node(node).await
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<GraphNode>, GraphError> {
        self.inner.get_node(id).await
    }

    async fn find_nodes(&self, predicate: NodePredicate<'_>) -> Result<Vec<GraphNode>, GraphError> {
        self.inner.find_nodes(predicate).await
    }

    async fn remove_node(&self, id: &NodeId) -> Result<GraphNode, GraphError> {
        self.inner.remove_node(id).await
    }

    async fn add_edge(&self, edge: GraphEdge) -> Result<EdgeKey, GraphError> {
        if self.fail_edges.load(Ordering::SeqCst) {
            return Err(GraphError::Storage("scripted edge write failure".into()));
        }
        self.inner.add_edge(edge).await
    }

    async fn get_outgoing_edges(&self, node: &NodeId, edge_type: EdgeType) -> Result<Vec<GraphEdge>, GraphError> {
        self.inner.get_outgoing_edges(node, edge_type).await
    }

    async fn get_incoming_edges(&self, node: &NodeId, edge_type: EdgeType) -> Result<Vec<GraphEdge>, GraphError> {
        self.inner.get_incoming_edges(node, edge_type).await
    }

    async fn get_handles_edge(
        &self,
        agent_id: &AgentId,
        concept: &str,
    ) -> Result<Option<HandlesConceptEdge>, GraphError> {
        self.inner.get_handles_edge(agent_id, concept).await
    }

    async fn modify_handles_edge(
        &self,
        agent_id: &AgentId,
        concept: &str,
        create_if_missing: bool,
        mutation: EdgeMutation,
    ) -> Result<EdgeUpdate, GraphError> {
        self.inner
            .modify_handles_edge(agent_id, concept, create_if_missing, mutation)
            .await
    }

    async fn handles_edges_updated_since(&self, since: DateTime<Utc>) -> Result<Vec<(AgentId, String)>, GraphError> {
        self.inner.handles_edges_updated_since(since).await
    }

    async fn set_agent_status(&self, agent_id: &AgentId, status: AgentStatus) -> Result<AgentStatus, GraphError> {
        self.inner.set_agent_status(agent_id, status).await
    }

    async fn compare_and_set_agent_status(
        &self,
        agent_id: &AgentId,
        expected: AgentStatus,
        status: AgentStatus,
    ) -> Result<bool, GraphError> {
        self.inner.compare_and_set_agent_status(agent_id, expected, status).await
    }

    async fn stats(&self) -> Result<GraphStats, GraphError> {
        self.inner.stats().await
    }
}

/// Lifecycle settings for tests: no port probing, fast health polling
pub fn test_lifecycle_config() -> LifecycleConfig {
    LifecycleConfig {
        port_range_start: 7000,
        port_range_end: 7099,
        probe_ports: false,
        health_check_timeout_secs: 2,
        health_poll_interval_ms: 20,
        ..Default::default()
    }
}

pub struct Harness {
    pub graph: Arc<dyn GraphRepository>,
    pub runtime: Arc<MockRuntime>,
    pub gateway: Arc<MockGateway>,
    pub research: Arc<FixedResearch>,
    pub registrar: Arc<AgentRegistrar>,
    pub telemetry: Arc<AgentTelemetry>,
    pub event_bus: Arc<EventBus>,
    pub manager: Arc<LifecycleManager>,
}

impl Harness {
    pub fn new(config: LifecycleConfig, research: FixedResearch) -> Self {
        Self::with_graph(config, research, Arc::new(InMemoryGraphRepository::new()))
    }

    pub fn with_graph(config: LifecycleConfig, research: FixedResearch, graph: Arc<dyn GraphRepository>) -> Self {
        let runtime = Arc::new(MockRuntime::default());
        let gateway = Arc::new(MockGateway::default());
        let research = Arc::new(research);
        let event_bus = Arc::new(EventBus::with_default_capacity());
        let telemetry = Arc::new(AgentTelemetry::new());
        let registrar = Arc::new(AgentRegistrar::new(graph.clone(), event_bus.clone()));
        let manager = Arc::new(
            LifecycleManager::new(
                config,
                runtime.clone(),
                gateway.clone(),
                research.clone(),
                registrar.clone(),
                event_bus.clone(),
            )
            .with_telemetry(telemetry.clone()),
        );
        Self {
            graph,
            runtime,
            gateway,
            research,
            registrar,
            telemetry,
            event_bus,
            manager,
        }
    }

    pub async fn agent_status(&self, agent_id: &AgentId) -> Option<AgentStatus> {
        self.graph
            .get_node(&NodeId::agent(agent_id))
            .await
            .unwrap()
            .and_then(|n| n.as_agent().map(|a| a.status))
    }
}
