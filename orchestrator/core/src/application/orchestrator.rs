// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Orchestrator routing service.
//!
//! Each task is routed to the top-ranked agent for its concept. The outcome
//! is fed back to the Hebbian engine and the agent's telemetry. On a
//! discovery miss the lifecycle manager is asked for a new agent, and
//! discovery is retried once when the agent comes up healthy. Tasks of one
//! batch run concurrently up to `max_parallel_tasks`; a failing task never
//! affects its siblings.

use chrono::Utc;
use futures::future::join_all;
use metrics::{counter, histogram};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use synapse_cortex::application::{
    AgentRegistrar, AgentRegistration, AgentTelemetry, DiscoveryOutcome, DiscoveryService, HebbianEngine,
    QueryContext, ScoredAgent,
};
use synapse_cortex::{canonicalize_concept, AgentId, AgentNode, ConceptNode, GraphError, GraphRepository};
use synapse_sdk::ProcessRequest;

use crate::application::neurogenesis::LifecycleManager;
use crate::domain::events::RoutingEvent;
use crate::domain::gateway::AgentGateway;
use crate::domain::lifecycle::CreationOutcome;
use crate::domain::node_config::{NetworkConfig, StaticAgentConfig};
use crate::domain::task::{QueryRequest, QueryResponse, Task, TaskError, TaskResult};
use crate::infrastructure::event_bus::EventBus;

pub struct OrchestratorService {
    graph: Arc<dyn GraphRepository>,
    discovery: Arc<DiscoveryService>,
    hebbian: Arc<HebbianEngine>,
    telemetry: Arc<AgentTelemetry>,
    registrar: Arc<AgentRegistrar>,
    lifecycle: Arc<LifecycleManager>,
    gateway: Arc<dyn AgentGateway>,
    event_bus: Arc<EventBus>,
    config: NetworkConfig,
    parallelism: Arc<Semaphore>,
}

impl OrchestratorService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: Arc<dyn GraphRepository>,
        discovery: Arc<DiscoveryService>,
        hebbian: Arc<HebbianEngine>,
        telemetry: Arc<AgentTelemetry>,
        registrar: Arc<AgentRegistrar>,
        lifecycle: Arc<LifecycleManager>,
        gateway: Arc<dyn AgentGateway>,
        event_bus: Arc<EventBus>,
        config: NetworkConfig,
    ) -> Self {
        let parallelism = Arc::new(Semaphore::new(config.max_parallel_tasks.max(1)));
        Self {
            graph,
            discovery,
            hebbian,
            telemetry,
            registrar,
            lifecycle,
            gateway,
            event_bus,
            config,
            parallelism,
        }
    }

    pub fn graph(&self) -> &Arc<dyn GraphRepository> {
        &self.graph
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleManager> {
        &self.lifecycle
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub async fn discover(
        &self,
        concept: &str,
        intent: &str,
        context: &QueryContext,
    ) -> Result<Vec<ScoredAgent>, GraphError> {
        self.discovery.discover(concept, intent, context).await
    }

    /// Register a statically configured agent and its concepts as one unit
    pub async fn register_agent(&self, agent: &StaticAgentConfig) -> Result<AgentId, GraphError> {
        let id = AgentId::new(agent.id.clone());
        let node = AgentNode::new_static(
            id.clone(),
            agent.name.clone().unwrap_or_else(|| agent.id.clone()),
            agent.endpoint.clone(),
        )
        .with_capabilities(agent.capabilities.iter().cloned())
        .with_expertise(agent.concepts.iter().cloned());

        let concepts = agent
            .concepts
            .iter()
            .map(|c| ConceptNode::new(c, agent.region.clone(), agent.complexity_score))
            .collect();

        self.registrar
            .register(AgentRegistration {
                agent: node,
                concepts,
                region: agent.region.clone(),
            })
            .await?;
        Ok(id)
    }

    /// Returns the number of agents registered; failures are logged and skipped
    pub async fn register_static_agents(&self, agents: &[StaticAgentConfig]) -> usize {
        let mut registered = 0;
        for agent in agents {
            match self.register_agent(agent).await {
                Ok(_) => registered += 1,
                Err(e) => warn!(agent_id = %agent.id, error = %e, "Failed to register static agent"),
            }
        }
        info!(registered, configured = agents.len(), "Static agents registered");
        registered
    }

    /// Route every task of the batch and collect per-task results. Task ids
    /// are expected to be unique; see [`QueryRequest::validate`].
    pub async fn process_query(&self, request: QueryRequest) -> QueryResponse {
        info!(query_id = %request.query_id, tasks = request.tasks.len(), "Processing query");
        let context = &request.context;

        let runs = request.tasks.iter().map(|task| async move {
            // the semaphore is never closed
            let _permit = self.parallelism.acquire().await.ok();
            (task.task_id.clone(), self.process_task(task, context).await)
        });

        let collected_results: BTreeMap<String, TaskResult> = join_all(runs).await.into_iter().collect();
        QueryResponse {
            query_id: request.query_id,
            collected_results,
        }
    }

    pub async fn process_task(&self, task: &Task, context: &QueryContext) -> TaskResult {
        let result = self.route(task, context).await;
        let status = match &result {
            Ok(_) => "success",
            Err((_, TaskError::Queued { .. })) => "queued",
            Err(_) => "error",
        };
        counter!("synapse_tasks_total", "status" => status).increment(1);

        match result {
            Ok(result) => result,
            Err((agent, error)) => {
                warn!(task_id = %task.task_id, concept = %task.concept, code = error.code(), "Task failed: {}", error);
                self.event_bus.publish_routing_event(RoutingEvent::TaskFailed {
                    task_id: task.task_id.clone(),
                    concept: task.concept.clone(),
                    code: error.code().to_string(),
                    reason: error.to_string(),
                    failed_at: Utc::now(),
                });
                TaskResult::failure(agent.as_ref(), &error)
            }
        }
    }

    async fn route(&self, task: &Task, context: &QueryContext) -> Result<TaskResult, (Option<AgentId>, TaskError)> {
        let concept = canonicalize_concept(&task.concept);
        if concept.is_empty() {
            return Err((None, TaskError::ConceptUnknown(task.concept.clone())));
        }

        let outcome = self.lookup(&concept, &task.intent, context).await?;
        let miss = match outcome {
            DiscoveryOutcome::Candidates(candidates) => return self.dispatch_top(task, &concept, candidates).await,
            DiscoveryOutcome::ConceptUnknown => TaskError::ConceptUnknown(concept.clone()),
            DiscoveryOutcome::NoCandidateAgents => TaskError::NoCandidateAgents(concept.clone()),
        };

        debug!(task_id = %task.task_id, concept = %concept, reason = miss.code(), "Discovery miss, requesting agent");
        self.event_bus.publish_routing_event(RoutingEvent::DiscoveryMiss {
            task_id: task.task_id.clone(),
            concept: concept.clone(),
            reason: miss.code().to_string(),
            missed_at: Utc::now(),
        });

        match self.lifecycle.request_create(&concept, &task.intent).await {
            Ok(CreationOutcome::Ready(agent)) => {
                debug!(task_id = %task.task_id, agent_id = %agent.agent_id, "Agent ready, retrying discovery");
                match self.lookup(&concept, &task.intent, context).await? {
                    DiscoveryOutcome::Candidates(candidates) => self.dispatch_top(task, &concept, candidates).await,
                    DiscoveryOutcome::ConceptUnknown => Err((None, TaskError::ConceptUnknown(concept))),
                    DiscoveryOutcome::NoCandidateAgents => Err((None, TaskError::NoCandidateAgents(concept))),
                }
            }
            Ok(CreationOutcome::Queued { position }) => Err((None, TaskError::Queued { concept, position })),
            Err(e) => Err((None, TaskError::Provisioning(e))),
        }
    }

    async fn lookup(
        &self,
        concept: &str,
        intent: &str,
        context: &QueryContext,
    ) -> Result<DiscoveryOutcome, (Option<AgentId>, TaskError)> {
        self.discovery
            .lookup(concept, intent, context)
            .await
            .map_err(|e| (None, TaskError::Graph(e.to_string())))
    }

    async fn dispatch_top(
        &self,
        task: &Task,
        concept: &str,
        candidates: Vec<ScoredAgent>,
    ) -> Result<TaskResult, (Option<AgentId>, TaskError)> {
        match candidates.into_iter().next() {
            Some(top) => self.dispatch(task, concept, top).await,
            None => Err((None, TaskError::NoCandidateAgents(concept.to_string()))),
        }
    }

    async fn dispatch(
        &self,
        task: &Task,
        concept: &str,
        candidate: ScoredAgent,
    ) -> Result<TaskResult, (Option<AgentId>, TaskError)> {
        let agent = candidate.agent;
        self.event_bus.publish_routing_event(RoutingEvent::TaskDispatched {
            task_id: task.task_id.clone(),
            concept: concept.to_string(),
            intent: task.intent.clone(),
            agent_id: agent.id.clone(),
            score: candidate.score,
            dispatched_at: Utc::now(),
        });
        debug!(task_id = %task.task_id, agent_id = %agent.id, score = candidate.score, "Dispatching task");

        let request = ProcessRequest::new(task.intent.clone(), concept, task.args.clone());
        let timeout = self.config.dispatch_timeout();
        let guard = self.telemetry.begin(&agent.id);
        let started = Instant::now();
        let response = self.gateway.process(&agent.endpoint, &request, timeout).await;
        let latency = started.elapsed();
        self.lifecycle.touch(&agent.id);

        let outcome = match response {
            Ok(response) if response.is_success() => {
                guard.finish(latency, Some(response.confidence));
                Ok(TaskResult::success(&agent.id, response.data, response.confidence))
            }
            Ok(response) => {
                guard.finish(latency, Some(0.0));
                Err(TaskError::AgentError {
                    agent_id: agent.id.clone(),
                    message: response.error_message().unwrap_or("unspecified error").to_string(),
                })
            }
            Err(e) if e.is_timeout() => {
                drop(guard);
                Err(TaskError::AgentTimeout {
                    agent_id: agent.id.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Err(e) => {
                drop(guard);
                Err(TaskError::AgentUnreachable {
                    agent_id: agent.id.clone(),
                    reason: e.to_string(),
                })
            }
        };

        let success = outcome.is_ok();
        histogram!("synapse_dispatch_latency_seconds").record(latency.as_secs_f64());
        self.record_outcome(&agent.id, concept, success).await;
        self.event_bus.publish_routing_event(RoutingEvent::TaskCompleted {
            task_id: task.task_id.clone(),
            concept: concept.to_string(),
            agent_id: agent.id.clone(),
            success,
            latency_ms: latency.as_millis() as u64,
            completed_at: Utc::now(),
        });

        outcome.map_err(|e| (Some(agent.id), e))
    }

    async fn record_outcome(&self, agent_id: &AgentId, concept: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        match self.hebbian.record_outcome(agent_id, concept, success).await {
            Ok(edge) => {
                counter!("synapse_hebbian_updates_total", "outcome" => outcome).increment(1);
                debug!(agent_id = %agent_id, concept = %concept, weight = edge.weight, "Hebbian weight updated");
            }
            // agent retired while the task was in flight
            Err(GraphError::NodeNotFound(_)) => {
                debug!(agent_id = %agent_id, "Skipping Hebbian update for removed agent")
            }
            Err(e) => warn!(agent_id = %agent_id, concept = %concept, error = %e, "Failed to record Hebbian outcome"),
        }
    }
}
