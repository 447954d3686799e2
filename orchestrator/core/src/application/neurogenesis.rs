// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Dynamic Lifecycle Manager (neurogenesis)
//!
//! Grows a new agent for a concept nothing handles yet and retires it once
//! it goes idle or grows old.
//!
//! # Provisioning pipeline
//!
//! research -> template selection -> port allocation -> build -> start ->
//! health check -> graph registration. Any failure after the port is
//! allocated tears down what exists so far: the instance is stopped, the
//! port released and the record discarded. Nothing reaches the graph
//! unless the agent answered its health check.
//!
//! # Shared state
//!
//! Records, the single-flight table and the creation queue live behind one
//! lock, so the capacity check, the single-flight claim and the queue
//! append are a single atomic step. A record's port is taken out of the
//! record before it is released, which makes the release happen once.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use synapse_cortex::application::{AgentRegistrar, AgentRegistration, AgentTelemetry};
use synapse_cortex::{canonicalize_concept, AgentId, AgentNode, ConceptNode};

use crate::application::port_allocator::PortAllocator;
use crate::application::research::ResearchService;
use crate::domain::events::LifecycleEvent;
use crate::domain::gateway::AgentGateway;
use crate::domain::lifecycle::{
    CreationOutcome, CreationQueueEntry, DuplicateRequestPolicy, EvictionReason, LifecycleError, LifecycleRecord,
    LifecycleState, ProvisionedAgent,
};
use crate::domain::node_config::LifecycleConfig;
use crate::domain::research::{select_template, ResearchResult, TemplatePolicy};
use crate::domain::runtime::{AgentLaunchSpec, AgentRuntime, InstanceId, InstanceStatus, ResourceLimits};
use crate::infrastructure::event_bus::EventBus;

type ProvisionResult = Result<ProvisionedAgent, LifecycleError>;
type ProvisionSignal = watch::Receiver<Option<ProvisionResult>>;
type CreationResult = Result<CreationOutcome, LifecycleError>;

#[derive(Default)]
struct ManagerState {
    records: HashMap<AgentId, LifecycleRecord>,
    /// Canonical concept -> completion signal of its provisioning attempt
    in_flight: HashMap<String, ProvisionSignal>,
    queue: VecDeque<CreationQueueEntry>,
}

impl ManagerState {
    fn active_count(&self) -> usize {
        self.records.values().filter(|r| r.state.is_active()).count()
    }

    fn healthy_for(&self, concept: &str) -> Option<ProvisionedAgent> {
        self.records
            .values()
            .filter(|r| r.state == LifecycleState::Healthy && r.concept == concept)
            .find_map(provisioned_from)
    }
}

fn provisioned_from(record: &LifecycleRecord) -> Option<ProvisionedAgent> {
    Some(ProvisionedAgent {
        agent_id: record.agent_id.clone(),
        concept: record.concept.clone(),
        template: record.template?,
        domain: record.domain.clone()?,
        endpoint: record.endpoint.clone()?,
        port: record.port?,
    })
}

/// What one maintenance sweep did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub retired: Vec<(AgentId, EvictionReason)>,
    pub expired: Vec<String>,
    /// Concepts taken off the queue and handed to the pipeline
    pub started: Vec<String>,
}

pub struct LifecycleManager {
    config: LifecycleConfig,
    resources: ResourceLimits,
    policy: TemplatePolicy,
    ports: PortAllocator,
    runtime: Arc<dyn AgentRuntime>,
    gateway: Arc<dyn AgentGateway>,
    research: Arc<dyn ResearchService>,
    registrar: Arc<AgentRegistrar>,
    telemetry: Option<Arc<AgentTelemetry>>,
    event_bus: Arc<EventBus>,
    state: Mutex<ManagerState>,
    shutdown_token: CancellationToken,
}

impl LifecycleManager {
    pub fn new(
        config: LifecycleConfig,
        runtime: Arc<dyn AgentRuntime>,
        gateway: Arc<dyn AgentGateway>,
        research: Arc<dyn ResearchService>,
        registrar: Arc<AgentRegistrar>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let mut ports = PortAllocator::new(config.port_range_start, config.port_range_end);
        if config.probe_ports {
            ports = ports.with_probe(config.agent_host.clone());
        }
        let policy = TemplatePolicy::new(&config.function_intents, &config.specialist_domains);

        Self {
            config,
            resources: ResourceLimits::default(),
            policy,
            ports,
            runtime,
            gateway,
            research,
            registrar,
            telemetry: None,
            event_bus,
            state: Mutex::new(ManagerState::default()),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn with_resources(mut self, resources: ResourceLimits) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<AgentTelemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = token;
        self
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn ports(&self) -> &PortAllocator {
        &self.ports
    }

    /// Snapshot of every live record, oldest first
    pub fn records(&self) -> Vec<LifecycleRecord> {
        let mut records: Vec<_> = self.state.lock().records.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.agent_id.cmp(&b.agent_id)));
        records
    }

    pub fn record(&self, agent_id: &AgentId) -> Option<LifecycleRecord> {
        self.state.lock().records.get(agent_id).cloned()
    }

    pub fn queue(&self) -> Vec<CreationQueueEntry> {
        self.state.lock().queue.iter().cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active_count()
    }

    pub fn is_dynamic(&self, agent_id: &AgentId) -> bool {
        self.state.lock().records.contains_key(agent_id)
    }

    /// Ask for an agent handling `concept`.
    ///
    /// Returns `Ready` once the agent is registered, or `Queued` when all
    /// slots are taken. A concurrent request for the same concept shares
    /// the running attempt, or fails with `AlreadyInProgress` under the
    /// reject policy.
    pub async fn request_create(self: &Arc<Self>, concept: &str, intent: &str) -> CreationResult {
        let concept = canonicalize_concept(concept);
        let intent = synapse_sdk::intent::normalize(intent);

        self.event_bus
            .publish_lifecycle_event(LifecycleEvent::CreationRequested {
                concept: concept.clone(),
                intent: intent.clone(),
                requested_at: Utc::now(),
            });

        let signal = {
            let mut state = self.state.lock();
            if let Some(agent) = state.healthy_for(&concept) {
                debug!(concept = %concept, agent_id = %agent.agent_id, "Concept already has a dynamic agent");
                return Ok(CreationOutcome::Ready(agent));
            }

            let joined = state.in_flight.get(&concept).cloned();
            if let Some(signal) = joined {
                match self.config.duplicate_request_policy {
                    DuplicateRequestPolicy::Reject => {
                        debug!(concept = %concept, "Rejecting duplicate creation request");
                        return Err(LifecycleError::AlreadyInProgress(concept));
                    }
                    DuplicateRequestPolicy::Join => {
                        debug!(concept = %concept, "Joining in-flight creation");
                        signal
                    }
                }
            } else if let Some(index) = state.queue.iter().position(|e| e.concept == concept) {
                return Ok(CreationOutcome::Queued { position: index + 1 });
            } else if state.active_count() >= self.config.max_concurrent_agents {
                state
                    .queue
                    .push_back(CreationQueueEntry::new(concept.clone(), intent.clone()));
                let position = state.queue.len();
                metrics::gauge!("synapse_creation_queue_depth").set(position as f64);
                info!(concept = %concept, position, "At capacity, creation request queued");
                self.event_bus
                    .publish_lifecycle_event(LifecycleEvent::CreationQueued {
                        concept,
                        position,
                        queued_at: Utc::now(),
                    });
                return Ok(CreationOutcome::Queued { position });
            } else {
                self.claim(&mut state, concept.clone(), intent, None)
            }
        };

        await_outcome(signal, &concept).await.map(CreationOutcome::Ready)
    }

    /// Register a provisioning attempt and start its pipeline. Caller holds the lock.
    fn claim(
        self: &Arc<Self>,
        state: &mut ManagerState,
        concept: String,
        intent: String,
        research: Option<ResearchResult>,
    ) -> ProvisionSignal {
        let agent_id = AgentId::new_dynamic(&concept);
        state.records.insert(
            agent_id.clone(),
            LifecycleRecord::new(agent_id.clone(), concept.clone(), intent.clone()),
        );

        let (tx, rx) = watch::channel(None);
        state.in_flight.insert(concept.clone(), rx.clone());
        metrics::gauge!("synapse_active_dynamic_agents").set(state.active_count() as f64);

        info!(agent_id = %agent_id, concept = %concept, intent = %intent, "Provisioning started");

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let result = manager.provision(&agent_id, &concept, &intent, research).await;
            manager.complete(&concept, result, tx);
        });
        rx
    }

    fn complete(&self, concept: &str, result: ProvisionResult, tx: watch::Sender<Option<ProvisionResult>>) {
        {
            let mut state = self.state.lock();
            state.in_flight.remove(concept);
            metrics::gauge!("synapse_active_dynamic_agents").set(state.active_count() as f64);
        }
        // waiters may all be gone
        let _ = tx.send(Some(result));
    }

    async fn provision(
        &self,
        agent_id: &AgentId,
        concept: &str,
        intent: &str,
        mut research: Option<ResearchResult>,
    ) -> ProvisionResult {
        let max_attempts = self.config.max_provision_attempts.max(1);
        let mut attempt = 1;

        loop {
            let error = match self.attempt(agent_id, concept, intent, &mut research).await {
                Ok(agent) => return Ok(agent),
                Err(error) => error,
            };

            metrics::counter!("synapse_provisioning_failures_total", "reason" => error.code()).increment(1);
            warn!(
                agent_id = %agent_id,
                concept = %concept,
                attempt,
                max_attempts,
                error = %error,
                "Provisioning attempt failed"
            );
            self.event_bus
                .publish_lifecycle_event(LifecycleEvent::ProvisioningFailed {
                    agent_id: agent_id.clone(),
                    concept: concept.to_string(),
                    attempt,
                    reason: error.to_string(),
                    failed_at: Utc::now(),
                });

            if attempt < max_attempts && error.is_retryable() && !self.shutdown_token.is_cancelled() {
                attempt += 1;
                let restarted = {
                    let mut state = self.state.lock();
                    state.records.get_mut(agent_id).map(|record| {
                        record.attempt = attempt;
                        record.transition(LifecycleState::Creating)
                    })
                };
                if let Some(Ok(_)) = restarted {
                    info!(agent_id = %agent_id, concept = %concept, attempt, "Retrying provisioning");
                    continue;
                }
            }

            self.state.lock().records.remove(agent_id);
            return Err(error);
        }
    }

    async fn attempt(
        &self,
        agent_id: &AgentId,
        concept: &str,
        intent: &str,
        research: &mut Option<ResearchResult>,
    ) -> ProvisionResult {
        self.transition(agent_id, LifecycleState::Researching)?;
        let findings = match research {
            Some(findings) => findings.clone(),
            None => {
                let findings = self.research.research(concept, intent).await;
                *research = Some(findings.clone());
                findings
            }
        };

        let template = select_template(&findings, intent, &self.policy);
        self.update(agent_id, |record| {
            record.template = Some(template);
            record.domain = Some(findings.domain.clone());
        })?;
        self.transition(agent_id, LifecycleState::TemplateSelected)?;
        debug!(agent_id = %agent_id, template = %template, domain = %findings.domain, "Template selected");

        let port = match self.ports.allocate() {
            Some(port) => port,
            None => {
                let (start, end) = self.ports.range();
                self.fail(agent_id);
                return Err(LifecycleError::PortExhausted { start, end });
            }
        };
        if let Err(e) = self.update(agent_id, |record| record.port = Some(port)) {
            self.ports.release(port);
            return Err(e);
        }

        let spec = AgentLaunchSpec {
            agent_id: agent_id.clone(),
            template,
            knowledge: findings.to_knowledge(),
            port,
            resources: self.resources.clone(),
        };

        if let Err(e) = self.transition(agent_id, LifecycleState::Building) {
            self.teardown(agent_id).await;
            return Err(e);
        }
        let artifact = match self.runtime.build(&spec).await {
            Ok(artifact) => artifact,
            Err(e) => {
                self.teardown(agent_id).await;
                return Err(LifecycleError::BuildFailure {
                    agent_id: agent_id.clone(),
                    reason: e.to_string(),
                });
            }
        };

        if let Err(e) = self.transition(agent_id, LifecycleState::Starting) {
            self.teardown(agent_id).await;
            return Err(e);
        }
        let instance = match self.runtime.start(&spec, &artifact).await {
            Ok(instance) => instance,
            Err(e) => {
                self.teardown(agent_id).await;
                return Err(LifecycleError::StartFailure {
                    agent_id: agent_id.clone(),
                    reason: e.to_string(),
                });
            }
        };
        let stored = self.update(agent_id, |record| {
            record.instance_id = Some(instance.id.clone());
            record.endpoint = Some(instance.endpoint.clone());
        });
        if let Err(e) = stored {
            // record is gone, stop the instance directly
            if let Err(stop) = self.runtime.stop(&instance.id).await {
                warn!(agent_id = %agent_id, error = %stop, "Failed to stop orphaned instance");
            }
            self.ports.release(port);
            return Err(e);
        }

        if let Err(e) = self.transition(agent_id, LifecycleState::HealthChecking) {
            self.teardown(agent_id).await;
            return Err(e);
        }
        if let Err(e) = self.await_healthy(agent_id, &instance.id, &instance.endpoint).await {
            self.teardown(agent_id).await;
            return Err(e);
        }

        let agent = AgentNode::new_dynamic(
            agent_id.clone(),
            format!("{} agent", concept.replace('_', " ")),
            instance.endpoint.clone(),
            template,
        )
        .with_capabilities(template.default_capabilities())
        .with_expertise([concept]);

        let registration = AgentRegistration {
            agent,
            concepts: vec![ConceptNode::new(concept, findings.domain.clone(), findings.complexity_score)],
            region: findings.domain.clone(),
        };
        if let Err(e) = self.registrar.register(registration).await {
            self.teardown(agent_id).await;
            return Err(LifecycleError::GraphWriteFailure {
                agent_id: agent_id.clone(),
                reason: e.to_string(),
            });
        }

        let registered = self
            .update(agent_id, |record| record.last_used_at = Utc::now())
            .and_then(|_| self.transition(agent_id, LifecycleState::Healthy));
        if let Err(e) = registered {
            // shut down between registration and Healthy
            if let Err(dereg) = self.registrar.deregister(agent_id, false).await {
                warn!(agent_id = %agent_id, error = %dereg, "Failed to remove aborted agent from graph");
            }
            self.teardown(agent_id).await;
            return Err(e);
        }

        metrics::counter!("synapse_agents_provisioned_total", "template" => template.as_str()).increment(1);
        info!(
            agent_id = %agent_id,
            concept = %concept,
            template = %template,
            domain = %findings.domain,
            endpoint = %instance.endpoint,
            port,
            "Dynamic agent provisioned"
        );

        let provisioned = ProvisionedAgent {
            agent_id: agent_id.clone(),
            concept: concept.to_string(),
            template,
            domain: findings.domain.clone(),
            endpoint: instance.endpoint,
            port,
        };
        self.event_bus
            .publish_lifecycle_event(LifecycleEvent::AgentProvisioned {
                agent_id: provisioned.agent_id.clone(),
                concept: provisioned.concept.clone(),
                template,
                domain: provisioned.domain.clone(),
                endpoint: provisioned.endpoint.clone(),
                port,
                provisioned_at: Utc::now(),
            });
        Ok(provisioned)
    }

    /// Poll `/health` until it reports healthy or the deadline passes
    async fn await_healthy(
        &self,
        agent_id: &AgentId,
        instance: &InstanceId,
        endpoint: &str,
    ) -> Result<(), LifecycleError> {
        let deadline = self.config.health_check_timeout();
        let poll = self.config.health_poll_interval();
        let probe_timeout = poll.max(Duration::from_millis(500));

        let polling = async {
            loop {
                match self.gateway.health(endpoint, probe_timeout).await {
                    Ok(health) if health.is_healthy() => return Ok(()),
                    Ok(health) => debug!(agent_id = %agent_id, status = %health.status, "Agent not ready yet"),
                    Err(e) => debug!(agent_id = %agent_id, error = %e, "Health probe failed"),
                }
                if let Ok(InstanceStatus::Exited) = self.runtime.status(instance).await {
                    return Err(LifecycleError::StartFailure {
                        agent_id: agent_id.clone(),
                        reason: "instance exited during health check".to_string(),
                    });
                }
                tokio::select! {
                    _ = sleep(poll) => {}
                    _ = self.shutdown_token.cancelled() => {
                        return Err(LifecycleError::Aborted(agent_id.to_string()));
                    }
                }
            }
        };

        match tokio::time::timeout(deadline, polling).await {
            Ok(result) => result,
            Err(_) => Err(LifecycleError::HealthCheckTimeout {
                agent_id: agent_id.clone(),
                timeout_secs: deadline.as_secs(),
            }),
        }
    }

    fn transition(&self, agent_id: &AgentId, next: LifecycleState) -> Result<(), LifecycleError> {
        if self.shutdown_token.is_cancelled() && next != LifecycleState::Stopping && next != LifecycleState::Stopped {
            return Err(LifecycleError::Aborted(agent_id.to_string()));
        }

        let (concept, previous) = {
            let mut state = self.state.lock();
            let record = state
                .records
                .get_mut(agent_id)
                .ok_or_else(|| LifecycleError::Aborted(agent_id.to_string()))?;
            let previous = record.transition(next)?;
            (record.concept.clone(), previous)
        };

        debug!(agent_id = %agent_id, from = %previous, to = %next, "Lifecycle transition");
        self.event_bus
            .publish_lifecycle_event(LifecycleEvent::StateChanged {
                agent_id: agent_id.clone(),
                concept,
                from: previous,
                to: next,
                changed_at: Utc::now(),
            });
        Ok(())
    }

    fn update<F>(&self, agent_id: &AgentId, f: F) -> Result<(), LifecycleError>
    where
        F: FnOnce(&mut LifecycleRecord),
    {
        let mut state = self.state.lock();
        let record = state
            .records
            .get_mut(agent_id)
            .ok_or_else(|| LifecycleError::Aborted(agent_id.to_string()))?;
        f(record);
        Ok(())
    }

    fn fail(&self, agent_id: &AgentId) {
        if let Err(e) = self.transition(agent_id, LifecycleState::Failed) {
            debug!(agent_id = %agent_id, error = %e, "Could not mark record failed");
        }
    }

    /// Stop the instance and release the port of a failed attempt
    async fn teardown(&self, agent_id: &AgentId) {
        let (port, instance) = {
            let mut state = self.state.lock();
            match state.records.get_mut(agent_id) {
                Some(record) => {
                    record.endpoint = None;
                    (record.port.take(), record.instance_id.take())
                }
                None => (None, None),
            }
        };

        if let Some(instance) = instance {
            if let Err(e) = self.runtime.stop(&instance).await {
                warn!(agent_id = %agent_id, instance = %instance, error = %e, "Failed to stop instance during teardown");
            }
        }
        if let Some(port) = port {
            self.ports.release(port);
        }
        self.fail(agent_id);
        debug!(agent_id = %agent_id, "Teardown complete");
    }

    /// Record that a dynamic agent just served a task
    pub fn touch(&self, agent_id: &AgentId) {
        if let Some(record) = self.state.lock().records.get_mut(agent_id) {
            record.last_used_at = Utc::now();
        }
    }

    /// Stop a Healthy dynamic agent and free its port and capacity slot
    pub async fn retire(&self, agent_id: &AgentId, reason: EvictionReason) -> Result<(), LifecycleError> {
        let (concept, port, instance) = {
            let mut state = self.state.lock();
            let record = state
                .records
                .get_mut(agent_id)
                .ok_or_else(|| LifecycleError::AgentNotFound(agent_id.clone()))?;
            if record.state != LifecycleState::Healthy {
                return Err(LifecycleError::NotRetirable {
                    agent_id: agent_id.clone(),
                    state: record.state,
                });
            }
            record.transition(LifecycleState::Stopping)?;
            (record.concept.clone(), record.port.take(), record.instance_id.take())
        };
        self.event_bus
            .publish_lifecycle_event(LifecycleEvent::StateChanged {
                agent_id: agent_id.clone(),
                concept: concept.clone(),
                from: LifecycleState::Healthy,
                to: LifecycleState::Stopping,
                changed_at: Utc::now(),
            });

        // leave the routing table before the process goes away
        if let Err(e) = self
            .registrar
            .deregister(agent_id, self.config.retain_retired_agents)
            .await
        {
            warn!(agent_id = %agent_id, error = %e, "Failed to deregister retiring agent");
        }
        if let Some(telemetry) = &self.telemetry {
            telemetry.forget(agent_id);
        }
        if let Some(instance) = instance {
            if let Err(e) = self.runtime.stop(&instance).await {
                warn!(agent_id = %agent_id, instance = %instance, error = %e, "Failed to stop retiring agent");
            }
        }
        if let Some(port) = port {
            self.ports.release(port);
        }

        {
            let mut state = self.state.lock();
            if let Some(mut record) = state.records.remove(agent_id) {
                if let Err(e) = record.transition(LifecycleState::Stopped) {
                    debug!(agent_id = %agent_id, error = %e, "Unexpected state at stop");
                }
            }
            metrics::gauge!("synapse_active_dynamic_agents").set(state.active_count() as f64);
        }

        info!(agent_id = %agent_id, concept = %concept, reason = %reason, "Dynamic agent retired");
        self.event_bus
            .publish_lifecycle_event(LifecycleEvent::StateChanged {
                agent_id: agent_id.clone(),
                concept: concept.clone(),
                from: LifecycleState::Stopping,
                to: LifecycleState::Stopped,
                changed_at: Utc::now(),
            });
        self.event_bus
            .publish_lifecycle_event(LifecycleEvent::AgentRetired {
                agent_id: agent_id.clone(),
                concept,
                reason,
                retired_at: Utc::now(),
            });
        Ok(())
    }

    /// Retire idle and expired agents, drop stale queue entries, then start
    /// queued requests in FIFO order while slots are free.
    pub async fn maintenance_sweep(self: &Arc<Self>) -> SweepReport {
        let mut report = SweepReport::default();
        let now = Utc::now();

        let evictions: Vec<(AgentId, EvictionReason)> = {
            let state = self.state.lock();
            let mut evictions: Vec<_> = state
                .records
                .values()
                .filter_map(|r| {
                    r.eviction_reason(now, self.config.idle_timeout(), self.config.max_age())
                        .map(|reason| (r.agent_id.clone(), reason))
                })
                .collect();
            evictions.sort_by(|a, b| a.0.cmp(&b.0));
            evictions
        };

        for (agent_id, reason) in evictions {
            match self.retire(&agent_id, reason).await {
                Ok(()) => report.retired.push((agent_id, reason)),
                Err(e) => warn!(agent_id = %agent_id, error = %e, "Eviction failed"),
            }
        }

        let mut state = self.state.lock();
        if let Some(ttl) = self.config.queue_entry_ttl() {
            let (expired, kept): (Vec<_>, Vec<_>) = state.queue.drain(..).partition(|e| e.is_expired(now, ttl));
            state.queue = kept.into();
            for entry in expired {
                info!(concept = %entry.concept, queued_at = %entry.queued_at, "Queued creation request expired");
                self.event_bus
                    .publish_lifecycle_event(LifecycleEvent::QueueEntryExpired {
                        concept: entry.concept.clone(),
                        queued_at: entry.queued_at,
                        expired_at: now,
                    });
                report.expired.push(entry.concept);
            }
        }

        if !self.shutdown_token.is_cancelled() {
            while state.active_count() < self.config.max_concurrent_agents {
                let Some(entry) = state.queue.pop_front() else {
                    break;
                };
                if state.in_flight.contains_key(&entry.concept) || state.healthy_for(&entry.concept).is_some() {
                    debug!(concept = %entry.concept, "Queued concept already covered, dropping entry");
                    continue;
                }
                info!(concept = %entry.concept, "Draining queued creation request");
                report.started.push(entry.concept.clone());
                // the signal is watched through in_flight
                let _signal = self.claim(&mut state, entry.concept, entry.intent, entry.research);
            }
        }
        metrics::gauge!("synapse_creation_queue_depth").set(state.queue.len() as f64);
        drop(state);

        if !report.retired.is_empty() || !report.expired.is_empty() || !report.started.is_empty() {
            info!(
                retired = report.retired.len(),
                expired = report.expired.len(),
                started = report.started.len(),
                "Maintenance sweep completed"
            );
        }
        report
    }

    /// Wait for the in-flight attempt of `concept`, if there is one
    pub async fn wait_for(&self, concept: &str) -> Option<ProvisionResult> {
        let concept = canonicalize_concept(concept);
        let signal = self.state.lock().in_flight.get(&concept).cloned()?;
        Some(await_outcome(signal, &concept).await)
    }

    /// Start the maintenance sweep background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self: &Arc<Self>) {
        let period = Duration::from_secs(self.config.sweep_interval_secs.max(1));
        info!(
            interval_seconds = period.as_secs(),
            max_concurrent_agents = self.config.max_concurrent_agents,
            idle_timeout_min = self.config.idle_timeout_min,
            max_age_hours = self.config.max_age_hours,
            "Starting lifecycle maintenance sweep"
        );

        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.maintenance_sweep().await;
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping lifecycle maintenance sweep");
                    break;
                }
            }
        }
    }

    /// Cancel provisioning, drop the queue and retire every running agent
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();

        let running: Vec<AgentId> = {
            let mut state = self.state.lock();
            state.queue.clear();
            state
                .records
                .values()
                .filter(|r| r.state == LifecycleState::Healthy)
                .map(|r| r.agent_id.clone())
                .collect()
        };

        for agent_id in running {
            if let Err(e) = self.retire(&agent_id, EvictionReason::Shutdown).await {
                error!(agent_id = %agent_id, error = %e, "Failed to retire agent on shutdown");
            }
        }
        info!("Lifecycle manager shut down");
    }
}

async fn await_outcome(mut signal: ProvisionSignal, concept: &str) -> ProvisionResult {
    match signal.wait_for(Option::is_some).await {
        Ok(value) => value
            .as_ref()
            .cloned()
            .unwrap_or_else(|| Err(LifecycleError::Aborted(concept.to_string()))),
        Err(_) => Err(LifecycleError::Aborted(concept.to_string())),
    }
}
