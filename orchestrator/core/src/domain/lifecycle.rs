// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Neurogenesis lifecycle domain: provisioning states, records and errors.
//!
//! ```text
//! Creating -> Researching -> TemplateSelected -> Building -> Starting
//!          -> HealthChecking -> Healthy -> Stopping -> Stopped
//!                            \-> Failed (from any pre-Healthy state)
//! ```
//!
//! `Failed -> Creating` is only taken when the retry budget allows another
//! attempt.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use synapse_cortex::AgentId;
use synapse_sdk::TemplateKind;

use crate::domain::research::ResearchResult;
use crate::domain::runtime::InstanceId;

pub use crate::domain::node_config::DuplicateRequestPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Creating,
    Researching,
    TemplateSelected,
    Building,
    Starting,
    HealthChecking,
    Healthy,
    Failed,
    Stopping,
    Stopped,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Creating => "creating",
            LifecycleState::Researching => "researching",
            LifecycleState::TemplateSelected => "template_selected",
            LifecycleState::Building => "building",
            LifecycleState::Starting => "starting",
            LifecycleState::HealthChecking => "health_checking",
            LifecycleState::Healthy => "healthy",
            LifecycleState::Failed => "failed",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        }
    }

    /// Provisioning or running: the record holds a capacity slot
    pub fn is_active(&self) -> bool {
        !matches!(self, LifecycleState::Failed | LifecycleState::Stopped)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Failed | LifecycleState::Stopped)
    }

    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, next) {
            (Creating, Researching)
            | (Researching, TemplateSelected)
            | (TemplateSelected, Building)
            | (Building, Starting)
            | (Starting, HealthChecking)
            | (HealthChecking, Healthy)
            | (Healthy, Stopping)
            | (Stopping, Stopped)
            | (Failed, Creating) => true,
            (from, Failed) => !from.is_terminal() && *from != Healthy && *from != Stopping,
            _ => false,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dynamic agent, from the first provisioning step until it stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub agent_id: AgentId,
    /// Canonical concept name
    pub concept: String,
    pub intent: String,
    pub state: LifecycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<InstanceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub attempt: u32,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl LifecycleRecord {
    pub fn new(agent_id: AgentId, concept: impl Into<String>, intent: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            agent_id,
            concept: concept.into(),
            intent: intent.into(),
            state: LifecycleState::Creating,
            template: None,
            domain: None,
            port: None,
            instance_id: None,
            endpoint: None,
            attempt: 1,
            created_at: now,
            last_used_at: now,
        }
    }

    pub fn transition(&mut self, next: LifecycleState) -> Result<LifecycleState, LifecycleError> {
        if !self.state.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                agent_id: self.agent_id.clone(),
                from: self.state,
                to: next,
            });
        }
        let previous = self.state;
        self.state = next;
        Ok(previous)
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_used_at
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// Why the sweep should stop this agent, if it should
    pub fn eviction_reason(
        &self,
        now: DateTime<Utc>,
        idle_timeout: Duration,
        max_age: Duration,
    ) -> Option<EvictionReason> {
        if self.state != LifecycleState::Healthy {
            return None;
        }
        if self.idle_for(now) > idle_timeout {
            Some(EvictionReason::Idle)
        } else if self.age(now) > max_age {
            Some(EvictionReason::MaxAge)
        } else {
            None
        }
    }
}

/// A creation request waiting for capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationQueueEntry {
    pub concept: String,
    pub intent: String,
    /// Filled when the entry is drained and research runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research: Option<ResearchResult>,
    pub queued_at: DateTime<Utc>,
}

impl CreationQueueEntry {
    pub fn new(concept: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            intent: intent.into(),
            research: None,
            queued_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.queued_at > ttl
    }
}

/// A dynamic agent that passed its health check and is registered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionedAgent {
    pub agent_id: AgentId,
    pub concept: String,
    pub template: TemplateKind,
    pub domain: String,
    pub endpoint: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CreationOutcome {
    Ready(ProvisionedAgent),
    /// At capacity; `position` is 1-based
    Queued { position: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionReason {
    Idle,
    MaxAge,
    Manual,
    Shutdown,
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EvictionReason::Idle => "idle",
            EvictionReason::MaxAge => "max_age",
            EvictionReason::Manual => "manual",
            EvictionReason::Shutdown => "shutdown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LifecycleError {
    #[error("Creation for concept '{0}' is already in progress")]
    AlreadyInProgress(String),

    #[error("No free port in range {start}-{end}")]
    PortExhausted { start: u16, end: u16 },

    #[error("Build failed for agent {agent_id}: {reason}")]
    BuildFailure { agent_id: AgentId, reason: String },

    #[error("Start failed for agent {agent_id}: {reason}")]
    StartFailure { agent_id: AgentId, reason: String },

    #[error("Agent {agent_id} did not become healthy within {timeout_secs}s")]
    HealthCheckTimeout { agent_id: AgentId, timeout_secs: u64 },

    #[error("Graph registration failed for agent {agent_id}: {reason}")]
    GraphWriteFailure { agent_id: AgentId, reason: String },

    #[error("Dynamic agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Agent {agent_id} cannot be retired while {state}")]
    NotRetirable { agent_id: AgentId, state: LifecycleState },

    #[error("Invalid lifecycle transition for {agent_id}: {from} -> {to}")]
    InvalidTransition {
        agent_id: AgentId,
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("Provisioning of '{0}' was aborted")]
    Aborted(String),
}

impl LifecycleError {
    /// Stable label used in metrics and API error codes
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::AlreadyInProgress(_) => "already_in_progress",
            LifecycleError::PortExhausted { .. } => "port_exhausted",
            LifecycleError::BuildFailure { .. } => "build_failure",
            LifecycleError::StartFailure { .. } => "start_failure",
            LifecycleError::HealthCheckTimeout { .. } => "health_check_timeout",
            LifecycleError::GraphWriteFailure { .. } => "graph_write_failure",
            LifecycleError::AgentNotFound(_) => "agent_not_found",
            LifecycleError::NotRetirable { .. } => "not_retirable",
            LifecycleError::InvalidTransition { .. } => "invalid_transition",
            LifecycleError::Aborted(_) => "aborted",
        }
    }

    /// Failure of a provisioning step that a retry might get past
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LifecycleError::BuildFailure { .. }
                | LifecycleError::StartFailure { .. }
                | LifecycleError::HealthCheckTimeout { .. }
                | LifecycleError::GraphWriteFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut record = LifecycleRecord::new(AgentId::from("dyn-1"), "entropy", "define");
        for next in [
            LifecycleState::Researching,
            LifecycleState::TemplateSelected,
            LifecycleState::Building,
            LifecycleState::Starting,
            LifecycleState::HealthChecking,
            LifecycleState::Healthy,
            LifecycleState::Stopping,
            LifecycleState::Stopped,
        ] {
            record.transition(next).unwrap();
        }
        assert_eq!(record.state, LifecycleState::Stopped);
        assert!(!record.state.is_active());
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut record = LifecycleRecord::new(AgentId::from("dyn-1"), "entropy", "define");
        assert!(record.transition(LifecycleState::Healthy).is_err());
        assert_eq!(record.state, LifecycleState::Creating);

        record.transition(LifecycleState::Researching).unwrap();
        record.transition(LifecycleState::Failed).unwrap();
        assert!(record.transition(LifecycleState::Stopping).is_err());
        record.transition(LifecycleState::Creating).unwrap();
    }

    #[test]
    fn test_healthy_cannot_fail_directly() {
        assert!(!LifecycleState::Healthy.can_transition_to(LifecycleState::Failed));
        assert!(!LifecycleState::Stopped.can_transition_to(LifecycleState::Failed));
        assert!(LifecycleState::HealthChecking.can_transition_to(LifecycleState::Failed));
    }

    #[test]
    fn test_eviction_reason() {
        let mut record = LifecycleRecord::new(AgentId::from("dyn-1"), "entropy", "define");
        let now = Utc::now();
        let idle = Duration::minutes(30);
        let max_age = Duration::hours(24);

        // only Healthy agents are evicted
        record.last_used_at = now - Duration::minutes(31);
        assert_eq!(record.eviction_reason(now, idle, max_age), None);

        record.state = LifecycleState::Healthy;
        assert_eq!(record.eviction_reason(now, idle, max_age), Some(EvictionReason::Idle));

        record.last_used_at = now;
        record.created_at = now - Duration::hours(25);
        assert_eq!(record.eviction_reason(now, idle, max_age), Some(EvictionReason::MaxAge));

        record.created_at = now;
        assert_eq!(record.eviction_reason(now, idle, max_age), None);
    }

    #[test]
    fn test_queue_entry_expiry() {
        let mut entry = CreationQueueEntry::new("entropy", "define");
        let now = Utc::now();
        assert!(!entry.is_expired(now, Duration::seconds(60)));
        entry.queued_at = now - Duration::seconds(61);
        assert!(entry.is_expired(now, Duration::seconds(60)));
    }

    #[test]
    fn test_retryable_errors() {
        let agent_id = AgentId::from("dyn-1");
        assert!(LifecycleError::HealthCheckTimeout {
            agent_id: agent_id.clone(),
            timeout_secs: 60
        }
        .is_retryable());
        assert!(!LifecycleError::PortExhausted { start: 1, end: 2 }.is_retryable());
        assert!(!LifecycleError::AlreadyInProgress("x".into()).is_retryable());
    }
}
