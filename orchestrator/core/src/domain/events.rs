// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use synapse_cortex::AgentId;
use synapse_sdk::TemplateKind;

use crate::domain::lifecycle::{EvictionReason, LifecycleState};

/// Neurogenesis events published by the lifecycle manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    CreationRequested {
        concept: String,
        intent: String,
        requested_at: DateTime<Utc>,
    },
    CreationQueued {
        concept: String,
        position: usize,
        queued_at: DateTime<Utc>,
    },
    StateChanged {
        agent_id: AgentId,
        concept: String,
        from: LifecycleState,
        to: LifecycleState,
        changed_at: DateTime<Utc>,
    },
    AgentProvisioned {
        agent_id: AgentId,
        concept: String,
        template: TemplateKind,
        domain: String,
        endpoint: String,
        port: u16,
        provisioned_at: DateTime<Utc>,
    },
    ProvisioningFailed {
        agent_id: AgentId,
        concept: String,
        attempt: u32,
        reason: String,
        failed_at: DateTime<Utc>,
    },
    AgentRetired {
        agent_id: AgentId,
        concept: String,
        reason: EvictionReason,
        retired_at: DateTime<Utc>,
    },
    QueueEntryExpired {
        concept: String,
        queued_at: DateTime<Utc>,
        expired_at: DateTime<Utc>,
    },
}

/// Task routing events published by the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoutingEvent {
    DiscoveryMiss {
        task_id: String,
        concept: String,
        reason: String,
        missed_at: DateTime<Utc>,
    },
    TaskDispatched {
        task_id: String,
        concept: String,
        intent: String,
        agent_id: AgentId,
        score: f64,
        dispatched_at: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: String,
        concept: String,
        agent_id: AgentId,
        success: bool,
        latency_ms: u64,
        completed_at: DateTime<Utc>,
    },
    TaskFailed {
        task_id: String,
        concept: String,
        code: String,
        reason: String,
        failed_at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_event_serialization() {
        let event = LifecycleEvent::StateChanged {
            agent_id: AgentId::from("dyn-1"),
            concept: "entropy".into(),
            from: LifecycleState::Building,
            to: LifecycleState::Starting,
            changed_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "state_changed");
        assert_eq!(json["from"], "building");
        assert_eq!(json["agent_id"], "dyn-1");
    }

    #[test]
    fn test_routing_event_roundtrip() {
        let event = RoutingEvent::TaskFailed {
            task_id: "t1".into(),
            concept: "entropy".into(),
            code: "agent_timeout".into(),
            reason: "timed out".into(),
            failed_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: RoutingEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, RoutingEvent::TaskFailed { code, .. } if code == "agent_timeout"));
    }
}
