// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the Cortex bounded context
//! Published to the EventBus for observability and integration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::graph::{AgentId, AgentStatus};

/// Cortex domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CortexEvent {
    /// A HandlesConcept edge was strengthened or weakened by a task outcome
    EdgeReinforced {
        agent_id: AgentId,
        concept: String,
        old_weight: f64,
        new_weight: f64,
        success: bool,
        usage_count: u64,
        timestamp: DateTime<Utc>,
    },

    /// A decay pass finished
    DecayApplied {
        edges_decayed: usize,
        decay_rate: f64,
        scope: String,
        timestamp: DateTime<Utc>,
    },

    /// An agent and its edges were written to the graph
    AgentRegistered {
        agent_id: AgentId,
        concepts: Vec<String>,
        region: String,
        is_dynamic: bool,
        timestamp: DateTime<Utc>,
    },

    /// An agent node and its incident edges were removed
    AgentRemoved {
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
    },

    AgentStatusChanged {
        agent_id: AgentId,
        old_status: AgentStatus,
        new_status: AgentStatus,
        timestamp: DateTime<Utc>,
    },
}

impl CortexEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            CortexEvent::EdgeReinforced { .. } => "edge_reinforced",
            CortexEvent::DecayApplied { .. } => "decay_applied",
            CortexEvent::AgentRegistered { .. } => "agent_registered",
            CortexEvent::AgentRemoved { .. } => "agent_removed",
            CortexEvent::AgentStatusChanged { .. } => "agent_status_changed",
        }
    }
}
