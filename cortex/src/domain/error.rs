// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use thiserror::Error;

use super::graph::{AgentId, NodeId};

#[derive(Debug, Clone, Error)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Edge not found: {agent_id} -> {concept}")]
    EdgeNotFound { agent_id: AgentId, concept: String },

    #[error("Node {0} is not of the expected kind")]
    WrongNodeKind(NodeId),

    #[error("Registration of agent {agent_id} failed: {reason}")]
    RegistrationFailed { agent_id: AgentId, reason: String },

    #[error("Graph storage error: {0}")]
    Storage(String),
}
