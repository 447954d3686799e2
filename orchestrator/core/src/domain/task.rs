// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Inbound query batches, per-task results and the routing error taxonomy.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use synapse_cortex::application::QueryContext;
use synapse_cortex::AgentId;

use crate::domain::lifecycle::LifecycleError;

/// One `{intent, concept, args}` unit produced by query parsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub intent: String,
    pub concept: String,
    #[serde(default)]
    pub args: Value,
}

impl Task {
    pub fn new(task_id: impl Into<String>, intent: impl Into<String>, concept: impl Into<String>, args: Value) -> Self {
        Self {
            task_id: task_id.into(),
            intent: intent.into(),
            concept: concept.into(),
            args,
        }
    }
}

/// Body of the orchestrator's `POST /process`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query_id: String,
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub context: QueryContext,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryValidationError {
    #[error("task id must not be empty")]
    EmptyTaskId,
    #[error("task id '{0}' appears more than once in the batch")]
    DuplicateTaskId(String),
}

impl QueryValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            QueryValidationError::EmptyTaskId => "invalid_task_id",
            QueryValidationError::DuplicateTaskId(_) => "duplicate_task_id",
        }
    }
}

impl QueryRequest {
    /// Results are keyed by task id, so ids must be unique within a batch
    pub fn validate(&self) -> Result<(), QueryValidationError> {
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.task_id.trim().is_empty() {
                return Err(QueryValidationError::EmptyTaskId);
            }
            if !seen.insert(task.task_id.as_str()) {
                return Err(QueryValidationError::DuplicateTaskId(task.task_id.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Success,
    Error,
    /// Waiting for a creation slot; the caller may resubmit later
    Queued,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Agent that answered, if one was reached
    pub agent: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl TaskResult {
    pub fn success(agent: &AgentId, data: Value, confidence: f64) -> Self {
        Self {
            agent: Some(agent.to_string()),
            status: TaskStatus::Success,
            data,
            confidence: Some(confidence),
        }
    }

    pub fn failure(agent: Option<&AgentId>, error: &TaskError) -> Self {
        let status = match error {
            TaskError::Queued { .. } => TaskStatus::Queued,
            _ => TaskStatus::Error,
        };
        Self {
            agent: agent.map(|a| a.to_string()),
            status,
            data: json!({ "error": error.to_string(), "code": error.code() }),
            confidence: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}

/// Body returned by the orchestrator's `POST /process`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query_id: String,
    pub collected_results: BTreeMap<String, TaskResult>,
}

#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("Concept '{0}' is unknown")]
    ConceptUnknown(String),

    #[error("No agent handles concept '{0}'")]
    NoCandidateAgents(String),

    #[error("Agent {agent_id} is unreachable: {reason}")]
    AgentUnreachable { agent_id: AgentId, reason: String },

    #[error("Agent {agent_id} timed out after {timeout_ms}ms")]
    AgentTimeout { agent_id: AgentId, timeout_ms: u64 },

    #[error("Agent {agent_id} returned an error: {message}")]
    AgentError { agent_id: AgentId, message: String },

    #[error("Provisioning failed: {0}")]
    Provisioning(#[from] LifecycleError),

    #[error("Creation of an agent for '{concept}' is queued at position {position}")]
    Queued { concept: String, position: usize },

    #[error("Graph error: {0}")]
    Graph(String),
}

impl TaskError {
    pub fn code(&self) -> &'static str {
        match self {
            TaskError::ConceptUnknown(_) => "concept_unknown",
            TaskError::NoCandidateAgents(_) => "no_candidate_agents",
            TaskError::AgentUnreachable { .. } => "agent_unreachable",
            TaskError::AgentTimeout { .. } => "agent_timeout",
            TaskError::AgentError { .. } => "agent_error",
            TaskError::Provisioning(e) => e.code(),
            TaskError::Queued { .. } => "capacity_exceeded",
            TaskError::Graph(_) => "graph_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_parsing() {
        let body = r#"{
            "query_id": "q-1",
            "tasks": [
                {"task_id": "t1", "intent": "define", "concept": "entropy"},
                {"task_id": "t2", "intent": "calculate", "concept": "sum", "args": {"values": [1, 2]}}
            ]
        }"#;
        let request: QueryRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.tasks.len(), 2);
        assert!(request.tasks[0].args.is_null());
        assert_eq!(request.tasks[1].args["values"][1], 2);
        assert!(request.context.domain.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_duplicate_task_ids_are_rejected() {
        let request = QueryRequest {
            query_id: "q-2".into(),
            tasks: vec![
                Task::new("t1", "define", "entropy", Value::Null),
                Task::new("t2", "define", "plasma", Value::Null),
                Task::new("t1", "explain", "entropy", Value::Null),
            ],
            context: QueryContext::default(),
        };
        let err = request.validate().unwrap_err();
        assert_eq!(err, QueryValidationError::DuplicateTaskId("t1".into()));
        assert_eq!(err.code(), "duplicate_task_id");

        let blank = QueryRequest {
            query_id: "q-3".into(),
            tasks: vec![Task::new(" ", "define", "entropy", Value::Null)],
            context: QueryContext::default(),
        };
        assert_eq!(blank.validate(), Err(QueryValidationError::EmptyTaskId));
    }

    #[test]
    fn test_failure_result_carries_code() {
        let error = TaskError::AgentTimeout {
            agent_id: AgentId::from("physics-1"),
            timeout_ms: 500,
        };
        let result = TaskResult::failure(Some(&AgentId::from("physics-1")), &error);
        assert_eq!(result.status, TaskStatus::Error);
        assert_eq!(result.agent.as_deref(), Some("physics-1"));
        assert_eq!(result.data["code"], "agent_timeout");
    }

    #[test]
    fn test_queued_is_not_an_error_status() {
        let error = TaskError::Queued {
            concept: "entropy".into(),
            position: 2,
        };
        let result = TaskResult::failure(None, &error);
        assert_eq!(result.status, TaskStatus::Queued);
        assert_eq!(result.data["code"], "capacity_exceeded");
    }

    #[test]
    fn test_provisioning_code_passthrough() {
        let error: TaskError = LifecycleError::PortExhausted { start: 7000, end: 7001 }.into();
        assert_eq!(error.code(), "port_exhausted");
    }
}
