// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Research phase of neurogenesis.
//!
//! Asks the healthy agents already on the network to `define` the new
//! concept and folds their answers into one [`ResearchResult`]: majority
//! domain, mean complexity, deduplicated definitions and related concepts.
//! Research never fails; with no useful answer it returns the fallback.

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use synapse_cortex::{AgentNode, AgentStatus, GraphNode, GraphRepository};
use synapse_sdk::{ProcessRequest, ProcessResponse};

use crate::domain::gateway::AgentGateway;
use crate::domain::research::ResearchResult;

const RESEARCH_INTENT: &str = "define";
const DEFAULT_MAX_SOURCES: usize = 8;

#[async_trait]
pub trait ResearchService: Send + Sync {
    async fn research(&self, concept: &str, intent: &str) -> ResearchResult;
}

pub struct NetworkResearchService {
    graph: Arc<dyn GraphRepository>,
    gateway: Arc<dyn AgentGateway>,
    timeout: Duration,
    max_sources: usize,
}

impl NetworkResearchService {
    pub fn new(graph: Arc<dyn GraphRepository>, gateway: Arc<dyn AgentGateway>, timeout: Duration) -> Self {
        Self {
            graph,
            gateway,
            timeout,
            max_sources: DEFAULT_MAX_SOURCES,
        }
    }

    pub fn with_max_sources(mut self, max_sources: usize) -> Self {
        self.max_sources = max_sources.max(1);
        self
    }

    async fn sources(&self) -> Vec<AgentNode> {
        let predicate = |node: &GraphNode| {
            node.as_agent()
                .map(|a| a.status == AgentStatus::Healthy)
                .unwrap_or(false)
        };
        match self.graph.find_nodes(&predicate).await {
            Ok(nodes) => {
                let mut agents: Vec<AgentNode> = nodes.into_iter().filter_map(|n| n.as_agent().cloned()).collect();
                agents.sort_by(|a, b| a.id.cmp(&b.id));
                agents.truncate(self.max_sources);
                agents
            }
            Err(e) => {
                warn!(error = %e, "Failed to list research sources");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ResearchService for NetworkResearchService {
    async fn research(&self, concept: &str, intent: &str) -> ResearchResult {
        let sources = self.sources().await;
        if sources.is_empty() {
            debug!(concept = %concept, "No agents available for research");
            return ResearchResult::fallback(concept);
        }

        let request = ProcessRequest::new(RESEARCH_INTENT, concept, Value::Null);
        let calls = sources.iter().map(|agent| {
            let request = &request;
            async move {
                let response = self.gateway.process(&agent.endpoint, request, self.timeout).await;
                (agent.id.to_string(), response)
            }
        });

        let mut answers = Vec::new();
        for (agent_id, response) in join_all(calls).await {
            match response {
                Ok(response) if response.is_success() => answers.push((agent_id, response)),
                Ok(response) => {
                    debug!(agent_id = %agent_id, error = ?response.error_message(), "Research source declined")
                }
                Err(e) => debug!(agent_id = %agent_id, error = %e, "Research source failed"),
            }
        }

        let result = synthesize(concept, &answers);
        info!(
            concept = %concept,
            intent = %intent,
            queried = sources.len(),
            answered = answers.len(),
            domain = %result.domain,
            complexity = result.complexity_score,
            "Research completed"
        );
        result
    }
}

/// Fold successful `/process` answers into one research result
pub fn synthesize(concept: &str, answers: &[(String, ProcessResponse)]) -> ResearchResult {
    let mut domains: BTreeMap<String, usize> = BTreeMap::new();
    let mut complexities = Vec::new();
    let mut definitions: Vec<String> = Vec::new();
    let mut related = BTreeSet::new();
    let mut sources = Vec::new();
    let mut confidence_total = 0.0;

    for (agent_id, response) in answers {
        let data = &response.data;
        let mut useful = false;

        if let Some(domain) = data.get("domain").and_then(Value::as_str) {
            *domains.entry(domain.to_string()).or_default() += 1;
            useful = true;
        }
        if let Some(complexity) = data.get("complexity").and_then(Value::as_f64) {
            complexities.push(complexity.clamp(0.0, 1.0));
            useful = true;
        }

        let mut found = Vec::new();
        if let Some(definition) = data.get("definition").and_then(Value::as_str) {
            found.push(definition.to_string());
        }
        if let Some(list) = data.get("definitions").and_then(Value::as_array) {
            found.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
        }
        for definition in found {
            useful = true;
            if !definitions.contains(&definition) {
                definitions.push(definition);
            }
        }

        if let Some(list) = data.get("related_concepts").and_then(Value::as_array) {
            related.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
        }

        if useful {
            sources.push(agent_id.clone());
            confidence_total += response.confidence;
        }
    }

    if sources.is_empty() {
        return ResearchResult::fallback(concept);
    }

    let mut result = ResearchResult::fallback(concept);
    // highest count wins, ties go to the alphabetically first domain
    if let Some((domain, _)) = domains
        .iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
    {
        result.domain = domain.clone();
    }
    if !complexities.is_empty() {
        result.complexity_score = complexities.iter().sum::<f64>() / complexities.len() as f64;
    }
    result.confidence = (confidence_total / sources.len() as f64).clamp(0.0, 1.0);
    result.definitions = definitions;
    result.related_concepts = related.into_iter().collect();
    result.sources = sources;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use synapse_sdk::template::FALLBACK_DOMAIN;

    fn answer(agent: &str, data: Value, confidence: f64) -> (String, ProcessResponse) {
        (agent.to_string(), ProcessResponse::success(data, confidence))
    }

    #[test]
    fn test_majority_domain_and_mean_complexity() {
        let answers = vec![
            answer("a", json!({"domain": "Science", "complexity": 0.8, "definition": "d1"}), 0.9),
            answer("b", json!({"domain": "Science", "complexity": 1.0, "definitions": ["d1", "d2"]}), 0.7),
            answer("c", json!({"domain": "Technology", "complexity": 0.6, "related_concepts": ["qubit"]}), 0.5),
        ];
        let result = synthesize("quantum_computer", &answers);
        assert_eq!(result.domain, "Science");
        assert!((result.complexity_score - 0.8).abs() < 1e-9);
        assert_eq!(result.definitions, vec!["d1".to_string(), "d2".to_string()]);
        assert_eq!(result.related_concepts, vec!["qubit".to_string()]);
        assert_eq!(result.sources.len(), 3);
        assert!((result.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_domain_tie_is_deterministic() {
        let answers = vec![
            answer("a", json!({"domain": "Technology"}), 0.5),
            answer("b", json!({"domain": "Science"}), 0.5),
        ];
        assert_eq!(synthesize("x", &answers).domain, "Science");
    }

    #[test]
    fn test_useless_answers_fall_back() {
        let answers = vec![answer("a", json!({"result": 3}), 0.9)];
        let result = synthesize("entropy", &answers);
        assert_eq!(result.domain, FALLBACK_DOMAIN);
        assert_eq!(result.complexity_score, 0.5);
        assert!(result.is_fallback());
    }
}
