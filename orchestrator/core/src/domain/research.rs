// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Research results and the template decision policy.

use serde::{Deserialize, Serialize};

use synapse_sdk::intent;
use synapse_sdk::template::FALLBACK_DOMAIN;
use synapse_sdk::{KnowledgePayload, TemplateKind};

/// Complexity above which a concept gets the enhanced knowledge template
pub const ENHANCED_COMPLEXITY_THRESHOLD: f64 = 0.7;

/// Complexity assumed when research produced nothing
pub const DEFAULT_COMPLEXITY: f64 = 0.5;

/// What the network knows about a concept before an agent is built for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub concept: String,
    pub domain: String,
    pub complexity_score: f64,
    #[serde(default)]
    pub definitions: Vec<String>,
    #[serde(default)]
    pub related_concepts: Vec<String>,
    /// Agents that contributed
    #[serde(default)]
    pub sources: Vec<String>,
    pub confidence: f64,
}

impl ResearchResult {
    /// Low-confidence default used when no agent answered usefully
    pub fn fallback(concept: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            domain: FALLBACK_DOMAIN.to_string(),
            complexity_score: DEFAULT_COMPLEXITY,
            definitions: Vec::new(),
            related_concepts: Vec::new(),
            sources: Vec::new(),
            confidence: 0.1,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn to_knowledge(&self) -> KnowledgePayload {
        KnowledgePayload {
            concept: self.concept.clone(),
            domain: self.domain.clone(),
            definitions: self.definitions.clone(),
            related_concepts: self.related_concepts.clone(),
            complexity_score: self.complexity_score.clamp(0.0, 1.0),
            confidence: self.confidence.clamp(0.0, 1.0),
            sources: self.sources.clone(),
        }
    }
}

/// Configured inputs to [`select_template`]
#[derive(Debug, Clone, Default)]
pub struct TemplatePolicy {
    /// Normalized intents routed to the function template
    pub function_intents: Vec<String>,
    /// Domains routed to the specialist template, compared case-insensitively
    pub specialist_domains: Vec<String>,
}

impl TemplatePolicy {
    pub fn new<I, D, S, T>(function_intents: I, specialist_domains: D) -> Self
    where
        I: IntoIterator<Item = S>,
        D: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            function_intents: function_intents
                .into_iter()
                .map(|i| intent::normalize(i.as_ref()))
                .collect(),
            specialist_domains: specialist_domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_string())
                .collect(),
        }
    }

    fn is_function_intent(&self, raw: &str) -> bool {
        let normalized = intent::normalize(raw);
        self.function_intents.iter().any(|i| *i == normalized)
    }

    fn is_specialist_domain(&self, domain: &str) -> bool {
        let domain = domain.trim();
        self.specialist_domains
            .iter()
            .any(|d| d.eq_ignore_ascii_case(domain))
    }
}

/// Pick the template for a new agent. First matching rule wins:
/// 1. function intent
/// 2. complexity above [`ENHANCED_COMPLEXITY_THRESHOLD`]
/// 3. specialist domain
/// 4. basic knowledge
pub fn select_template(research: &ResearchResult, intent: &str, policy: &TemplatePolicy) -> TemplateKind {
    if policy.is_function_intent(intent) {
        TemplateKind::Function
    } else if research.complexity_score > ENHANCED_COMPLEXITY_THRESHOLD {
        TemplateKind::EnhancedKnowledge
    } else if policy.is_specialist_domain(&research.domain) {
        TemplateKind::Specialist
    } else {
        TemplateKind::BasicKnowledge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> TemplatePolicy {
        TemplatePolicy::new(["calculate", "compute", "Sum"], ["Science", "Medicine"])
    }

    fn research(domain: &str, complexity: f64) -> ResearchResult {
        ResearchResult {
            domain: domain.to_string(),
            complexity_score: complexity,
            ..ResearchResult::fallback("concept")
        }
    }

    #[test]
    fn test_function_intent_wins() {
        let r = research("Science", 0.95);
        assert_eq!(select_template(&r, "calculate", &policy()), TemplateKind::Function);
        assert_eq!(select_template(&r, " SUM ", &policy()), TemplateKind::Function);
    }

    #[test]
    fn test_complexity_beats_specialist_domain() {
        let r = research("Science", 0.9);
        assert_eq!(select_template(&r, "define", &policy()), TemplateKind::EnhancedKnowledge);
    }

    #[test]
    fn test_threshold_is_strict() {
        let r = research("General", 0.7);
        assert_eq!(select_template(&r, "define", &policy()), TemplateKind::BasicKnowledge);
        let r = research("General", 0.71);
        assert_eq!(select_template(&r, "define", &policy()), TemplateKind::EnhancedKnowledge);
    }

    #[test]
    fn test_specialist_domain_case_insensitive() {
        let r = research("medicine", 0.4);
        assert_eq!(select_template(&r, "explain", &policy()), TemplateKind::Specialist);
    }

    #[test]
    fn test_basic_fallback() {
        let r = ResearchResult::fallback("quantum_computer");
        assert!(r.is_fallback());
        assert_eq!(select_template(&r, "define", &policy()), TemplateKind::BasicKnowledge);
    }

    #[test]
    fn test_knowledge_payload_is_clamped() {
        let mut r = research("Science", 1.4);
        r.definitions.push("Computes with qubits.".to_string());
        let knowledge = r.to_knowledge();
        assert_eq!(knowledge.complexity_score, 1.0);
        assert_eq!(knowledge.definitions.len(), 1);
        assert_eq!(knowledge.domain, "Science");
    }
}
