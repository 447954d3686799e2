// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent templates and the knowledge payload injected into them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environment variable carrying a JSON-encoded [`KnowledgePayload`] into a
/// freshly started agent process or container.
pub const KNOWLEDGE_ENV_VAR: &str = "SYNAPSE_AGENT_KNOWLEDGE";

/// Domain assigned when research produced nothing usable.
pub const FALLBACK_DOMAIN: &str = "General";

/// Closed set of compiled agent behaviours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    BasicKnowledge,
    EnhancedKnowledge,
    Function,
    Specialist,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 4] = [
        TemplateKind::BasicKnowledge,
        TemplateKind::EnhancedKnowledge,
        TemplateKind::Function,
        TemplateKind::Specialist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::BasicKnowledge => "basic_knowledge",
            TemplateKind::EnhancedKnowledge => "enhanced_knowledge",
            TemplateKind::Function => "function",
            TemplateKind::Specialist => "specialist",
        }
    }

    /// Intents an agent built from this template advertises on registration.
    pub fn default_capabilities(&self) -> &'static [&'static str] {
        match self {
            TemplateKind::BasicKnowledge => &["define", "describe", "summarize", "lookup"],
            TemplateKind::EnhancedKnowledge => {
                &["define", "explain", "describe", "summarize", "compare", "relate", "lookup"]
            }
            TemplateKind::Function => &[
                "calculate", "compute", "evaluate", "sum", "product", "mean", "average", "min", "max",
                "count",
            ],
            TemplateKind::Specialist => &["define", "explain", "describe", "analyze", "classify"],
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "basic_knowledge" | "basic" => Ok(TemplateKind::BasicKnowledge),
            "enhanced_knowledge" | "enhanced" => Ok(TemplateKind::EnhancedKnowledge),
            "function" | "compute" => Ok(TemplateKind::Function),
            "specialist" => Ok(TemplateKind::Specialist),
            other => Err(format!(
                "Unknown template '{}'. Expected one of: basic_knowledge, enhanced_knowledge, function, specialist",
                other
            )),
        }
    }
}

/// Structured research result handed to a new agent at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgePayload {
    pub concept: String,
    pub domain: String,
    #[serde(default)]
    pub definitions: Vec<String>,
    #[serde(default)]
    pub related_concepts: Vec<String>,
    pub complexity_score: f64,
    /// How much the research phase trusted its own findings (0.0-1.0).
    pub confidence: f64,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl KnowledgePayload {
    /// Low-confidence payload used when no existing agent could help.
    pub fn fallback(concept: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            domain: FALLBACK_DOMAIN.to_string(),
            definitions: Vec::new(),
            related_concepts: Vec::new(),
            complexity_score: 0.5,
            confidence: 0.1,
            sources: Vec::new(),
        }
    }

    pub fn primary_definition(&self) -> String {
        match self.definitions.first() {
            Some(definition) => definition.clone(),
            None => format!(
                "{} is a concept in the {} domain; no definition has been gathered for it yet.",
                self.concept.replace('_', " "),
                self.domain
            ),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.definitions.is_empty() && self.sources.is_empty()
    }

    pub fn to_env_value(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_env_value(value: &str) -> serde_json::Result<Self> {
        serde_json::from_str(value)
    }
}
