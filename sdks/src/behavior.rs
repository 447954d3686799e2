// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Template Behaviours
//!
//! One compiled behaviour per [`TemplateKind`], selected once when an agent is
//! provisioned and parameterised by the research [`KnowledgePayload`].
//!
//! | Template | Answers |
//! |----------|---------|
//! | basic knowledge | `define`-style intents with the primary definition |
//! | enhanced knowledge | definitions, related concepts, depth-scaled explanations |
//! | function | aggregate operations over `args.values`, arithmetic over `args.expression` |
//! | specialist | domain-scoped answers, classification, out-of-specialty flagging |
//!
//! Every response to a knowledge-style intent carries `domain` and
//! `complexity` so the research phase can reuse existing agents as sources.

use serde_json::{json, Value};

use crate::expression;
use crate::intent::{self, IntentCategory};
use crate::template::{KnowledgePayload, TemplateKind};
use crate::types::ProcessResponse;

#[derive(Debug, Clone)]
pub enum AgentBehavior {
    BasicKnowledge(KnowledgePayload),
    EnhancedKnowledge(KnowledgePayload),
    Function(KnowledgePayload),
    Specialist(KnowledgePayload),
}

impl AgentBehavior {
    pub fn new(kind: TemplateKind, knowledge: KnowledgePayload) -> Self {
        match kind {
            TemplateKind::BasicKnowledge => AgentBehavior::BasicKnowledge(knowledge),
            TemplateKind::EnhancedKnowledge => AgentBehavior::EnhancedKnowledge(knowledge),
            TemplateKind::Function => AgentBehavior::Function(knowledge),
            TemplateKind::Specialist => AgentBehavior::Specialist(knowledge),
        }
    }

    pub fn kind(&self) -> TemplateKind {
        match self {
            AgentBehavior::BasicKnowledge(_) => TemplateKind::BasicKnowledge,
            AgentBehavior::EnhancedKnowledge(_) => TemplateKind::EnhancedKnowledge,
            AgentBehavior::Function(_) => TemplateKind::Function,
            AgentBehavior::Specialist(_) => TemplateKind::Specialist,
        }
    }

    pub fn knowledge(&self) -> &KnowledgePayload {
        match self {
            AgentBehavior::BasicKnowledge(k)
            | AgentBehavior::EnhancedKnowledge(k)
            | AgentBehavior::Function(k)
            | AgentBehavior::Specialist(k) => k,
        }
    }

    /// Handle one `/process` call.
    pub fn handle(&self, concept: &str, intent: &str, args: &Value) -> ProcessResponse {
        let knowledge = self.knowledge();
        let intent = intent::normalize(intent);

        if !covers(knowledge, concept) {
            return ProcessResponse::error(format!(
                "concept '{}' is outside this agent's expertise ({})",
                concept, knowledge.concept
            ));
        }

        match self {
            AgentBehavior::BasicKnowledge(k) => basic(k, &intent),
            AgentBehavior::EnhancedKnowledge(k) => enhanced(k, &intent),
            AgentBehavior::Function(k) => function(k, &intent, args),
            AgentBehavior::Specialist(k) => specialist(k, &intent, args),
        }
    }
}

fn canonical(concept: &str) -> String {
    concept
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

fn covers(knowledge: &KnowledgePayload, concept: &str) -> bool {
    let concept = canonical(concept);
    canonical(&knowledge.concept) == concept
        || knowledge
            .related_concepts
            .iter()
            .any(|related| canonical(related) == concept)
}

/// Confidence grows with research confidence but never reaches certainty.
fn base_confidence(knowledge: &KnowledgePayload) -> f64 {
    (0.4 + 0.5 * knowledge.confidence).clamp(0.0, 0.95)
}

fn definition_body(knowledge: &KnowledgePayload) -> Value {
    json!({
        "concept": knowledge.concept,
        "definition": knowledge.primary_definition(),
        "domain": knowledge.domain,
        "complexity": knowledge.complexity_score,
    })
}

fn basic(knowledge: &KnowledgePayload, intent: &str) -> ProcessResponse {
    match intent::categorize(intent) {
        Some(IntentCategory::Knowledge) | Some(IntentCategory::Retrieval) => {
            ProcessResponse::success(definition_body(knowledge), base_confidence(knowledge))
        }
        _ => ProcessResponse::error(format!(
            "intent '{}' is not supported by the basic knowledge template",
            intent
        )),
    }
}

fn depth_label(complexity: f64) -> &'static str {
    if complexity > 0.7 {
        "advanced"
    } else if complexity > 0.4 {
        "intermediate"
    } else {
        "introductory"
    }
}

fn enhanced(knowledge: &KnowledgePayload, intent: &str) -> ProcessResponse {
    let confidence = (base_confidence(knowledge) + 0.05).min(0.95);
    match intent::categorize(intent) {
        Some(IntentCategory::Knowledge) | Some(IntentCategory::Retrieval) => {
            let mut body = definition_body(knowledge);
            body["definitions"] = json!(knowledge.definitions);
            body["related_concepts"] = json!(knowledge.related_concepts);
            body["depth"] = json!(depth_label(knowledge.complexity_score));
            if intent == "explain" {
                body["details"] = json!(knowledge.definitions.iter().skip(1).collect::<Vec<_>>());
                body["prerequisites"] = json!(knowledge.related_concepts);
            }
            ProcessResponse::success(body, confidence)
        }
        Some(IntentCategory::Analysis) => ProcessResponse::success(
            json!({
                "concept": knowledge.concept,
                "related_concepts": knowledge.related_concepts,
                "domain": knowledge.domain,
                "complexity": knowledge.complexity_score,
            }),
            confidence,
        ),
        _ => ProcessResponse::error(format!(
            "intent '{}' is not supported by the enhanced knowledge template",
            intent
        )),
    }
}

fn numbers(args: &Value) -> Option<Vec<f64>> {
    args.get("values")?
        .as_array()?
        .iter()
        .map(Value::as_f64)
        .collect()
}

fn aggregate(operation: &str, values: &[f64]) -> Result<f64, String> {
    if values.is_empty() && operation != "count" && operation != "sum" {
        return Err(format!("operation '{}' needs at least one value", operation));
    }
    let result = match operation {
        "sum" => values.iter().sum(),
        "product" => values.iter().product(),
        "mean" | "average" => values.iter().sum::<f64>() / values.len() as f64,
        "min" => values.iter().copied().fold(f64::INFINITY, f64::min),
        "max" => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        "count" => values.len() as f64,
        other => return Err(format!("unknown operation '{}'", other)),
    };
    Ok(result)
}

fn function(knowledge: &KnowledgePayload, intent: &str, args: &Value) -> ProcessResponse {
    let confidence = 0.9;
    if let Some(expr) = args.get("expression").and_then(Value::as_str) {
        return match expression::evaluate(expr) {
            Ok(result) => ProcessResponse::success(
                json!({ "concept": knowledge.concept, "expression": expr, "result": result }),
                confidence,
            ),
            Err(e @ expression::ExpressionError::TooLong) => {
                ProcessResponse::error(format!("cannot evaluate expression: {}", e))
            }
            Err(e) => ProcessResponse::error(format!("cannot evaluate '{}': {}", expr, e)),
        };
    }

    let operation = args
        .get("operation")
        .and_then(Value::as_str)
        .map(intent::normalize)
        .unwrap_or_else(|| intent.to_string());

    if let Some(values) = numbers(args) {
        return match aggregate(&operation, &values) {
            Ok(result) => ProcessResponse::success(
                json!({ "concept": knowledge.concept, "operation": operation, "result": result }),
                confidence,
            ),
            Err(e) => ProcessResponse::error(e),
        };
    }

    match intent::categorize(intent) {
        Some(IntentCategory::Knowledge) => {
            ProcessResponse::success(definition_body(knowledge), base_confidence(knowledge))
        }
        _ => ProcessResponse::error(
            "function template expects args.expression or args.values with an operation",
        ),
    }
}

fn specialist(knowledge: &KnowledgePayload, intent: &str, args: &Value) -> ProcessResponse {
    let requested_domain = args.get("domain").and_then(Value::as_str);
    let in_specialty = requested_domain
        .map(|d| d.eq_ignore_ascii_case(&knowledge.domain))
        .unwrap_or(true);
    let confidence = if in_specialty {
        (base_confidence(knowledge) + 0.1).min(0.95)
    } else {
        base_confidence(knowledge) * 0.5
    };

    match intent::categorize(intent) {
        Some(IntentCategory::Knowledge) | Some(IntentCategory::Retrieval) => {
            let mut body = definition_body(knowledge);
            body["specialist"] = json!(true);
            body["in_specialty"] = json!(in_specialty);
            body["related_concepts"] = json!(knowledge.related_concepts);
            ProcessResponse::success(body, confidence)
        }
        Some(IntentCategory::Analysis) => ProcessResponse::success(
            json!({
                "concept": knowledge.concept,
                "domain": knowledge.domain,
                "complexity": knowledge.complexity_score,
                "in_specialty": in_specialty,
            }),
            confidence,
        ),
        _ => ProcessResponse::error(format!(
            "intent '{}' is not supported by the specialist template",
            intent
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> KnowledgePayload {
        KnowledgePayload {
            concept: "quantum_computer".to_string(),
            domain: "Science".to_string(),
            definitions: vec![
                "A computer that uses qubits.".to_string(),
                "Exploits superposition and entanglement.".to_string(),
            ],
            related_concepts: vec!["qubit".to_string()],
            complexity_score: 0.9,
            confidence: 0.8,
            sources: vec!["agent-physics".to_string()],
        }
    }

    #[test]
    fn test_basic_define() {
        let agent = AgentBehavior::new(TemplateKind::BasicKnowledge, payload());
        let resp = agent.handle("Quantum Computer", "define", &Value::Null);
        assert!(resp.is_success());
        assert_eq!(resp.data["definition"], "A computer that uses qubits.");
        assert_eq!(resp.data["domain"], "Science");
    }

    #[test]
    fn test_foreign_concept_rejected() {
        let agent = AgentBehavior::new(TemplateKind::BasicKnowledge, payload());
        let resp = agent.handle("photosynthesis", "define", &Value::Null);
        assert!(!resp.is_success());
    }

    #[test]
    fn test_related_concept_is_covered() {
        let agent = AgentBehavior::new(TemplateKind::EnhancedKnowledge, payload());
        let resp = agent.handle("qubit", "relate", &Value::Null);
        assert!(resp.is_success());
        assert_eq!(resp.data["related_concepts"][0], "qubit");
    }

    #[test]
    fn test_enhanced_explain_depth() {
        let agent = AgentBehavior::new(TemplateKind::EnhancedKnowledge, payload());
        let resp = agent.handle("quantum_computer", "explain", &Value::Null);
        assert!(resp.is_success());
        assert_eq!(resp.data["depth"], "advanced");
        assert_eq!(resp.data["details"][0], "Exploits superposition and entanglement.");
    }

    #[test]
    fn test_function_expression_and_aggregate() {
        let mut knowledge = payload();
        knowledge.concept = "arithmetic".to_string();
        let agent = AgentBehavior::new(TemplateKind::Function, knowledge);

        let resp = agent.handle("arithmetic", "calculate", &json!({ "expression": "(1 + 2) * 4" }));
        assert_eq!(resp.data["result"], 12.0);

        let resp = agent.handle("arithmetic", "mean", &json!({ "values": [1.0, 2.0, 6.0] }));
        assert_eq!(resp.data["result"], 3.0);

        let resp = agent.handle("arithmetic", "calculate", &json!({ "operation": "max", "values": [4, 9, 2] }));
        assert_eq!(resp.data["result"], 9.0);

        let resp = agent.handle("arithmetic", "calculate", &json!({ "expression": "1 / 0" }));
        assert!(!resp.is_success());
    }

    #[test]
    fn test_function_rejects_excessive_nesting() {
        let agent = AgentBehavior::new(TemplateKind::Function, payload());
        let nested = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let resp = agent.handle("quantum_computer", "calculate", &json!({ "expression": nested }));
        assert!(!resp.is_success());
        assert!(resp.error_message().unwrap().len() < 200);

        let nested = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        let resp = agent.handle("quantum_computer", "calculate", &json!({ "expression": nested }));
        assert!(resp.error_message().unwrap().contains("nests deeper"));
    }

    #[test]
    fn test_specialist_flags_out_of_specialty() {
        let agent = AgentBehavior::new(TemplateKind::Specialist, payload());
        let inside = agent.handle("quantum_computer", "define", &json!({ "domain": "science" }));
        let outside = agent.handle("quantum_computer", "define", &json!({ "domain": "Finance" }));
        assert_eq!(inside.data["in_specialty"], true);
        assert_eq!(outside.data["in_specialty"], false);
        assert!(inside.confidence > outside.confidence);
    }

    #[test]
    fn test_unsupported_intent() {
        let agent = AgentBehavior::new(TemplateKind::BasicKnowledge, payload());
        assert!(!agent.handle("quantum_computer", "calculate", &Value::Null).is_success());
    }
}
