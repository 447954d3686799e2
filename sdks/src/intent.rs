// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Intent normalisation and broad intent categories.
//!
//! Intents arrive from the query-parsing collaborator as short verbs
//! (`define`, `calculate`, `compare`, ...). Discovery awards partial credit
//! when an agent lists an intent of the same broad category, and template
//! selection routes compute intents to the function template.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Knowledge,
    Compute,
    Analysis,
    Retrieval,
}

const KNOWLEDGE: &[&str] = &[
    "define", "explain", "describe", "what_is", "summarize", "overview", "research", "clarify",
];
const COMPUTE: &[&str] = &[
    "calculate", "compute", "evaluate", "solve", "convert", "sum", "mean", "average", "min",
    "max", "product", "count", "aggregate",
];
const ANALYSIS: &[&str] = &["compare", "analyze", "relate", "related", "classify", "contrast"];
const RETRIEVAL: &[&str] = &["lookup", "find", "search", "list", "fetch", "retrieve"];

/// Lowercases, trims and joins words with `_` (`"What is"` -> `"what_is"`).
pub fn normalize(intent: &str) -> String {
    intent
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Broad category of an intent, `None` for intents outside the known vocabulary.
pub fn categorize(intent: &str) -> Option<IntentCategory> {
    let intent = normalize(intent);
    let intent = intent.as_str();
    if KNOWLEDGE.contains(&intent) {
        Some(IntentCategory::Knowledge)
    } else if COMPUTE.contains(&intent) {
        Some(IntentCategory::Compute)
    } else if ANALYSIS.contains(&intent) {
        Some(IntentCategory::Analysis)
    } else if RETRIEVAL.contains(&intent) {
        Some(IntentCategory::Retrieval)
    } else {
        None
    }
}

/// Default intent vocabulary handled by the function template.
pub fn default_function_intents() -> Vec<String> {
    COMPUTE.iter().map(|s| s.to_string()).collect()
}
