// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Relevance scoring
//!
//! Pure scoring functions used by discovery. A candidate's score is a
//! weighted sum of six factors, each in `[0, 1]`:
//!
//! ```text
//! score = 0.28*expertise + 0.22*capability + 0.18*domain
//!       + 0.14*performance + 0.08*availability + 0.10*hebbian
//! ```
//!
//! Load is measured as the number of requests currently in flight to the
//! agent through this orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use synapse_sdk::intent::{categorize, normalize};

use super::graph::{canonicalize_concept, AgentStatus};

/// Expertise fallback similarity never reaches an exact match
const SIMILARITY_CEILING: f64 = 0.8;

const CATEGORY_CAPABILITY_SCORE: f64 = 0.3;
const SAME_DOMAIN_SCORE: f64 = 1.0;
const RELATED_DOMAIN_SCORE: f64 = 0.6;
const UNRELATED_DOMAIN_SCORE: f64 = 0.2;
const AVAILABILITY_FLOOR: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub expertise: f64,
    pub capability: f64,
    pub domain: f64,
    pub performance: f64,
    pub availability: f64,
    pub hebbian: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            expertise: 0.28,
            capability: 0.22,
            domain: 0.18,
            performance: 0.14,
            availability: 0.08,
            hebbian: 0.10,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.expertise + self.capability + self.domain + self.performance + self.availability + self.hebbian
    }
}

/// Per-factor contributions, exposed for introspection and tests
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub expertise_match: f64,
    pub capability_match: f64,
    pub domain_overlap: f64,
    pub performance_factor: f64,
    pub availability_factor: f64,
    pub hebbian_weight: f64,
}

impl ScoreBreakdown {
    pub fn score(&self, weights: &ScoreWeights) -> f64 {
        weights.expertise * self.expertise_match
            + weights.capability * self.capability_match
            + weights.domain * self.domain_overlap
            + weights.performance * self.performance_factor
            + weights.availability * self.availability_factor
            + weights.hebbian * self.hebbian_weight
    }
}

/// Observed runtime signals for one agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadSnapshot {
    pub in_flight: u32,
    pub avg_latency_ms: Option<f64>,
    pub avg_quality: Option<f64>,
}

/// Symmetric table of related domains, compared case-insensitively
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelatedDomains(pub BTreeMap<String, Vec<String>>);

impl Default for RelatedDomains {
    fn default() -> Self {
        let table: [(&str, &[&str]); 6] = [
            ("Science", &["Technology", "Mathematics", "Medicine"]),
            ("Technology", &["Science", "Mathematics", "Business"]),
            ("Mathematics", &["Science", "Technology"]),
            ("Medicine", &["Science"]),
            ("Business", &["Technology", "Economics"]),
            ("Arts", &["History"]),
        ];
        Self(
            table
                .iter()
                .map(|(d, rel)| (d.to_string(), rel.iter().map(|r| r.to_string()).collect()))
                .collect(),
        )
    }
}

impl RelatedDomains {
    pub fn are_related(&self, a: &str, b: &str) -> bool {
        let listed = |from: &str, to: &str| {
            self.0.iter().any(|(domain, related)| {
                domain.eq_ignore_ascii_case(from) && related.iter().any(|r| r.eq_ignore_ascii_case(to))
            })
        };
        listed(a, b) || listed(b, a)
    }
}

pub fn expertise_match(expertise: &BTreeSet<String>, concept: &str) -> f64 {
    let concept = canonicalize_concept(concept);
    if expertise.contains(&concept) {
        return 1.0;
    }
    expertise
        .iter()
        .map(|e| bigram_similarity(e, &concept) * SIMILARITY_CEILING)
        .fold(0.0, f64::max)
}

pub fn capability_match(capabilities: &BTreeSet<String>, intent: &str) -> f64 {
    let intent = normalize(intent);
    if capabilities.contains(&intent) {
        return 1.0;
    }
    match categorize(&intent) {
        Some(category) if capabilities.iter().any(|c| categorize(c) == Some(category)) => {
            CATEGORY_CAPABILITY_SCORE
        }
        _ => 0.0,
    }
}

pub fn domain_overlap(agent_region: Option<&str>, query_domain: Option<&str>, related: &RelatedDomains) -> f64 {
    match (agent_region, query_domain) {
        (Some(region), Some(domain)) if region.trim().eq_ignore_ascii_case(domain.trim()) => SAME_DOMAIN_SCORE,
        (Some(region), Some(domain)) if related.are_related(region.trim(), domain.trim()) => RELATED_DOMAIN_SCORE,
        _ => UNRELATED_DOMAIN_SCORE,
    }
}

/// `0.5*successRate + 0.3*latency + 0.2*quality`. Unknown latency and
/// quality count as 0.5.
pub fn performance_factor(success_rate: f64, load: &LoadSnapshot, latency_reference_ms: f64) -> f64 {
    let latency = match load.avg_latency_ms {
        Some(ms) if latency_reference_ms > 0.0 => latency_reference_ms / (latency_reference_ms + ms.max(0.0)),
        _ => 0.5,
    };
    let quality = load.avg_quality.unwrap_or(0.5).clamp(0.0, 1.0);
    (0.5 * success_rate.clamp(0.0, 1.0) + 0.3 * latency + 0.2 * quality).clamp(0.0, 1.0)
}

pub fn availability_factor(status: AgentStatus, in_flight: u32, max_load: u32) -> f64 {
    if status != AgentStatus::Healthy {
        return 0.0;
    }
    let max_load = max_load.max(1) as f64;
    (1.0 - in_flight as f64 / max_load).max(AVAILABILITY_FLOOR)
}

/// Dice coefficient over character bigrams of two canonical names.
pub fn bigram_similarity(a: &str, b: &str) -> f64 {
    fn bigrams(s: &str) -> Vec<(char, char)> {
        let chars: Vec<char> = s.chars().collect();
        chars.windows(2).map(|w| (w[0], w[1])).collect()
    }

    if a == b {
        return 1.0;
    }
    let left = bigrams(a);
    let mut right = bigrams(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let total = (left.len() + right.len()) as f64;
    let mut shared = 0usize;
    for pair in &left {
        if let Some(pos) = right.iter().position(|p| p == pair) {
            right.swap_remove(pos);
            shared += 1;
        }
    }
    2.0 * shared as f64 / total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((ScoreWeights::default().total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_exact_expertise_dominates_similarity() {
        let expertise = set(&["quantum_computer", "quantum_computing"]);
        assert_eq!(expertise_match(&expertise, "Quantum Computer"), 1.0);

        let near = expertise_match(&set(&["quantum_computing"]), "quantum_computer");
        assert!(near > 0.5 && near < 1.0);
        assert_eq!(expertise_match(&set(&["botany"]), "quantum_computer"), 0.0);
    }

    #[test]
    fn test_capability_match() {
        let caps = set(&["define", "explain"]);
        assert_eq!(capability_match(&caps, "define"), 1.0);
        assert_eq!(capability_match(&caps, "summarize"), CATEGORY_CAPABILITY_SCORE);
        assert_eq!(capability_match(&caps, "calculate"), 0.0);
    }

    #[test]
    fn test_domain_overlap() {
        let related = RelatedDomains::default();
        assert_eq!(domain_overlap(Some("Science"), Some("science"), &related), 1.0);
        assert_eq!(domain_overlap(Some("Mathematics"), Some("Science"), &related), 0.6);
        assert_eq!(domain_overlap(Some("Arts"), Some("Science"), &related), 0.2);
        assert_eq!(domain_overlap(None, Some("Science"), &related), 0.2);
    }

    #[test]
    fn test_availability_factor() {
        assert_eq!(availability_factor(AgentStatus::Degraded, 0, 8), 0.0);
        assert_eq!(availability_factor(AgentStatus::Healthy, 0, 8), 1.0);
        assert_eq!(availability_factor(AgentStatus::Healthy, 4, 8), 0.5);
        assert_eq!(availability_factor(AgentStatus::Healthy, 20, 8), AVAILABILITY_FLOOR);
    }

    #[test]
    fn test_performance_factor_defaults() {
        let p = performance_factor(0.5, &LoadSnapshot::default(), 1000.0);
        assert!((p - 0.5).abs() < 1e-12);

        let fast = LoadSnapshot {
            in_flight: 0,
            avg_latency_ms: Some(0.0),
            avg_quality: Some(1.0),
        };
        assert!((performance_factor(1.0, &fast, 1000.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_score_is_weighted_sum() {
        let breakdown = ScoreBreakdown {
            expertise_match: 1.0,
            capability_match: 1.0,
            domain_overlap: 1.0,
            performance_factor: 1.0,
            availability_factor: 1.0,
            hebbian_weight: 0.5,
        };
        assert!((breakdown.score(&ScoreWeights::default()) - 0.95).abs() < 1e-12);
    }
}
