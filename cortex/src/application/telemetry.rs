// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Per-agent runtime signals feeding the relevance score: requests in
//! flight, an EMA of response latency and an EMA of reported confidence.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{AgentId, LoadSnapshot};

const EMA_ALPHA: f64 = 0.2;

#[derive(Debug, Default)]
struct AgentStats {
    in_flight: u32,
    avg_latency_ms: Option<f64>,
    avg_quality: Option<f64>,
}

fn ema(previous: Option<f64>, sample: f64) -> f64 {
    match previous {
        Some(avg) => avg + EMA_ALPHA * (sample - avg),
        None => sample,
    }
}

#[derive(Debug, Default)]
pub struct AgentTelemetry {
    stats: DashMap<AgentId, AgentStats>,
}

impl AgentTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against the agent until the guard is dropped
    pub fn begin(self: &Arc<Self>, agent_id: &AgentId) -> LoadGuard {
        self.stats.entry(agent_id.clone()).or_default().in_flight += 1;
        LoadGuard {
            telemetry: Arc::clone(self),
            agent_id: agent_id.clone(),
        }
    }

    pub fn snapshot(&self, agent_id: &AgentId) -> LoadSnapshot {
        self.stats
            .get(agent_id)
            .map(|s| LoadSnapshot {
                in_flight: s.in_flight,
                avg_latency_ms: s.avg_latency_ms,
                avg_quality: s.avg_quality,
            })
            .unwrap_or_default()
    }

    pub fn record(&self, agent_id: &AgentId, latency: Duration, quality: Option<f64>) {
        let mut stats = self.stats.entry(agent_id.clone()).or_default();
        stats.avg_latency_ms = Some(ema(stats.avg_latency_ms, latency.as_secs_f64() * 1000.0));
        if let Some(q) = quality {
            stats.avg_quality = Some(ema(stats.avg_quality, q.clamp(0.0, 1.0)));
        }
    }

    pub fn forget(&self, agent_id: &AgentId) {
        self.stats.remove(agent_id);
    }

    fn release(&self, agent_id: &AgentId) {
        if let Some(mut stats) = self.stats.get_mut(agent_id) {
            stats.in_flight = stats.in_flight.saturating_sub(1);
        }
    }
}

/// In-flight marker for one dispatched request
pub struct LoadGuard {
    telemetry: Arc<AgentTelemetry>,
    agent_id: AgentId,
}

impl LoadGuard {
    /// Record latency and confidence, then release the load slot
    pub fn finish(self, latency: Duration, quality: Option<f64>) {
        self.telemetry.record(&self.agent_id, latency, quality);
    }
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.telemetry.release(&self.agent_id);
    }
}
