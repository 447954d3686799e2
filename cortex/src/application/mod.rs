// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application services for the Cortex bounded context

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::CortexEvent;

pub mod decay_scheduler;
pub mod discovery;
pub mod hebbian;
pub mod registrar;
pub mod telemetry;

pub use decay_scheduler::HebbianDecayScheduler;
pub use discovery::{DiscoveryConfig, DiscoveryOutcome, DiscoveryService, QueryContext, ScoredAgent};
pub use hebbian::{DecayReport, DecayScope, HebbianConfig, HebbianEngine};
pub use registrar::{AgentRegistrar, AgentRegistration};
pub use telemetry::{AgentTelemetry, LoadGuard};

/// Sink for Cortex domain events
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: CortexEvent) -> Result<()>;
}

/// Discards every event. Used when no orchestrator bus is wired in.
pub struct NoopEventBus;

#[async_trait]
impl EventBus for NoopEventBus {
    async fn publish(&self, _event: CortexEvent) -> Result<()> {
        Ok(())
    }
}
