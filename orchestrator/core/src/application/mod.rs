// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod health_monitor;
pub mod neurogenesis;
pub mod orchestrator;
pub mod port_allocator;
pub mod research;

pub use health_monitor::AgentHealthMonitor;
pub use neurogenesis::LifecycleManager;
pub use orchestrator::OrchestratorService;
pub use port_allocator::PortAllocator;
pub use research::{NetworkResearchService, ResearchService};
