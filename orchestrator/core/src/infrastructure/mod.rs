// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod gateway;
pub mod in_process_runtime;
pub mod process_runtime;
pub mod runtime;

pub use event_bus::{DomainEvent, EventBus, EventBusError, EventReceiver};
pub use gateway::HttpAgentGateway;
pub use in_process_runtime::InProcessRuntime;
pub use process_runtime::ProcessRuntime;
pub use runtime::DockerRuntime;
