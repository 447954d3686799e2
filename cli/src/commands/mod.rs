// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Synapse CLI

pub mod agent;
pub mod agents;
pub mod config;
pub mod task;

pub use self::agent::AgentCommand;
pub use self::agents::AgentsCommand;
pub use self::config::ConfigCommand;
pub use self::task::TaskCommand;
