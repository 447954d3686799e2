// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cortex domain model: graph entities, events and relevance scoring.

pub mod error;
pub mod events;
pub mod graph;
pub mod relevance;

pub use error::*;
pub use events::*;
pub use graph::*;
pub use relevance::*;
