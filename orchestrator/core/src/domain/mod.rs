// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Orchestrator domain model
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Node configuration, runtime and gateway contracts, the
//!   neurogenesis lifecycle model and the task routing types

pub mod events;
pub mod gateway;
pub mod lifecycle;
pub mod node_config;
pub mod research;
pub mod runtime;
pub mod task;
