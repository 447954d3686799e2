// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Synapse orchestrator core
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Routes tasks to agents discovered in the Cortex graph and
//!   grows new agents for concepts nothing handles yet

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
