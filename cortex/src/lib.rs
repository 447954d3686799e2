// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Synapse Cortex
//!
//! The agent/concept graph and everything that learns from it.
//!
//! # Architecture
//!
//! - **Layer:** Learning & Routing Layer
//! - **Purpose:** Graph store, Hebbian weight learning and relevance-scored
//!   agent discovery

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
pub use infrastructure::*;
