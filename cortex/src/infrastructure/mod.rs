// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod graph_store;
pub mod repository;

pub use graph_store::InMemoryGraphRepository;
pub use repository::{EdgeMutation, EdgeUpdate, GraphRepository, GraphStats, NodePredicate};
