// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`synapse-orchestrator-core`)
//!
//! HTTP surface that translates external requests into application
//! service calls. Business logic stays in `crate::application`.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`api`] | HTTP/SSE (Axum) | Query processing, agent management, discovery and event streaming |

pub mod api;
