// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `synapse-sdk`: agent network protocol and template agents
//!
//! Everything an agent on the Synapse network needs, and everything the
//! orchestrator needs to talk to one:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`types`] | Wire types for `GET /health` and `POST /process` |
//! | [`client`] | [`AgentClient`], the HTTP client used for dispatch, research and health probes |
//! | [`intent`] | Intent normalisation and broad intent categories |
//! | [`template`] | [`TemplateKind`] and the [`KnowledgePayload`] injected into new agents |
//! | [`behavior`] | [`AgentBehavior`], the closed set of compiled template behaviours |
//! | [`server`] | Axum server exposing a behaviour over the agent protocol |
//!
//! Dynamically provisioned agents are not generated code: they are one of the
//! behaviours in [`behavior`], parameterised by a [`KnowledgePayload`] at start.

pub mod behavior;
pub mod client;
pub mod expression;
pub mod intent;
pub mod server;
pub mod template;
pub mod types;

pub use behavior::AgentBehavior;
pub use client::{AgentClient, AgentClientError};
pub use intent::IntentCategory;
pub use template::{KnowledgePayload, TemplateKind};
pub use types::*;
