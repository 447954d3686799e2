// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Template agent HTTP server.
//!
//! Exposes an [`AgentBehavior`] over the agent protocol:
//! `GET /health` and `POST /process`. Used by `synapse agent serve` (child
//! process and container agents) and by the in-process runtime.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::behavior::AgentBehavior;
use crate::types::{HealthResponse, ProcessRequest, ProcessResponse};

pub struct AgentServerState {
    pub agent_id: String,
    pub behavior: AgentBehavior,
    pub started_at: Instant,
}

pub fn router(agent_id: impl Into<String>, behavior: AgentBehavior) -> Router {
    let state = Arc::new(AgentServerState {
        agent_id: agent_id.into(),
        behavior,
        started_at: Instant::now(),
    });

    Router::new()
        .route("/health", get(health))
        .route("/process", post(process))
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    agent_id: impl Into<String>,
    behavior: AgentBehavior,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let agent_id = agent_id.into();
    let addr = listener.local_addr()?;
    info!(
        agent_id = %agent_id,
        template = %behavior.kind(),
        concept = %behavior.knowledge().concept,
        %addr,
        "Template agent listening"
    );

    let app = router(agent_id.clone(), behavior);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!(agent_id = %agent_id, "Template agent stopped");
    Ok(())
}

async fn health(State(state): State<Arc<AgentServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        agent_id: Some(state.agent_id.clone()),
        template: Some(state.behavior.kind()),
        concept: Some(state.behavior.knowledge().concept.clone()),
    })
}

async fn process(
    State(state): State<Arc<AgentServerState>>,
    Json(request): Json<ProcessRequest>,
) -> Json<ProcessResponse> {
    debug!(
        agent_id = %state.agent_id,
        intent = %request.intent,
        concept = %request.concept,
        uptime_ms = state.started_at.elapsed().as_millis() as u64,
        "Handling process request"
    );
    Json(
        state
            .behavior
            .handle(&request.concept, &request.intent, &request.args),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{KnowledgePayload, TemplateKind};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        let mut knowledge = KnowledgePayload::fallback("entropy");
        knowledge.definitions.push("A measure of disorder.".to_string());
        router("agent-1", AgentBehavior::new(TemplateKind::BasicKnowledge, knowledge))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(health.is_healthy());
        assert_eq!(health.template, Some(TemplateKind::BasicKnowledge));
    }

    #[tokio::test]
    async fn test_process_endpoint() {
        let request = Request::builder()
            .method("POST")
            .uri("/process")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"intent":"define","concept":"entropy","args":{}}"#))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ProcessResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.is_success());
        assert_eq!(body.data["definition"], "A measure of disorder.");
    }
}
