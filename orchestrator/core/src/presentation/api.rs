// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP API of an orchestrator node.
//!
//! - `GET /health` node status
//! - `POST /process` route a query batch
//! - `GET /agents`, `POST /agents` list or register agents
//! - `DELETE /agents/{id}` retire a dynamic agent
//! - `GET /discover?concept=&intent=` ranked candidates
//! - `GET /lifecycle` lifecycle records and creation queue
//! - `GET /events` domain events as server-sent events

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::warn;

use synapse_cortex::application::QueryContext;
use synapse_cortex::{AgentId, AgentNode, GraphNode, GraphRepository};

use crate::application::orchestrator::OrchestratorService;
use crate::domain::lifecycle::{CreationQueueEntry, EvictionReason, LifecycleError, LifecycleRecord, LifecycleState};
use crate::domain::node_config::StaticAgentConfig;
use crate::domain::task::{QueryRequest, QueryResponse};
use crate::infrastructure::event_bus::EventBusError;

pub struct AppState {
    pub orchestrator: Arc<OrchestratorService>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<OrchestratorService>) -> Self {
        Self {
            orchestrator,
            start_time: Instant::now(),
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/process", post(process_handler))
        .route("/agents", get(list_agents_handler).post(register_agent_handler))
        .route("/agents/{id}", delete(retire_agent_handler))
        .route("/discover", get(discover_handler))
        .route("/lifecycle", get(lifecycle_handler))
        .route("/events", get(events_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn internal(message: impl ToString) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal_error",
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.message, "code": self.code })),
        )
            .into_response()
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        let status = match &e {
            LifecycleError::AgentNotFound(_) => StatusCode::NOT_FOUND,
            LifecycleError::NotRetirable { .. } | LifecycleError::AlreadyInProgress(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            code: e.code(),
            message: e.to_string(),
        }
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = state.orchestrator.graph().stats().await.map_err(ApiError::internal)?;
    let lifecycle = state.orchestrator.lifecycle();
    Ok(Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "graph": stats,
        "active_dynamic_agents": lifecycle.active_count(),
        "creation_queue_depth": lifecycle.queue().len(),
    })))
}

async fn process_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    request.validate().map_err(|e| ApiError {
        status: StatusCode::BAD_REQUEST,
        code: e.code(),
        message: e.to_string(),
    })?;
    Ok(Json(state.orchestrator.process_query(request).await))
}

#[derive(Debug, Serialize)]
pub struct AgentView {
    #[serde(flatten)]
    pub agent: AgentNode,
    /// Set for dynamic agents the lifecycle manager still tracks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_state: Option<LifecycleState>,
}

async fn list_agents_handler(State(state): State<Arc<AppState>>) -> Result<Json<Vec<AgentView>>, ApiError> {
    let predicate = |node: &GraphNode| node.as_agent().is_some();
    let nodes = state
        .orchestrator
        .graph()
        .find_nodes(&predicate)
        .await
        .map_err(ApiError::internal)?;

    let lifecycle = state.orchestrator.lifecycle();
    let mut agents: Vec<AgentView> = nodes
        .into_iter()
        .filter_map(|n| n.as_agent().cloned())
        .map(|agent| AgentView {
            lifecycle_state: lifecycle.record(&agent.id).map(|r| r.state),
            agent,
        })
        .collect();
    agents.sort_by(|a, b| a.agent.id.cmp(&b.agent.id));
    Ok(Json(agents))
}

async fn register_agent_handler(
    State(state): State<Arc<AppState>>,
    Json(agent): Json<StaticAgentConfig>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if agent.id.trim().is_empty() || agent.concepts.is_empty() {
        return Err(ApiError {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_agent",
            message: "agent id and at least one concept are required".into(),
        });
    }
    let id = state
        .orchestrator
        .register_agent(&agent)
        .await
        .map_err(ApiError::internal)?;
    Ok((StatusCode::CREATED, Json(json!({ "agent_id": id }))))
}

async fn retire_agent_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .orchestrator
        .lifecycle()
        .retire(&AgentId::new(id), EvictionReason::Manual)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct DiscoverParams {
    pub concept: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub domain: Option<String>,
}

async fn discover_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiscoverParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let context = QueryContext { domain: params.domain };
    let candidates = state
        .orchestrator
        .discover(&params.concept, &params.intent, &context)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(json!({
        "concept": params.concept,
        "intent": params.intent,
        "candidates": candidates,
    })))
}

#[derive(Debug, Serialize)]
pub struct LifecycleView {
    pub records: Vec<LifecycleRecord>,
    pub queue: Vec<CreationQueueEntry>,
    pub ports_allocated: usize,
    pub ports_capacity: usize,
}

async fn lifecycle_handler(State(state): State<Arc<AppState>>) -> Json<LifecycleView> {
    let lifecycle = state.orchestrator.lifecycle();
    Json(LifecycleView {
        records: lifecycle.records(),
        queue: lifecycle.queue(),
        ports_allocated: lifecycle.ports().allocated(),
        ports_capacity: lifecycle.ports().capacity(),
    })
}

async fn events_handler(State(state): State<Arc<AppState>>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.orchestrator.event_bus().subscribe();
    let events = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let sse = match Event::default().event(event.category()).json_data(&event) {
                        Ok(sse) => sse,
                        Err(e) => {
                            warn!("Failed to encode event for stream: {}", e);
                            continue;
                        }
                    };
                    return Some((Ok(sse), receiver));
                }
                Err(EventBusError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use synapse_cortex::application::{
        AgentRegistrar, AgentTelemetry, DiscoveryConfig, DiscoveryService, HebbianConfig, HebbianEngine,
    };
    use synapse_cortex::InMemoryGraphRepository;

    use crate::application::neurogenesis::LifecycleManager;
    use crate::application::research::NetworkResearchService;
    use crate::domain::node_config::{LifecycleConfig, NetworkConfig};
    use crate::infrastructure::{EventBus, HttpAgentGateway, InProcessRuntime};

    fn test_state() -> Arc<AppState> {
        let graph: Arc<dyn GraphRepository> = Arc::new(InMemoryGraphRepository::new());
        let event_bus = Arc::new(EventBus::with_default_capacity());
        let telemetry = Arc::new(AgentTelemetry::new());
        let gateway = Arc::new(HttpAgentGateway::new().unwrap());
        let registrar = Arc::new(AgentRegistrar::new(graph.clone(), event_bus.clone()));
        let hebbian = Arc::new(HebbianEngine::new(graph.clone(), event_bus.clone(), HebbianConfig::default()));
        let discovery = Arc::new(DiscoveryService::new(graph.clone(), telemetry.clone(), DiscoveryConfig::default()));
        let research = Arc::new(NetworkResearchService::new(
            graph.clone(),
            gateway.clone(),
            std::time::Duration::from_millis(200),
        ));
        let lifecycle = Arc::new(LifecycleManager::new(
            LifecycleConfig::default(),
            Arc::new(InProcessRuntime::new("127.0.0.1")),
            gateway.clone(),
            research,
            registrar.clone(),
            event_bus.clone(),
        ));
        let orchestrator = Arc::new(OrchestratorService::new(
            graph,
            discovery,
            hebbian,
            telemetry,
            registrar,
            lifecycle,
            gateway,
            event_bus,
            NetworkConfig::default(),
        ));
        Arc::new(AppState::new(orchestrator))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn register_request() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/agents")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "id": "physics-1",
                    "name": "Physics",
                    "endpoint": "http://127.0.0.1:1",
                    "capabilities": ["define", "explain"],
                    "concepts": ["entropy"],
                    "region": "Science"
                })
                .to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_graph_stats() {
        let response = app(test_state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["graph"]["agents"], 0);
        assert_eq!(body["active_dynamic_agents"], 0);
    }

    #[tokio::test]
    async fn test_registered_agent_is_listed_and_discoverable() {
        let state = test_state();
        let response = app(state.clone()).oneshot(register_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app(state.clone())
            .oneshot(Request::builder().uri("/agents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let agents = body_json(response).await;
        assert_eq!(agents.as_array().unwrap().len(), 1);
        assert_eq!(agents[0]["id"], "physics-1");
        assert!(agents[0].get("lifecycle_state").is_none());

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/discover?concept=entropy&intent=define")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["candidates"][0]["agent"]["id"], "physics-1");
    }

    #[tokio::test]
    async fn test_register_requires_concepts() {
        let request = Request::builder()
            .method("POST")
            .uri("/agents")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"id": "x", "endpoint": "http://x", "capabilities": [], "concepts": []}).to_string(),
            ))
            .unwrap();
        let response = app(test_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_process_rejects_duplicate_task_ids() {
        let request = Request::builder()
            .method("POST")
            .uri("/process")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "query_id": "q-dup",
                    "tasks": [
                        {"task_id": "t1", "intent": "define", "concept": "entropy"},
                        {"task_id": "t1", "intent": "explain", "concept": "entropy"}
                    ]
                })
                .to_string(),
            ))
            .unwrap();
        let response = app(test_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "duplicate_task_id");
    }

    #[tokio::test]
    async fn test_retire_unknown_agent_is_not_found() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/agents/dyn-missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "agent_not_found");
    }

    #[tokio::test]
    async fn test_lifecycle_view_reports_port_capacity() {
        let response = app(test_state())
            .oneshot(Request::builder().uri("/lifecycle").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["ports_capacity"], 3000);
        assert_eq!(body["ports_allocated"], 0);
        assert!(body["records"].as_array().unwrap().is_empty());
    }
}
