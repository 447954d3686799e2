// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Orchestrator node bootstrap
//!
//! Wires the Cortex graph, Hebbian engine, discovery, the lifecycle manager
//! and the routing service together, starts the background tasks and serves
//! the node API until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use synapse_cortex::application::{
    AgentRegistrar, AgentTelemetry, DiscoveryService, HebbianDecayScheduler, HebbianEngine,
};
use synapse_cortex::{GraphRepository, InMemoryGraphRepository};
use synapse_orchestrator_core::application::{
    AgentHealthMonitor, LifecycleManager, NetworkResearchService, OrchestratorService,
};
use synapse_orchestrator_core::domain::node_config::{
    IsolationMode, LifecycleConfig, RuntimeConfig, SynapseConfigManifest,
};
use synapse_orchestrator_core::domain::runtime::{AgentRuntime, ResourceLimits};
use synapse_orchestrator_core::infrastructure::{
    DockerRuntime, EventBus, HttpAgentGateway, InProcessRuntime, ProcessRuntime,
};
use synapse_orchestrator_core::presentation::api::{app, AppState};

pub async fn start_node(config: SynapseConfigManifest, host: Option<String>, port: Option<u16>) -> Result<()> {
    config
        .validate()
        .context("Configuration validation failed")?;

    let spec = &config.spec;
    info!(node = %config.metadata.name, "Synapse node starting");

    if let Some(metrics) = spec.observability.as_ref().and_then(|o| o.metrics.as_ref()) {
        if metrics.enabled {
            install_metrics_exporter(metrics.port)?;
        }
    }

    let shutdown = CancellationToken::new();

    // Cortex
    let graph: Arc<dyn GraphRepository> = Arc::new(InMemoryGraphRepository::new());
    let event_bus = Arc::new(EventBus::with_default_capacity());
    let telemetry = Arc::new(AgentTelemetry::new());
    let registrar = Arc::new(AgentRegistrar::new(graph.clone(), event_bus.clone()));
    let hebbian = Arc::new(HebbianEngine::new(
        graph.clone(),
        event_bus.clone(),
        spec.hebbian.clone(),
    ));
    let discovery = Arc::new(DiscoveryService::new(
        graph.clone(),
        telemetry.clone(),
        spec.discovery.clone(),
    ));

    // Neurogenesis
    let gateway = Arc::new(HttpAgentGateway::new().context("Failed to create agent gateway")?);
    let runtime = build_runtime(&spec.runtime, &spec.lifecycle)?;
    let research = Arc::new(NetworkResearchService::new(
        graph.clone(),
        gateway.clone(),
        spec.lifecycle.research_timeout(),
    ));
    let lifecycle = Arc::new(
        LifecycleManager::new(
            spec.lifecycle.clone(),
            runtime,
            gateway.clone(),
            research,
            registrar.clone(),
            event_bus.clone(),
        )
        .with_resources(ResourceLimits {
            cpu_millis: spec.runtime.agent_cpu_limit,
            memory_bytes: spec.runtime.agent_memory_limit,
        })
        .with_telemetry(telemetry.clone())
        .with_shutdown_token(shutdown.clone()),
    );

    let orchestrator = Arc::new(OrchestratorService::new(
        graph.clone(),
        discovery,
        hebbian.clone(),
        telemetry,
        registrar.clone(),
        lifecycle.clone(),
        gateway.clone(),
        event_bus,
        spec.network.clone(),
    ));

    let registered = orchestrator.register_static_agents(&spec.agents).await;
    info!(registered, configured = spec.agents.len(), "Static agents registered");

    // Background tasks share one shutdown token
    let background = vec![
        lifecycle.clone().start(),
        Arc::new(HebbianDecayScheduler::new(hebbian).with_shutdown_token(shutdown.clone())).start(),
        Arc::new(
            AgentHealthMonitor::new(graph, registrar, gateway, spec.health_monitor.clone())
                .with_shutdown_token(shutdown.clone()),
        )
        .start(),
    ];

    let router = app(Arc::new(AppState::new(orchestrator)));

    let bind_host = host.unwrap_or_else(|| spec.network.bind_address.clone());
    let bind_port = port.unwrap_or(spec.network.port);
    let addr = format!("{}:{}", bind_host, bind_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Node listening on {}", addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("HTTP server failed");

    info!("Node shutting down");
    shutdown.cancel();
    lifecycle.shutdown().await;
    for handle in background {
        if let Err(e) = handle.await {
            warn!("Background task ended abnormally: {}", e);
        }
    }

    served
}

fn build_runtime(runtime: &RuntimeConfig, lifecycle: &LifecycleConfig) -> Result<Arc<dyn AgentRuntime>> {
    let selected: Arc<dyn AgentRuntime> = match runtime.isolation {
        IsolationMode::InProcess => Arc::new(InProcessRuntime::new(lifecycle.agent_host.clone())),
        IsolationMode::Process => Arc::new(ProcessRuntime::new(
            runtime.agent_binary.as_ref().map(PathBuf::from),
            lifecycle.agent_host.clone(),
        )),
        IsolationMode::Docker => Arc::new(
            DockerRuntime::new(runtime, lifecycle.agent_host.clone()).context("Failed to connect to Docker")?,
        ),
    };
    info!(isolation = ?runtime.isolation, "Agent runtime selected");
    Ok(selected)
}

fn install_metrics_exporter(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    describe_counter!("synapse_tasks_total", "Routed tasks by final status");
    describe_counter!("synapse_hebbian_updates_total", "Hebbian edge updates by outcome");
    describe_counter!("synapse_agents_provisioned_total", "Dynamic agents that reached Healthy");
    describe_counter!("synapse_provisioning_failures_total", "Failed provisioning attempts by error code");
    describe_gauge!("synapse_active_dynamic_agents", "Dynamic agents holding a creation slot");
    describe_gauge!("synapse_creation_queue_depth", "Concepts waiting for a creation slot");
    describe_histogram!(
        "synapse_dispatch_latency_seconds",
        Unit::Seconds,
        "Latency of task dispatches to agents"
    );

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
        _ = token.cancelled() => {},
    }
}
