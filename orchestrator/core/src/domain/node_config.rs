// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Node Configuration Types
//
// Defines the configuration schema for a Synapse orchestrator node:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Network, Hebbian learning, discovery and lifecycle settings
// - Agent runtime selection (in-process, child process, Docker)
// - Statically configured agents
// - Observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use synapse_cortex::application::{DiscoveryConfig, HebbianConfig};
use synapse_sdk::intent::default_function_intents;

pub const API_VERSION: &str = "synapse.100monkeys.ai/v1";
pub const KIND: &str = "SynapseConfig";
pub const CONFIG_PATH_ENV: &str = "SYNAPSE_CONFIG_PATH";

/// Top-level Kubernetes-style node configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynapseConfigManifest {
    /// API version (must be "synapse.100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "SynapseConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: SynapseConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable node name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynapseConfigSpec {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub hebbian: HebbianConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub health_monitor: HealthMonitorConfig,

    /// Agents registered at startup
    #[serde(default)]
    pub agents: Vec<StaticAgentConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP API port
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Deadline for one `/process` dispatch to an agent
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,

    /// Tasks of one query dispatched concurrently
    #[serde(default = "default_max_parallel_tasks")]
    pub max_parallel_tasks: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            max_parallel_tasks: default_max_parallel_tasks(),
        }
    }
}

impl NetworkConfig {
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }
}

/// What to do with a creation request for a concept already being provisioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateRequestPolicy {
    /// Wait for and share the in-flight attempt's result
    #[default]
    Join,
    /// Fail fast with `AlreadyInProgress`
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default = "default_max_concurrent_agents")]
    pub max_concurrent_agents: usize,

    #[serde(default = "default_idle_timeout_min")]
    pub idle_timeout_min: u64,

    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,

    #[serde(default = "default_port_range_start")]
    pub port_range_start: u16,

    /// Inclusive
    #[serde(default = "default_port_range_end")]
    pub port_range_end: u16,

    /// Skip ports another process already holds
    #[serde(default = "default_true")]
    pub probe_ports: bool,

    #[serde(default = "default_health_check_timeout_secs")]
    pub health_check_timeout_secs: u64,

    #[serde(default = "default_health_poll_interval_ms")]
    pub health_poll_interval_ms: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Keep retired agents in the graph, marked Retired
    #[serde(default = "default_true")]
    pub retain_retired_agents: bool,

    /// 1 means no retry
    #[serde(default = "default_max_provision_attempts")]
    pub max_provision_attempts: u32,

    #[serde(default)]
    pub duplicate_request_policy: DuplicateRequestPolicy,

    /// Queued requests older than this are dropped by the sweep. 0 keeps them forever.
    #[serde(default = "default_queue_entry_ttl_secs")]
    pub queue_entry_ttl_secs: u64,

    /// Domains that get the specialist template
    #[serde(default = "default_specialist_domains")]
    pub specialist_domains: Vec<String>,

    /// Intents that get the function template
    #[serde(default = "default_function_intents")]
    pub function_intents: Vec<String>,

    /// Per-agent timeout for research queries against existing agents
    #[serde(default = "default_research_timeout_ms")]
    pub research_timeout_ms: u64,

    /// Host dynamic agent endpoints are reached at
    #[serde(default = "default_agent_host")]
    pub agent_host: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_concurrent_agents: default_max_concurrent_agents(),
            idle_timeout_min: default_idle_timeout_min(),
            max_age_hours: default_max_age_hours(),
            port_range_start: default_port_range_start(),
            port_range_end: default_port_range_end(),
            probe_ports: true,
            health_check_timeout_secs: default_health_check_timeout_secs(),
            health_poll_interval_ms: default_health_poll_interval_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
            retain_retired_agents: true,
            max_provision_attempts: default_max_provision_attempts(),
            duplicate_request_policy: DuplicateRequestPolicy::Join,
            queue_entry_ttl_secs: default_queue_entry_ttl_secs(),
            specialist_domains: default_specialist_domains(),
            function_intents: default_function_intents(),
            research_timeout_ms: default_research_timeout_ms(),
            agent_host: default_agent_host(),
        }
    }
}

impl LifecycleConfig {
    pub fn idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.idle_timeout_min.min(i64::MAX as u64) as i64)
    }

    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_age_hours.min(i64::MAX as u64) as i64)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs)
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_millis(self.health_poll_interval_ms.max(1))
    }

    pub fn queue_entry_ttl(&self) -> Option<chrono::Duration> {
        (self.queue_entry_ttl_secs > 0)
            .then(|| chrono::Duration::seconds(self.queue_entry_ttl_secs.min(i64::MAX as u64) as i64))
    }

    pub fn research_timeout(&self) -> Duration {
        Duration::from_millis(self.research_timeout_ms)
    }
}

/// How dynamic agents are run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationMode {
    /// Tokio task inside the orchestrator process
    #[default]
    InProcess,
    /// Child process running `synapse agent serve`
    Process,
    Docker,
}

impl FromStr for IsolationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in-process" | "inprocess" | "in_process" => Ok(IsolationMode::InProcess),
            "process" => Ok(IsolationMode::Process),
            "docker" => Ok(IsolationMode::Docker),
            other => Err(format!(
                "Unknown isolation mode '{}'. Supported: in-process, process, docker",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub isolation: IsolationMode,

    /// Binary launched by the process runtime. Defaults to the running executable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_binary: Option<String>,

    /// Image launched by the Docker runtime; must contain the `synapse` binary
    #[serde(default = "default_agent_image")]
    pub agent_image: String,

    /// Pull the agent image when it is missing locally
    #[serde(default = "default_true")]
    pub autopull: bool,

    /// Path to Docker socket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_socket_path: Option<String>,

    /// Optional Docker network for agent containers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_network: Option<String>,

    /// CPU limit per agent in millicores
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_cpu_limit: Option<u32>,

    /// Memory limit per agent in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_memory_limit: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            isolation: IsolationMode::InProcess,
            agent_binary: None,
            agent_image: default_agent_image(),
            autopull: true,
            docker_socket_path: None,
            docker_network: None,
            agent_cpu_limit: None,
            agent_memory_limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthMonitorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_health_monitor_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_health_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Consecutive failed probes before an agent is marked Failed
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_health_monitor_interval_secs(),
            probe_timeout_ms: default_health_probe_timeout_ms(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

/// Agent registered at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticAgentConfig {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub endpoint: String,

    pub capabilities: Vec<String>,

    /// Concept names the agent handles
    pub concepts: Vec<String>,

    /// Region (domain) the agent and new concepts belong to
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_concept_complexity")]
    pub complexity_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prometheus exporter port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8700
}

fn default_dispatch_timeout_ms() -> u64 {
    10_000
}

fn default_max_parallel_tasks() -> usize {
    8
}

fn default_max_concurrent_agents() -> usize {
    20
}

fn default_idle_timeout_min() -> u64 {
    30
}

fn default_max_age_hours() -> u64 {
    24
}

fn default_port_range_start() -> u16 {
    7000
}

fn default_port_range_end() -> u16 {
    9999
}

fn default_health_check_timeout_secs() -> u64 {
    60
}

fn default_health_poll_interval_ms() -> u64 {
    2000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_max_provision_attempts() -> u32 {
    1
}

fn default_queue_entry_ttl_secs() -> u64 {
    900
}

fn default_specialist_domains() -> Vec<String> {
    ["Science", "Medicine", "Law", "Finance"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_research_timeout_ms() -> u64 {
    5_000
}

fn default_agent_host() -> String {
    "127.0.0.1".to_string()
}

fn default_agent_image() -> String {
    "ghcr.io/100monkeys-ai/synapse:latest".to_string()
}

fn default_health_monitor_interval_secs() -> u64 {
    30
}

fn default_health_probe_timeout_ms() -> u64 {
    2_000
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_region() -> String {
    synapse_sdk::template::FALLBACK_DOMAIN.to_string()
}

fn default_concept_complexity() -> f64 {
    0.5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9700
}

impl Default for SynapseConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "synapse-node".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: SynapseConfigSpec::default(),
        }
    }
}

impl SynapseConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. SYNAPSE_CONFIG_PATH environment variable
    /// 2. ./synapse-config.yaml (working directory)
    /// 3. ~/.synapse/config.yaml (user home)
    /// 4. /etc/synapse/config.yaml (system, Unix) or C:\ProgramData\Synapse\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./synapse-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".synapse").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/synapse/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Synapse\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Same as [`Self::apply_env_overrides`] with an injectable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let spec = &mut self.spec;
        override_value(&lookup, "SYNAPSE_HEBBIAN_DELTA_SUCCESS", &mut spec.hebbian.delta_success);
        override_value(&lookup, "SYNAPSE_HEBBIAN_DELTA_FAILURE", &mut spec.hebbian.delta_failure);
        override_value(&lookup, "SYNAPSE_HEBBIAN_DECAY_RATE", &mut spec.hebbian.decay_rate);
        override_value(
            &lookup,
            "SYNAPSE_HEBBIAN_DECAY_INTERVAL_SEC",
            &mut spec.hebbian.decay_interval_secs,
        );
        override_value(
            &lookup,
            "SYNAPSE_MAX_CONCURRENT_AGENTS",
            &mut spec.lifecycle.max_concurrent_agents,
        );
        override_value(&lookup, "SYNAPSE_IDLE_TIMEOUT_MIN", &mut spec.lifecycle.idle_timeout_min);
        override_value(&lookup, "SYNAPSE_MAX_AGE_HOURS", &mut spec.lifecycle.max_age_hours);
        override_value(&lookup, "SYNAPSE_PORT_RANGE_START", &mut spec.lifecycle.port_range_start);
        override_value(&lookup, "SYNAPSE_PORT_RANGE_END", &mut spec.lifecycle.port_range_end);
        override_value(
            &lookup,
            "SYNAPSE_MAX_AGENTS_PER_QUERY",
            &mut spec.discovery.max_agents_per_query,
        );
        override_option(&lookup, "SYNAPSE_AGENT_CPU_LIMIT", &mut spec.runtime.agent_cpu_limit);
        override_option(&lookup, "SYNAPSE_AGENT_MEMORY_LIMIT", &mut spec.runtime.agent_memory_limit);
        override_value(&lookup, "SYNAPSE_RUNTIME_ISOLATION", &mut spec.runtime.isolation);
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        self.spec
            .hebbian
            .validate()
            .map_err(|e| anyhow::anyhow!("spec.{}", e))?;

        let lifecycle = &self.spec.lifecycle;
        if lifecycle.port_range_start > lifecycle.port_range_end {
            anyhow::bail!(
                "spec.lifecycle.port_range_start ({}) must not exceed port_range_end ({})",
                lifecycle.port_range_start,
                lifecycle.port_range_end
            );
        }
        if lifecycle.port_range_start == 0 {
            anyhow::bail!("spec.lifecycle.port_range_start must be greater than 0");
        }
        if lifecycle.max_concurrent_agents == 0 {
            anyhow::bail!("spec.lifecycle.max_concurrent_agents must be greater than 0");
        }
        if lifecycle.max_provision_attempts == 0 {
            anyhow::bail!("spec.lifecycle.max_provision_attempts must be at least 1");
        }
        if lifecycle.health_check_timeout_secs == 0 {
            anyhow::bail!("spec.lifecycle.health_check_timeout_secs must be greater than 0");
        }

        if self.spec.discovery.max_agents_per_query == 0 {
            anyhow::bail!("spec.discovery.max_agents_per_query must be greater than 0");
        }
        if self.spec.network.max_parallel_tasks == 0 {
            anyhow::bail!("spec.network.max_parallel_tasks must be greater than 0");
        }

        let mut seen = std::collections::HashSet::new();
        for agent in &self.spec.agents {
            if agent.id.is_empty() {
                anyhow::bail!("Static agent id cannot be empty");
            }
            if !seen.insert(agent.id.as_str()) {
                anyhow::bail!("Duplicate static agent id: {}", agent.id);
            }
            if agent.endpoint.is_empty() {
                anyhow::bail!("Static agent endpoint cannot be empty for: {}", agent.id);
            }
            if agent.concepts.is_empty() {
                anyhow::bail!("Static agent must handle at least one concept: {}", agent.id);
            }
        }

        Ok(())
    }
}

fn override_value<T, F>(lookup: &F, key: &str, target: &mut T)
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => {
                tracing::info!("Environment override: {}={}", key, raw.trim());
                *target = value;
            }
            Err(_) => {
                tracing::warn!("Invalid value for {}: '{}'. Ignoring.", key, raw);
            }
        }
    }
}

fn override_option<T, F>(lookup: &F, key: &str, target: &mut Option<T>)
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => {
                tracing::info!("Environment override: {}={}", key, raw.trim());
                *target = Some(value);
            }
            Err(_) => {
                tracing::warn!("Invalid value for {}: '{}'. Ignoring.", key, raw);
            }
        }
    }
}
