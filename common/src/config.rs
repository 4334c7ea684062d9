// Configuration management with layered configuration (file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::{BuildRecord, BuildStep, FreestyleProject, NodeKind};
use crate::schedule;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub nats: NatsConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
    /// Present only on worker agents
    #[serde(default)]
    pub worker: Option<WorkerConfig>,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Node name this agent serves checks for
    pub node_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Node-wide shared dependency cache, used unless a project asks for an
    /// isolated one
    pub shared_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on one remote check call. The original design blocked
    /// forever on an unresponsive node; see DESIGN.md for why this bound
    /// exists.
    pub timeout_seconds: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    pub root_path: PathBuf,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    /// Cron expression (with seconds field) for the check schedule
    pub cron: String,
    #[serde(default)]
    pub timezone: Option<String>,
    /// Also check plugin-type dependencies
    #[serde(default)]
    pub check_plugin_deps: bool,
    /// Node holding the project's workspace checkout
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub workspace: Option<PathBuf>,
    /// Module root relative to the workspace
    #[serde(default)]
    pub module_root: Option<PathBuf>,
    /// Resolve into a private per-workspace cache
    #[serde(default)]
    pub use_isolated_cache: bool,
    /// Last build recorded by the CI system owning this project
    #[serde(default)]
    pub last_build: Option<LastBuildConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastBuildConfig {
    pub number: u32,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl ProjectConfig {
    /// Materialize the freestyle project this configuration describes
    pub fn to_project(&self) -> FreestyleProject {
        let steps = if self.use_isolated_cache {
            vec![BuildStep::DependencyResolve {
                use_isolated_cache: true,
            }]
        } else {
            vec![]
        };

        let last_build = match (&self.last_build, &self.node) {
            (Some(build), Some(node)) => Some(BuildRecord {
                number: build.number,
                built_on: node.clone(),
                finished_at: build.finished_at,
            }),
            _ => None,
        };

        FreestyleProject {
            name: self.name.clone(),
            assigned_node: self.node.clone(),
            workspace: self.workspace.clone(),
            module_root: self.module_root.clone().unwrap_or_default(),
            steps,
            last_build,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.nats.url.is_empty() {
            return Err("NATS URL cannot be empty".to_string());
        }
        if self.cache.shared_dir.as_os_str().is_empty() {
            return Err("Shared cache directory cannot be empty".to_string());
        }
        if self.dispatch.timeout_seconds == 0 {
            return Err("Dispatch timeout must be greater than 0".to_string());
        }

        if self.nodes.is_empty() {
            return Err("At least one node must be configured".to_string());
        }
        let mut names = std::collections::HashSet::new();
        for node in &self.nodes {
            if !names.insert(node.name.as_str()) {
                return Err(format!("Duplicate node name: {}", node.name));
            }
        }
        let controllers = self
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Controller)
            .count();
        if controllers > 1 {
            return Err("At most one controller node may be configured".to_string());
        }

        if let Some(worker) = &self.worker {
            if worker.node_name.is_empty() {
                return Err("Worker node name cannot be empty".to_string());
            }
        }

        for project in &self.projects {
            schedule::parse_cron_expression(&project.cron)
                .map_err(|e| format!("Project '{}': {}", project.name, e))?;
            if let Some(tz) = &project.timezone {
                schedule::parse_timezone(tz)
                    .map_err(|e| format!("Project '{}': {}", project.name, e))?;
            }
            if let Some(node) = &project.node {
                if !self.nodes.iter().any(|n| &n.name == node) {
                    return Err(format!(
                        "Project '{}' references unknown node '{}'",
                        project.name, node
                    ));
                }
            }
            if project.last_build.is_some() && project.node.is_none() {
                return Err(format!(
                    "Project '{}' records a last build but no node",
                    project.name
                ));
            }
        }

        Ok(())
    }
}
