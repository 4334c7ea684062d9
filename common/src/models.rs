use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::ProbeError;

// ============================================================================
// Build Models
// ============================================================================

/// Record of a completed build, as reported by the CI system that owns the
/// project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    /// Build number assigned by the CI system
    pub number: u32,
    /// Name of the node that ran the build
    pub built_on: String,
    /// Completion time
    pub finished_at: DateTime<Utc>,
}

/// A single step of a freestyle build, in configured order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildStep {
    /// Arbitrary shell step; carries no dependency configuration
    Shell { command: String },
    /// Dependency resolution step. `use_isolated_cache` requests a private
    /// per-workspace cache instead of the node-wide shared one.
    DependencyResolve { use_isolated_cache: bool },
}

// ============================================================================
// Project Models
// ============================================================================

/// Optional capability: a project kind that can answer whether its builds
/// resolve dependencies into an isolated, per-workspace cache.
///
/// Project kinds outside this crate advertise the capability through
/// [`ProjectHandle::isolated_cache_capability`]; absence means "no".
pub trait SupportsIsolatedCache {
    fn uses_isolated_cache(&self) -> Result<bool, ProbeError>;
}

/// A buildable project as seen by the trigger.
///
/// Project kinds are heterogeneous and share no static contract beyond this
/// trait; `as_any` supports type-checked downcasts for kinds this crate
/// knows statically.
pub trait ProjectHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Node that produced the last build, if any build has happened yet.
    /// A project that was never built has no execution target.
    fn last_built_on(&self) -> Option<String>;

    /// Absolute workspace path on the last-build node
    fn workspace(&self) -> Option<PathBuf>;

    /// Source-control module root, resolved under the given workspace
    fn module_root(&self, workspace: &Path) -> PathBuf;

    fn last_build(&self) -> Option<BuildRecord>;

    fn as_any(&self) -> &dyn Any;

    /// Capability query for kinds not statically known to this crate.
    fn isolated_cache_capability(&self) -> Option<&dyn SupportsIsolatedCache> {
        None
    }
}

/// The statically-known project kind: a freestyle build with an ordered list
/// of embedded build steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreestyleProject {
    pub name: String,
    /// Node holding the workspace checkout, i.e. where the last build ran
    pub assigned_node: Option<String>,
    pub workspace: Option<PathBuf>,
    /// Module root relative to the workspace; empty means the workspace root
    #[serde(default)]
    pub module_root: PathBuf,
    #[serde(default)]
    pub steps: Vec<BuildStep>,
    pub last_build: Option<BuildRecord>,
}

impl ProjectHandle for FreestyleProject {
    fn name(&self) -> &str {
        &self.name
    }

    fn last_built_on(&self) -> Option<String> {
        self.last_build
            .as_ref()
            .map(|b| b.built_on.clone())
            .or_else(|| self.assigned_node.clone())
    }

    fn workspace(&self) -> Option<PathBuf> {
        self.workspace.clone()
    }

    fn module_root(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.module_root)
    }

    fn last_build(&self) -> Option<BuildRecord> {
        self.last_build.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Node Models
// ============================================================================

/// Role of a node in the installation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// The controller process itself
    Controller,
    /// A remote build agent
    Agent,
}

/// An execution target: the controller or a distinct build agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    /// Root of the node's filesystem area, as seen from the node itself
    pub root_path: PathBuf,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_controller(&self) -> bool {
        self.kind == NodeKind::Controller
    }

    /// Join path segments under the node root
    pub fn resolve_path<I, S>(&self, segments: I) -> PathBuf
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        let mut path = self.root_path.clone();
        for segment in segments {
            path.push(segment.as_ref());
        }
        path
    }
}

// ============================================================================
// Cause Models
// ============================================================================

/// Causal annotation attached to a triggered build: which artifacts were
/// found newer and fetched. Two causes are equal iff they name the same
/// artifacts in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCause {
    pub updated_artifacts: Vec<String>,
}

impl UpdateCause {
    pub fn new(updated_artifacts: Vec<String>) -> Self {
        Self { updated_artifacts }
    }

    pub fn short_description(&self) -> String {
        if self.updated_artifacts.is_empty() {
            return "SNAPSHOT dependency update".to_string();
        }
        format!(
            "SNAPSHOT dependency update: {}",
            self.updated_artifacts.join(", ")
        )
    }
}

impl fmt::Display for UpdateCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freestyle(steps: Vec<BuildStep>) -> FreestyleProject {
        FreestyleProject {
            name: "app".to_string(),
            assigned_node: Some("worker-1".to_string()),
            workspace: Some(PathBuf::from("/var/build/app")),
            module_root: PathBuf::new(),
            steps,
            last_build: Some(BuildRecord {
                number: 17,
                built_on: "worker-1".to_string(),
                finished_at: Utc::now(),
            }),
        }
    }

    #[test]
    fn test_last_built_on_prefers_build_record() {
        let mut project = freestyle(vec![]);
        project.assigned_node = Some("worker-2".to_string());
        assert_eq!(project.last_built_on().as_deref(), Some("worker-1"));
    }

    #[test]
    fn test_module_root_joins_workspace() {
        let mut project = freestyle(vec![]);
        project.module_root = PathBuf::from("services/core");
        let root = project.module_root(Path::new("/var/build/app"));
        assert_eq!(root, PathBuf::from("/var/build/app/services/core"));
    }

    #[test]
    fn test_node_resolve_path() {
        let node = Node {
            name: "worker-1".to_string(),
            root_path: PathBuf::from("/opt/agent"),
            kind: NodeKind::Agent,
        };
        let path = node.resolve_path(["plugins", "helper"]);
        assert_eq!(path, PathBuf::from("/opt/agent/plugins/helper"));
    }

    #[test]
    fn test_cause_description_lists_artifacts() {
        let cause = UpdateCause::new(vec![
            "lib-core-1.1-SNAPSHOT.jar".to_string(),
            "lib-util-0.9-SNAPSHOT.jar".to_string(),
        ]);
        let description = cause.short_description();
        assert!(description.contains("lib-core-1.1-SNAPSHOT.jar"));
        assert!(description.contains("lib-util-0.9-SNAPSHOT.jar"));
    }

    #[test]
    fn test_cause_equality_compares_artifact_lists() {
        let a = UpdateCause::new(vec!["x.jar".to_string()]);
        let b = UpdateCause::new(vec!["x.jar".to_string()]);
        let c = UpdateCause::new(vec!["y.jar".to_string()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_build_step_serde_tagged_form() {
        let step = BuildStep::DependencyResolve {
            use_isolated_cache: true,
        };
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("dependency_resolve"));
        let back: BuildStep = serde_json::from_str(&json).unwrap();
        assert_eq!(back, step);
    }
}
