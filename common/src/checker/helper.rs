// Helper-process checker
//
// The dependency-graph walk itself lives in a standalone helper executable
// deployed next to the node installation. The checker runs it with the
// command's paths and flags and reads the JSON report from stdout, so the
// resolution logic stays out of this process entirely.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::checker::UpdateChecker;
use crate::command::{DependencyCheckCommand, UpdateResult};
use crate::dispatch::context;
use crate::errors::CheckError;

pub struct HelperProcessChecker;

impl HelperProcessChecker {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the helper executable. Absolute paths are taken as-is; a
    /// relative path is resolved against the ambient execution context's
    /// helper root, which the dispatcher installs for in-process checks.
    fn resolve_helper(&self, helper_path: &str) -> Result<PathBuf, CheckError> {
        let path = Path::new(helper_path);
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        match context::current() {
            Some(ctx) => Ok(ctx.helper_root.join(path)),
            None => Err(CheckError::HelperLaunchFailed {
                helper: helper_path.to_string(),
                reason: "relative helper path with no execution context installed".to_string(),
            }),
        }
    }
}

impl Default for HelperProcessChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpdateChecker for HelperProcessChecker {
    #[instrument(skip(self, command), fields(descriptor = %command.build_descriptor))]
    async fn check(&self, command: &DependencyCheckCommand) -> Result<UpdateResult, CheckError> {
        tokio::fs::metadata(&command.build_descriptor)
            .await
            .map_err(|e| {
                CheckError::UnreadableDescriptor(format!("{}: {}", command.build_descriptor, e))
            })?;

        let helper = self.resolve_helper(&command.helper_path)?;
        debug!(helper = %helper.display(), "launching dependency check helper");

        let mut invocation = Command::new(&helper);
        invocation
            .arg("--descriptor")
            .arg(&command.build_descriptor)
            .arg("--cache-dir")
            .arg(&command.cache_dir)
            .arg("--workspace")
            .arg(&command.workspace);
        if command.check_plugin_deps {
            invocation.arg("--check-plugin-deps");
        }

        let output = invocation
            .output()
            .await
            .map_err(|e| CheckError::HelperLaunchFailed {
                helper: helper.display().to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CheckError::HelperFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| CheckError::MalformedReport(e.to_string()))
    }
}
