// Execution dispatcher
//
// Selects the node that last built the project, resolves every path the
// check needs as seen from that node, packages the self-contained command
// and sends it over the node's channel. The reply is the only thing that
// comes back.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, instrument};

use crate::command::{DependencyCheckCommand, UpdateResult};
use crate::dispatch::context::{self, ExecutionContext};
use crate::dispatch::{
    NodeRegistry, BUILD_DESCRIPTOR_FILE, CONTROLLER_PLUGIN_DIR, HELPER_BIN, ISOLATED_CACHE_DIR,
};
use crate::errors::{ChannelError, DispatchError};
use crate::models::ProjectHandle;
use crate::probe;

pub struct ExecutionDispatcher {
    registry: Arc<NodeRegistry>,
    /// Node-wide cache used when the probe does not request isolation
    shared_cache_dir: PathBuf,
    /// Upper bound on one remote call; a hung node costs one tick, not the
    /// scheduler
    call_timeout: Duration,
}

impl ExecutionDispatcher {
    pub fn new(
        registry: Arc<NodeRegistry>,
        shared_cache_dir: PathBuf,
        call_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            shared_cache_dir,
            call_timeout,
        }
    }

    /// Run the freshness check for `project` on its last-build node.
    ///
    /// `Ok(None)` means there was no node to run on — the project has never
    /// been built, which is not an error. Resolution and transport failures
    /// surface as `Err` for the trigger to degrade.
    #[instrument(skip(self, project), fields(project = %project.name()))]
    pub async fn dispatch(
        &self,
        project: &dyn ProjectHandle,
        check_plugin_deps: bool,
    ) -> Result<Option<UpdateResult>, DispatchError> {
        let Some(node_name) = project.last_built_on() else {
            info!("no previous build recorded, nothing to check yet");
            return Ok(None);
        };

        let entry = self
            .registry
            .get(&node_name)
            .ok_or(DispatchError::UnknownNode(node_name))?;
        let node = &entry.node;
        let on_controller = node.is_controller();

        let helper_path = if on_controller {
            node.resolve_path([CONTROLLER_PLUGIN_DIR, HELPER_BIN])
        } else {
            node.resolve_path([HELPER_BIN])
        };

        let workspace = project
            .workspace()
            .ok_or_else(|| DispatchError::MissingWorkspace(project.name().to_string()))?;
        let module_root = project.module_root(&workspace);
        let build_descriptor = module_root.join(BUILD_DESCRIPTOR_FILE);

        let cache_dir = if probe::uses_isolated_cache(project) {
            workspace.join(ISOLATED_CACHE_DIR)
        } else {
            self.shared_cache_dir.clone()
        };

        let command = DependencyCheckCommand {
            helper_path: helper_path.display().to_string(),
            build_descriptor: build_descriptor.display().to_string(),
            cache_dir: cache_dir.display().to_string(),
            check_plugin_deps,
            workspace: workspace.display().to_string(),
            on_controller,
        };

        // Self-dispatch resolves helper code under the controller's plugin
        // area; the context is scoped to this call and restored even when
        // the channel fails.
        let execution_context = on_controller.then(|| ExecutionContext {
            helper_root: node.resolve_path([CONTROLLER_PLUGIN_DIR]),
        });

        info!(node = %node.name, "dispatching dependency check");
        let result = {
            let _scope = context::scope(execution_context);
            timeout(self.call_timeout, entry.channel.call(command))
                .await
                .map_err(|_| ChannelError::Timeout(self.call_timeout.as_secs()))?
        }?;

        info!(
            node = %node.name,
            updated = result.updated.len(),
            "dependency check finished"
        );
        Ok(Some(result))
    }
}
