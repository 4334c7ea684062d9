// Dispatch: run a dependency check on the node that last built a project

pub mod channel;
pub mod context;
pub mod dispatcher;

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::Node;

pub use channel::{check_subject, CommandChannel, LocalChannel, NatsChannel};
pub use context::ExecutionContext;
pub use dispatcher::ExecutionDispatcher;

/// Helper executable name, identical on every node
pub const HELPER_BIN: &str = "snapshot-check-helper";

/// On the controller the helper ships inside the plugin area instead of the
/// node root
pub const CONTROLLER_PLUGIN_DIR: &str = "plugins/dependency-update-trigger";

/// Build descriptor file name inside the module root
pub const BUILD_DESCRIPTOR_FILE: &str = "pom.xml";

/// Isolated cache directory name inside a project workspace
pub const ISOLATED_CACHE_DIR: &str = ".repository";

/// A registered execution target: the node description plus the channel
/// that reaches it
pub struct NodeEntry {
    pub node: Node,
    pub channel: Arc<dyn CommandChannel>,
}

/// All nodes known to this controller, by name
#[derive(Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, NodeEntry>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, node: Node, channel: Arc<dyn CommandChannel>) {
        self.nodes.insert(node.name.clone(), NodeEntry { node, channel });
    }

    pub fn get(&self, name: &str) -> Option<&NodeEntry> {
        self.nodes.get(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
