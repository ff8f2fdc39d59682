//! Node configuration

use ordo_resource::TreeSpec;
use ordo_store::StorageConfig;
use std::time::Duration;

/// Configuration for an executing node
#[derive(Clone, Default)]
pub struct NodeConfig {
    /// Persistent store settings, used by [`Node::open`](crate::Node::open)
    pub storage: StorageConfig,

    /// Shape of the commitment tree
    pub tree: TreeSpec,

    /// Upper bound on how long a read waits for its turn
    pub read_timeout: Option<Duration>,
}

impl NodeConfig {
    pub fn new(storage: StorageConfig) -> Self {
        Self {
            storage,
            tree: TreeSpec::default(),
            read_timeout: None,
        }
    }

    /// Set the commitment tree shape
    pub fn with_tree(mut self, tree: TreeSpec) -> Self {
        self.tree = tree;
        self
    }

    /// Set the read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}
