//! Registry of managed device nodes, keyed by device id.
//!
//! Iteration follows id order so poll ticks are deterministic. Each node sits
//! behind its own mutex: two refreshes or commands for the same device never
//! overlap, while different devices stay independent.

use crate::node::DeviceNode;
use log::info;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared handle to a registered node.
pub type SharedNode = Arc<Mutex<DeviceNode>>;

#[derive(Default)]
pub struct Registry {
    nodes: RwLock<BTreeMap<String, SharedNode>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the node built by `make` unless `id` is already registered.
    /// Returns whether a node was inserted.
    pub async fn add_if_absent(&self, id: &str, make: impl FnOnce() -> DeviceNode) -> bool {
        let mut nodes = self.nodes.write().await;
        if nodes.contains_key(id) {
            return false;
        }
        nodes.insert(id.to_string(), Arc::new(Mutex::new(make())));
        info!("Device {} added to registry", id);
        true
    }

    pub async fn get(&self, id: &str) -> Option<SharedNode> {
        self.nodes.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }

    pub async fn ids(&self) -> Vec<String> {
        self.nodes.read().await.keys().cloned().collect()
    }

    /// Ordered copy of the current membership. The map lock is released
    /// before the caller touches any node.
    pub async fn snapshot(&self) -> Vec<(String, SharedNode)> {
        self.nodes
            .read()
            .await
            .iter()
            .map(|(id, node)| (id.clone(), node.clone()))
            .collect()
    }
}
