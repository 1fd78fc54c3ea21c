// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::domain::error::{ConfigError, StoreError};
use crate::domain::topology::{DependencyEdge, Resource, TopologyDocument};

/// Immutable view of the resource dependency graph.
///
/// Built once per (re)load; evaluators holding an `Arc` keep a consistent
/// graph even while a reload swaps in a newer one.
#[derive(Debug, Default)]
pub struct TopologySnapshot {
    by_name: HashMap<String, Resource>,
    edges: Vec<DependencyEdge>,
}

impl TopologySnapshot {
    pub fn from_document(doc: TopologyDocument) -> Self {
        let by_name = doc
            .resources
            .into_iter()
            .map(|r| (r.name.clone(), r))
            .collect();
        Self {
            by_name,
            edges: doc.dependency_edges,
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Exact lookup by resource name.
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.by_name.get(name)
    }

    /// Lookup by full resource id or short name.
    ///
    /// Full provider paths (`/subscriptions/.../virtualMachines/vm-23`) are
    /// matched first on the whole string, then on the final `/` segment.
    pub fn find(&self, resource_id: &str) -> Option<&Resource> {
        if let Some(resource) = self.by_name.get(resource_id) {
            return Some(resource);
        }
        let name = resource_id.rsplit('/').next().unwrap_or(resource_id);
        self.by_name.get(name)
    }

    /// Explicit directed edges touching `name`, in either direction.
    pub fn edges_touching<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DependencyEdge> {
        self.edges
            .iter()
            .filter(move |e| e.from == name || e.to == name)
    }
}

/// Serves resource dependency graph snapshots to the evaluators.
#[async_trait]
pub trait TopologyStore: Send + Sync {
    async fn snapshot(&self) -> Result<Arc<TopologySnapshot>, StoreError>;
}

/// File-backed topology store (mock mode) with copy-on-write hot reload.
pub struct JsonTopologyStore {
    path: PathBuf,
    current: RwLock<Arc<TopologySnapshot>>,
}

impl JsonTopologyStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = Self::read_snapshot(&path)?;
        info!(
            resources = snapshot.len(),
            path = %path.display(),
            "topology store loaded"
        );
        Ok(Self {
            path,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Build a store directly from a document. Used by tests and embedders.
    pub fn from_document(doc: TopologyDocument) -> Self {
        Self {
            path: PathBuf::new(),
            current: RwLock::new(Arc::new(TopologySnapshot::from_document(doc))),
        }
    }

    /// Re-read the backing file and atomically swap the snapshot.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let snapshot = Self::read_snapshot(&self.path)?;
        *self.current.write() = Arc::new(snapshot);
        Ok(())
    }

    fn read_snapshot(path: &Path) -> Result<TopologySnapshot, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::DataFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let doc: TopologyDocument =
            serde_json::from_str(&raw).map_err(|e| ConfigError::DataFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(TopologySnapshot::from_document(doc))
    }
}

#[async_trait]
impl TopologyStore for JsonTopologyStore {
    async fn snapshot(&self) -> Result<Arc<TopologySnapshot>, StoreError> {
        Ok(self.current.read().clone())
    }
}
