// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::domain::error::{ConfigError, StoreError};
use crate::domain::policy::Policy;

/// Serves the governance policy set.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn policies(&self) -> Result<Arc<Vec<Policy>>, StoreError>;
}

/// File-backed policy store (mock mode).
///
/// Every policy is parsed into its typed predicate at load time; a policy
/// that cannot be parsed aborts startup rather than silently not firing.
#[derive(Debug)]
pub struct JsonPolicyStore {
    path: PathBuf,
    current: RwLock<Arc<Vec<Policy>>>,
}

impl JsonPolicyStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let policies = Self::read_policies(&path)?;
        info!(
            policies = policies.len(),
            path = %path.display(),
            "policy store loaded"
        );
        Ok(Self {
            path,
            current: RwLock::new(Arc::new(policies)),
        })
    }

    pub fn from_policies(policies: Vec<Policy>) -> Self {
        Self {
            path: PathBuf::new(),
            current: RwLock::new(Arc::new(policies)),
        }
    }

    pub fn reload(&self) -> Result<(), ConfigError> {
        let policies = Self::read_policies(&self.path)?;
        *self.current.write() = Arc::new(policies);
        Ok(())
    }

    fn read_policies(path: &Path) -> Result<Vec<Policy>, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::DataFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let values: Vec<serde_json::Value> =
            serde_json::from_str(&raw).map_err(|e| ConfigError::DataFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut policies = Vec::with_capacity(values.len());
        for value in values {
            let policy_id = value
                .get("policy_id")
                .and_then(|v| v.as_str())
                .unwrap_or("<missing policy_id>")
                .to_string();
            let policy: Policy =
                serde_json::from_value(value).map_err(|e| ConfigError::BadPolicy {
                    policy_id: policy_id.clone(),
                    reason: e.to_string(),
                })?;
            policies.push(policy);
        }
        Ok(policies)
    }
}

#[async_trait]
impl PolicyStore for JsonPolicyStore {
    async fn policies(&self) -> Result<Arc<Vec<Policy>>, StoreError> {
        Ok(self.current.read().clone())
    }
}
