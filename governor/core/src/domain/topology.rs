// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A cloud resource in the dependency graph.
///
/// Relationship fields are directional:
/// - `dependencies` — resources the target relies on (upstream)
/// - `dependents` — resources that rely on the target (downstream)
/// - `governs` — resources controlled by the target (e.g. NSG → VMs)
/// - `services_hosted` — workloads running on the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub dependents: Vec<String>,
    #[serde(default)]
    pub governs: Vec<String>,
    #[serde(default)]
    pub services_hosted: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Resource {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Resource tagged `criticality: critical`.
    pub fn is_critical(&self) -> bool {
        self.tag("criticality") == Some("critical")
    }

    /// Environment tag marks the resource as production.
    pub fn is_production(&self) -> bool {
        matches!(self.tag("environment"), Some("production") | Some("prod"))
    }
}

/// Explicit directed edge not reflected in per-resource fields.
///
/// Catches relationships the per-object lists miss, including cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
}

/// The full topology document as persisted (`topology.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyDocument {
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub dependency_edges: Vec<DependencyEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_defaults() {
        let json = r#"{"name": "vm-23", "type": "Microsoft.Compute/virtualMachines"}"#;
        let r: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(r.name, "vm-23");
        assert!(r.dependents.is_empty());
        assert!(r.monthly_cost.is_none());
        assert!(!r.is_critical());
    }

    #[test]
    fn test_criticality_and_environment_tags() {
        let json = r#"{
            "name": "sql-prod",
            "type": "Microsoft.Sql/servers",
            "tags": {"criticality": "critical", "environment": "prod"}
        }"#;
        let r: Resource = serde_json::from_str(json).unwrap();
        assert!(r.is_critical());
        assert!(r.is_production());
    }
}
