// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Shared fixtures for the integration suites: a small production-like
// topology, the governance policy set, and an incident history that the
// end-to-end scenarios exercise.

use chrono::{TimeZone, Utc};
use std::path::Path;

use sentinel_core::domain::action::{ActionTarget, ActionType, ProposedAction};
use sentinel_core::infrastructure::config::Settings;
use sentinel_core::runtime::Engine;

pub fn topology_json() -> serde_json::Value {
    serde_json::json!({
        "resources": [
            {
                "name": "vm-dr-01",
                "type": "Microsoft.Compute/virtualMachines",
                "tags": {"disaster-recovery": "true", "environment": "production"},
                "dependents": ["dr-failover-service", "backup-coordinator"],
                "monthly_cost": 15.0,
                "location": "eastus"
            },
            {
                "name": "vm-web-01",
                "type": "Microsoft.Compute/virtualMachines",
                "tags": {"tier": "web"},
                "dependents": ["lb-web", "app-gateway"],
                "monthly_cost": 30.0,
                "location": "eastus"
            },
            {
                "name": "vm-api-01",
                "type": "Microsoft.Compute/virtualMachines",
                "tags": {"criticality": "critical", "environment": "production"},
                "location": "eastus"
            },
            {
                "name": "nsg-east-prod",
                "type": "Microsoft.Network/networkSecurityGroups",
                "tags": {"environment": "production"},
                "governs": ["vm-web-01", "vm-api-01"],
                "location": "eastus"
            }
        ],
        "dependency_edges": [
            {"from": "vm-web-01", "to": "vm-api-01"}
        ]
    })
}

pub fn policies_json() -> serde_json::Value {
    serde_json::json!([
        {
            "policy_id": "POL-DR-001",
            "severity": "critical",
            "description": "Disaster-recovery resources must never be deleted or scaled down",
            "predicate": {
                "kind": "tag_match",
                "key": "disaster-recovery",
                "value": "true",
                "actions": ["delete_resource", "scale_down"]
            }
        },
        {
            "policy_id": "POL-NSG-001",
            "severity": "high",
            "description": "Network security group changes require review",
            "predicate": {"kind": "action_in", "actions": ["modify_nsg"]}
        },
        {
            "policy_id": "POL-ENV-001",
            "severity": "medium",
            "description": "Production resources require change review",
            "predicate": {"kind": "env_requires_review"}
        },
        {
            "policy_id": "POL-DEP-001",
            "severity": "high",
            "description": "Destructive actions on resources with two or more dependents",
            "predicate": {"kind": "min_dependents", "min": 2}
        },
        {
            "policy_id": "POL-WIN-001",
            "severity": "medium",
            "description": "Weekend change freeze",
            "predicate": {
                "kind": "time_window",
                "day_start": "Friday", "day_end": "Monday",
                "time_start": "17:00", "time_end": "08:00"
            }
        }
    ])
}

pub fn incidents_json() -> serde_json::Value {
    serde_json::json!([
        {
            "incident_id": "INC-2024-001",
            "title": "DR virtual machine deleted during cost sweep",
            "summary": "vm-dr-01 was deleted by an automated cleanup; failover to the DR site failed for four hours",
            "action_type": "delete_resource",
            "resource_type": "Microsoft.Compute/virtualMachines",
            "resource_name": "vm-dr-01",
            "tags": ["deletion", "disaster-recovery"],
            "severity": "critical",
            "outcome_text": "Four hour outage, manual restore from backup",
            "recommended_procedure": "Verify DR pairing and failover coverage before any deletion"
        },
        {
            "incident_id": "INC-2024-002",
            "title": "NSG rule change cut production traffic",
            "summary": "a port rule change on the east NSG blocked health probes and drained the pool",
            "action_type": "modify_nsg",
            "resource_type": "Microsoft.Network/networkSecurityGroups",
            "tags": ["nsg-change"],
            "severity": "high",
            "outcome_text": "Thirty minutes of degraded traffic",
            "recommended_procedure": "Stage NSG changes against the canary pool first"
        },
        {
            "incident_id": "INC-2024-003",
            "title": "Scale-down starved the API tier",
            "summary": "scaling down the api pool during peak hours caused a latency spike",
            "action_type": "scale_down",
            "resource_type": "Microsoft.Compute/virtualMachines",
            "tags": ["scale-down"],
            "severity": "medium",
            "outcome_text": "Latency recovered after scale-out",
            "recommended_procedure": null
        }
    ])
}

/// Write the three seed files into `dir`.
pub fn write_seed_data(dir: &Path, incidents: serde_json::Value) {
    std::fs::write(
        dir.join("topology.json"),
        serde_json::to_string_pretty(&topology_json()).unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.join("policies.json"),
        serde_json::to_string_pretty(&policies_json()).unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.join("incidents.json"),
        serde_json::to_string_pretty(&incidents).unwrap(),
    )
    .unwrap();
}

/// Build a mock-mode engine rooted at a fresh temp dir.
pub async fn engine_with_incidents(incidents: serde_json::Value) -> (tempfile::TempDir, Engine) {
    let dir = tempfile::tempdir().unwrap();
    write_seed_data(dir.path(), incidents);
    let settings = Settings {
        data_dir: dir.path().to_path_buf(),
        ..Settings::default()
    };
    let engine = Engine::build(settings).await.unwrap();
    (dir, engine)
}

pub async fn engine() -> (tempfile::TempDir, Engine) {
    engine_with_incidents(incidents_json()).await
}

/// An action pinned to a mid-week timestamp so the weekend change-freeze
/// window never interferes with score expectations.
pub fn action(action_type: ActionType, resource_id: &str, resource_type: &str) -> ProposedAction {
    let mut action = ProposedAction::new(action_type, ActionTarget::new(resource_id, resource_type));
    // Wednesday, 12:00 UTC.
    action.timestamp = Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap();
    action
}
