// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Agent card published by the engine at `/.well-known/agent-card.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub version: String,
    pub url: String,
    pub capabilities: AgentCapabilities,
    pub skills: Vec<AgentSkill>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// A proposed infrastructure action, as the engine expects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub agent_id: String,
    pub action_type: String,
    pub target: ActionTarget,
    #[serde(default)]
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected_savings_monthly: Option<f64>,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub metadata: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionTarget {
    pub resource_id: String,
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed_sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_monthly_cost: Option<f64>,
}

impl ActionRequest {
    pub fn new(
        agent_id: impl Into<String>,
        action_type: impl Into<String>,
        resource_id: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            action_type: action_type.into(),
            target: ActionTarget {
                resource_id: resource_id.into(),
                resource_type: resource_type.into(),
                current_sku: None,
                proposed_sku: None,
                current_monthly_cost: None,
            },
            reason: String::new(),
            urgency: None,
            projected_savings_monthly: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_monthly_cost(mut self, cost: f64) -> Self {
        self.target.current_monthly_cost = Some(cost);
        self
    }
}

/// The SRI breakdown inside a verdict.
#[derive(Debug, Clone, Deserialize)]
pub struct SriBreakdown {
    pub infrastructure: f64,
    pub policy: f64,
    pub historical: f64,
    pub cost: f64,
    pub composite: f64,
}

/// Governance verdict returned by the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct Verdict {
    pub action_id: String,
    pub decision: String,
    pub sri: SriBreakdown,
    pub reason: String,
    #[serde(default)]
    pub violations: Vec<String>,
}

/// Result of one governance task: the streamed progress plus the verdict.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub progress: Vec<String>,
    pub verdict: Verdict,
}

/// Compact verdict view from the dashboard listing endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionSummary {
    pub action_id: String,
    pub timestamp: String,
    pub decision: String,
    pub sri: SriBreakdown,
    pub resource_id: String,
    pub action_type: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub violations: Vec<String>,
}

/// Aggregated risk history for one resource.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskProfile {
    pub resource_id: String,
    pub total_evaluations: u64,
    pub approved: u64,
    pub escalated: u64,
    pub denied: u64,
    #[serde(default)]
    pub avg_composite: Option<f64>,
    #[serde(default)]
    pub max_composite: Option<f64>,
    #[serde(default)]
    pub top_violations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_request_serializes_engine_shape() {
        let request = ActionRequest::new(
            "cost-optimization-agent",
            "delete_resource",
            "vm-dr-01",
            "Microsoft.Compute/virtualMachines",
        )
        .with_reason("idle 30d");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["action_type"], "delete_resource");
        assert_eq!(json["target"]["resource_id"], "vm-dr-01");
        assert!(json.get("urgency").is_none());
    }

    #[test]
    fn test_verdict_deserializes() {
        let verdict: Verdict = serde_json::from_value(serde_json::json!({
            "action_id": "2c4c0a2e-29c5-44a5-9c1a-3c6f8c3a2a10",
            "decision": "denied",
            "sri": {"infrastructure": 50.0, "policy": 100.0, "historical": 80.0,
                    "cost": 27.5, "composite": 70.5},
            "reason": "DENIED",
            "violations": ["POL-DR-001"]
        }))
        .unwrap();
        assert_eq!(verdict.decision, "denied");
        assert_eq!(verdict.sri.composite, 70.5);
    }
}
