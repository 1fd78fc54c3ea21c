// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Policy Evaluator — SRI:Policy
//!
//! Evaluates every loaded policy predicate against the action. Severity of
//! each fired policy contributes to the raw score:
//! `critical 100 · high 40 · medium 20 · low 10`, clamped to 100.
//!
//! `has_critical_violation` is true iff any fired predicate carries
//! severity `critical` — the decision engine denies such actions outright.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::application::evaluators::{EvaluatorError, RiskEvaluator};
use crate::domain::action::ProposedAction;
use crate::domain::events::SriDimension;
use crate::domain::policy::PolicySeverity;
use crate::domain::verdict::{clamp_score, PolicyResult, PolicyViolation};
use crate::infrastructure::stores::{PolicyStore, TopologyStore};

fn severity_weight(severity: PolicySeverity) -> f64 {
    match severity {
        PolicySeverity::Critical => 100.0,
        PolicySeverity::High => 40.0,
        PolicySeverity::Medium => 20.0,
        PolicySeverity::Low => 10.0,
    }
}

/// Computes SRI:Policy by matching each policy predicate.
pub struct PolicyComplianceEvaluator {
    policies: Arc<dyn PolicyStore>,
    topology: Arc<dyn TopologyStore>,
}

impl PolicyComplianceEvaluator {
    pub fn new(policies: Arc<dyn PolicyStore>, topology: Arc<dyn TopologyStore>) -> Self {
        Self { policies, topology }
    }

    fn reasoning(violations: &[PolicyViolation], total: usize, rationales: &[String]) -> String {
        if violations.is_empty() {
            return format!("All {total} policies passed; action is fully compliant.");
        }
        let mut text = format!(
            "Evaluated {total} policies, {} violation(s): ",
            violations.len()
        );
        let listed: Vec<String> = violations
            .iter()
            .map(|v| format!("[{}] {}", v.severity, v.policy_id))
            .collect();
        text.push_str(&listed.join(", "));
        text.push('.');
        if !rationales.is_empty() {
            text.push(' ');
            text.push_str(&rationales.join(" "));
        }
        text
    }
}

#[async_trait]
impl RiskEvaluator for PolicyComplianceEvaluator {
    type Output = PolicyResult;

    fn dimension(&self) -> SriDimension {
        SriDimension::Policy
    }

    async fn evaluate(&self, action: &ProposedAction) -> Result<PolicyResult, EvaluatorError> {
        let policies = self.policies.policies().await?;
        // Lookup failures downgrade to "no resource context" rather than
        // failing the dimension; tag-based predicates simply cannot fire.
        let snapshot = self.topology.snapshot().await.ok();
        let resource = snapshot
            .as_deref()
            .and_then(|s| s.find(&action.target.resource_id));

        let mut violations: Vec<PolicyViolation> = Vec::new();
        let mut rationales: Vec<String> = Vec::new();
        for policy in policies.iter() {
            if let Some(hit) = policy.predicate.evaluate(action, resource) {
                violations.push(PolicyViolation {
                    policy_id: policy.policy_id.clone(),
                    severity: policy.severity,
                    description: policy.description.clone(),
                });
                if let Some(rationale) = hit.rationale {
                    rationales.push(format!("{}: {rationale}.", policy.policy_id));
                }
            }
        }

        violations.sort_by(|a, b| {
            a.severity
                .rank()
                .cmp(&b.severity.rank())
                .then_with(|| a.policy_id.cmp(&b.policy_id))
        });

        let raw: f64 = violations
            .iter()
            .map(|v| severity_weight(v.severity))
            .sum();
        let score = clamp_score(raw);
        let has_critical = violations
            .iter()
            .any(|v| v.severity == PolicySeverity::Critical);

        debug!(
            action = %action.action_type,
            violations = violations.len(),
            score,
            has_critical,
            "policy compliance evaluated"
        );

        Ok(PolicyResult {
            reasoning: Self::reasoning(&violations, policies.len(), &rationales),
            score,
            violations,
            has_critical_violation: has_critical,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::{ActionTarget, ActionType};
    use crate::domain::policy::{Policy, PolicyPredicate};
    use crate::domain::topology::TopologyDocument;
    use crate::infrastructure::stores::{JsonPolicyStore, JsonTopologyStore};

    fn topology() -> Arc<dyn TopologyStore> {
        let doc: TopologyDocument = serde_json::from_value(serde_json::json!({
            "resources": [{
                "name": "vm-dr-01",
                "type": "Microsoft.Compute/virtualMachines",
                "tags": {"disaster-recovery": "true", "environment": "production"},
                "dependents": ["dr-failover-service", "backup-coordinator"]
            }],
            "dependency_edges": []
        }))
        .unwrap();
        Arc::new(JsonTopologyStore::from_document(doc))
    }

    fn policies() -> Vec<Policy> {
        vec![
            Policy {
                policy_id: "POL-DR-001".to_string(),
                severity: PolicySeverity::Critical,
                description: "Disaster-recovery resources must never be deleted".to_string(),
                predicate: PolicyPredicate::TagMatch {
                    key: "disaster-recovery".to_string(),
                    value: "true".to_string(),
                    actions: [ActionType::DeleteResource, ActionType::ScaleDown]
                        .into_iter()
                        .collect(),
                },
            },
            Policy {
                policy_id: "POL-ENV-001".to_string(),
                severity: PolicySeverity::Medium,
                description: "Production changes require review".to_string(),
                predicate: PolicyPredicate::EnvRequiresReview,
            },
            Policy {
                policy_id: "POL-DEP-001".to_string(),
                severity: PolicySeverity::High,
                description: "Destructive actions on shared resources".to_string(),
                predicate: PolicyPredicate::MinDependents { min: 2 },
            },
        ]
    }

    fn evaluator() -> PolicyComplianceEvaluator {
        PolicyComplianceEvaluator::new(
            Arc::new(JsonPolicyStore::from_policies(policies())),
            topology(),
        )
    }

    #[tokio::test]
    async fn test_critical_violation_sets_flag_and_score() {
        let action = ProposedAction::new(
            ActionType::DeleteResource,
            ActionTarget::new("vm-dr-01", "Microsoft.Compute/virtualMachines"),
        );
        let result = evaluator().evaluate(&action).await.unwrap();
        // critical 100 + high 40 + medium 20, clamped
        assert_eq!(result.score, 100.0);
        assert!(result.has_critical_violation);
        assert_eq!(result.violations.len(), 3);
    }

    #[tokio::test]
    async fn test_violations_ordered_by_severity_then_id() {
        let action = ProposedAction::new(
            ActionType::DeleteResource,
            ActionTarget::new("vm-dr-01", "Microsoft.Compute/virtualMachines"),
        );
        let result = evaluator().evaluate(&action).await.unwrap();
        let ids: Vec<&str> = result
            .violations
            .iter()
            .map(|v| v.policy_id.as_str())
            .collect();
        assert_eq!(ids, vec!["POL-DR-001", "POL-DEP-001", "POL-ENV-001"]);
    }

    #[tokio::test]
    async fn test_compliant_action_scores_zero() {
        let action = ProposedAction::new(
            ActionType::CreateResource,
            ActionTarget::new("vm-new", "Microsoft.Compute/virtualMachines"),
        );
        let result = evaluator().evaluate(&action).await.unwrap();
        assert_eq!(result.score, 0.0);
        assert!(result.violations.is_empty());
        assert!(!result.has_critical_violation);
        assert!(result.reasoning.contains("fully compliant"));
    }

    #[tokio::test]
    async fn test_non_destructive_production_action_fires_env_only() {
        let action = ProposedAction::new(
            ActionType::ScaleUp,
            ActionTarget::new("vm-dr-01", "Microsoft.Compute/virtualMachines"),
        );
        let result = evaluator().evaluate(&action).await.unwrap();
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].policy_id, "POL-ENV-001");
        assert_eq!(result.score, 20.0);
        assert!(!result.has_critical_violation);
    }
}
