// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Decision Engine
//!
//! Combines the four SRI dimension scores into the weighted composite and
//! applies the verdict rules, in order:
//!
//! 1. Critical policy violation → `denied`; the composite is floored above
//!    the human-review threshold so dashboards rank the verdict correctly.
//! 2. `composite ≤ auto_approve_threshold` → `approved`
//! 3. `composite ≤ human_review_threshold` → `escalated`
//! 4. Otherwise → `denied`
//!
//! Weights must sum to 1.0 ± 1e-9; that is validated at startup, so the
//! engine itself only trusts its inputs.

use chrono::Utc;
use tracing::info;

use crate::domain::action::ProposedAction;
use crate::domain::verdict::{
    clamp_score, BlastRadiusResult, Decision, EvaluatorResults, FinancialResult,
    GovernanceVerdict, HistoricalResult, PolicyResult, SriBreakdown, SriThresholds, SriWeights,
};

/// Aggregates evaluator results into a [`GovernanceVerdict`].
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    weights: SriWeights,
    thresholds: SriThresholds,
}

impl DecisionEngine {
    pub fn new(weights: SriWeights, thresholds: SriThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> SriThresholds {
        self.thresholds
    }

    /// Build the verdict for an action from the four evaluator results.
    ///
    /// `failure_notes` carries descriptions of absorbed evaluator failures;
    /// they are appended to the verdict reason so a partial loss of
    /// intelligence stays visible.
    pub fn decide(
        &self,
        action: &ProposedAction,
        blast_radius: BlastRadiusResult,
        policy: PolicyResult,
        historical: HistoricalResult,
        financial: FinancialResult,
        failure_notes: &[String],
    ) -> GovernanceVerdict {
        let weighted = blast_radius.score * self.weights.infrastructure
            + policy.score * self.weights.policy
            + historical.score * self.weights.historical
            + financial.score * self.weights.cost;
        let mut composite = clamp_score(weighted);

        let first_critical = policy
            .violations
            .iter()
            .find(|v| v.severity == crate::domain::policy::PolicySeverity::Critical)
            .map(|v| v.policy_id.clone());

        let decision = if policy.has_critical_violation {
            // The override outranks the numeric score; keep the composite
            // above the review threshold so ranking stays consistent.
            composite = composite.max(self.thresholds.human_review + 1.0);
            Decision::Denied
        } else if composite <= self.thresholds.auto_approve {
            Decision::Approved
        } else if composite <= self.thresholds.human_review {
            Decision::Escalated
        } else {
            Decision::Denied
        };

        let sri = SriBreakdown {
            infrastructure: blast_radius.score,
            policy: policy.score,
            historical: historical.score,
            cost: financial.score,
            composite,
        };

        let violations: Vec<String> = policy
            .violations
            .iter()
            .map(|v| v.policy_id.clone())
            .collect();

        let reason = self.reason_text(
            decision,
            &sri,
            first_critical.as_deref(),
            violations.first().map(String::as_str),
            failure_notes,
        );

        info!(
            action_id = %action.action_id,
            action = %action.action_type,
            composite,
            decision = %decision,
            "governance verdict"
        );

        GovernanceVerdict {
            action_id: action.action_id,
            decision,
            sri,
            weights: self.weights,
            thresholds: self.thresholds,
            reason,
            violations,
            sub_results: EvaluatorResults {
                blast_radius,
                policy,
                historical,
                financial,
            },
            timestamp: Utc::now(),
        }
    }

    fn reason_text(
        &self,
        decision: Decision,
        sri: &SriBreakdown,
        first_critical: Option<&str>,
        first_violation: Option<&str>,
        failure_notes: &[String],
    ) -> String {
        let dominant = dominant_dimension(sri);
        let mut reason = match (decision, first_critical) {
            (Decision::Denied, Some(policy_id)) => format!(
                "DENIED — critical policy violation {policy_id} blocks execution regardless of \
                 the composite score; SRI composite {:.1} (highest dimension: {dominant}).",
                sri.composite
            ),
            (Decision::Denied, None) => format!(
                "DENIED — SRI composite {:.1} exceeds the denial threshold of {:.0} \
                 (highest dimension: {dominant}).",
                sri.composite, self.thresholds.human_review
            ),
            (Decision::Escalated, _) => format!(
                "ESCALATED — SRI composite {:.1} falls in the human-review band \
                 {:.0}–{:.0} (highest dimension: {dominant}).",
                sri.composite, self.thresholds.auto_approve, self.thresholds.human_review
            ),
            (Decision::Approved, _) => format!(
                "APPROVED — SRI composite {:.1} is within the auto-approval threshold of \
                 {:.0} (highest dimension: {dominant}).",
                sri.composite, self.thresholds.auto_approve
            ),
        };

        if first_critical.is_none() {
            if let Some(violation) = first_violation {
                reason.push_str(&format!(" First policy violation: {violation}."));
            }
        }
        for note in failure_notes {
            reason.push_str(&format!(" {note}."));
        }
        reason
    }
}

fn dominant_dimension(sri: &SriBreakdown) -> &'static str {
    let dims = [
        ("infrastructure", sri.infrastructure),
        ("policy", sri.policy),
        ("historical", sri.historical),
        ("cost", sri.cost),
    ];
    dims.into_iter()
        .fold(("infrastructure", f64::MIN), |acc, d| {
            if d.1 > acc.1 {
                d
            } else {
                acc
            }
        })
        .0
}
