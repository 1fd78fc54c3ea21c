// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Governance Verdict Types
//!
//! Output model of the governance pipeline: the Sentinel Risk Index (SRI)
//! breakdown, the decision, and the four typed evaluator results that back it.
//!
//! ## Score semantics
//!
//! Every score is a float clamped to `[0, 100]`:
//! - `0–25`   — auto-approve band
//! - `26–60`  — human-review band (escalated)
//! - `61–100` — denied
//!
//! The composite is `clamp(Σ wᵢ · scoreᵢ, 0, 100)` unless a critical policy
//! violation forces `denied`, in which case the composite is floored above
//! the human-review threshold so dashboards rank it correctly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::action::ActionId;
use crate::domain::policy::PolicySeverity;

/// Clamp a raw score into the SRI range.
pub fn clamp_score(raw: f64) -> f64 {
    raw.clamp(0.0, 100.0)
}

/// Governance decision outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Escalated,
    Denied,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Escalated => "escalated",
            Decision::Denied => "denied",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentinel Risk Index — the four dimension scores plus the weighted composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SriBreakdown {
    pub infrastructure: f64,
    pub policy: f64,
    pub historical: f64,
    pub cost: f64,
    pub composite: f64,
}

/// Weight vector applied to the four dimensions. Must sum to 1.0 ± 1e-9.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SriWeights {
    pub infrastructure: f64,
    pub policy: f64,
    pub historical: f64,
    pub cost: f64,
}

impl SriWeights {
    pub fn sum(&self) -> f64 {
        self.infrastructure + self.policy + self.historical + self.cost
    }
}

impl Default for SriWeights {
    fn default() -> Self {
        Self {
            infrastructure: 0.30,
            policy: 0.25,
            historical: 0.25,
            cost: 0.20,
        }
    }
}

/// Decision thresholds actually applied to the composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SriThresholds {
    pub auto_approve: f64,
    pub human_review: f64,
}

impl Default for SriThresholds {
    fn default() -> Self {
        Self {
            auto_approve: 25.0,
            human_review: 60.0,
        }
    }
}

// ── Evaluator results ─────────────────────────────────────────────────────

/// Output of the Blast-Radius Evaluator (SRI:Infrastructure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastRadiusResult {
    pub score: f64,
    /// One-hop neighbourhood of the target, deduplicated, insertion-ordered.
    pub affected_resources: Vec<String>,
    pub affected_services: Vec<String>,
    pub single_points_of_failure: Vec<String>,
    pub affected_zones: Vec<String>,
    pub reasoning: String,
}

impl BlastRadiusResult {
    /// Neutral result substituted when the evaluator fails or times out.
    pub fn neutral(note: &str) -> Self {
        Self {
            score: 50.0,
            affected_resources: vec![],
            affected_services: vec![],
            single_points_of_failure: vec![],
            affected_zones: vec![],
            reasoning: note.to_string(),
        }
    }
}

/// A governance policy that fired against the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub policy_id: String,
    pub severity: PolicySeverity,
    pub description: String,
}

/// Output of the Policy Evaluator (SRI:Policy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyResult {
    pub score: f64,
    /// Ordered by severity descending, then policy id ascending.
    pub violations: Vec<PolicyViolation>,
    pub has_critical_violation: bool,
    pub reasoning: String,
}

impl PolicyResult {
    pub fn neutral(note: &str) -> Self {
        Self {
            score: 50.0,
            violations: vec![],
            has_critical_violation: false,
            reasoning: note.to_string(),
        }
    }
}

/// A past incident surfaced by the Historical Evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarIncident {
    pub incident_id: String,
    pub similarity: f64,
    pub severity: PolicySeverity,
    pub summary: String,
}

/// Output of the Historical Evaluator (SRI:Historical).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalResult {
    pub score: f64,
    pub similar_incidents: Vec<SimilarIncident>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_relevant_incident: Option<SimilarIncident>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_procedure: Option<String>,
    pub reasoning: String,
}

impl HistoricalResult {
    pub fn neutral(note: &str) -> Self {
        Self {
            score: 50.0,
            similar_incidents: vec![],
            most_relevant_incident: None,
            recommended_procedure: None,
            reasoning: note.to_string(),
        }
    }
}

/// Over-optimization assessment: a cost-reducing action whose savings are
/// small against the worst-case recovery cost if a dependent fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverOptimization {
    pub triggered: bool,
    pub risk_usd: f64,
    pub rationale: String,
}

impl OverOptimization {
    pub fn none() -> Self {
        Self {
            triggered: false,
            risk_usd: 0.0,
            rationale: String::new(),
        }
    }
}

/// Output of the Financial Evaluator (SRI:Cost).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialResult {
    pub score: f64,
    /// Signed USD per month; negative means savings.
    pub monthly_change: f64,
    pub projected_90d: f64,
    pub cost_uncertain: bool,
    pub over_optimization: OverOptimization,
    pub reasoning: String,
}

impl FinancialResult {
    pub fn neutral(note: &str) -> Self {
        Self {
            score: 50.0,
            monthly_change: 0.0,
            projected_90d: 0.0,
            cost_uncertain: true,
            over_optimization: OverOptimization::none(),
            reasoning: note.to_string(),
        }
    }
}

/// The four typed evaluator results carried inside a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorResults {
    pub blast_radius: BlastRadiusResult,
    pub policy: PolicyResult,
    pub historical: HistoricalResult,
    pub financial: FinancialResult,
}

// ── Verdict ───────────────────────────────────────────────────────────────

/// Complete governance verdict for a proposed action.
///
/// Written once to the audit log, addressable by `action_id`; never updated
/// or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceVerdict {
    pub action_id: ActionId,
    pub decision: Decision,
    pub sri: SriBreakdown,
    pub weights: SriWeights,
    pub thresholds: SriThresholds,
    pub reason: String,
    /// Policy ids that fired, severity descending then id ascending.
    pub violations: Vec<String>,
    pub sub_results: EvaluatorResults,
    pub timestamp: DateTime<Utc>,
}

impl GovernanceVerdict {
    /// Dimension with the highest sub-score, for reason text and dashboards.
    pub fn dominant_dimension(&self) -> (&'static str, f64) {
        let dims = [
            ("infrastructure", self.sri.infrastructure),
            ("policy", self.sri.policy),
            ("historical", self.sri.historical),
            ("cost", self.sri.cost),
        ];
        dims.into_iter()
            .fold(("infrastructure", f64::MIN), |acc, d| {
                if d.1 > acc.1 {
                    d
                } else {
                    acc
                }
            })
    }
}
