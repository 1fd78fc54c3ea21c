// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Financial Evaluator — SRI:Cost
//!
//! Estimates the monthly cost change of an action (signed USD, negative is
//! savings), scores its magnitude, amplifies by an action multiplier, and
//! adds penalties for over-optimization and cost uncertainty.
//!
//! ## Cost-change resolution (first match wins)
//!
//! 1. `projected_savings_monthly` → `(-savings, certain)`
//! 2. `target.current_monthly_cost` — `0.0` is a valid known value
//! 3. Topology lookup `monthly_cost`
//! 4. Action default over the resolved cost:
//!    delete `-cost` · scale_down `-0.30·cost` (uncertain) ·
//!    scale_up `+0.50·cost` (uncertain) · everything else `0.0`
//! 5. No cost knowable → `(0.0, uncertain)` for cost-impacting actions
//!
//! ## Over-optimization
//!
//! A spend-reducing action on a critical target (criticality tag, ≥ 2
//! dependents, or ≥ 1 hosted service) risks a recovery bill of
//! `$10,000 × max(1, dependents + services)` — the savings rarely cover it.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::application::evaluators::{EvaluatorError, RiskEvaluator};
use crate::domain::action::{ActionType, ProposedAction};
use crate::domain::events::SriDimension;
use crate::domain::topology::Resource;
use crate::domain::verdict::{clamp_score, FinancialResult, OverOptimization};
use crate::infrastructure::stores::TopologyStore;

/// `(minimum |change|, points)` — evaluated top-down, first match wins.
const MAGNITUDE_THRESHOLDS: [(f64, f64); 5] = [
    (1000.0, 70.0),
    (600.0, 50.0),
    (300.0, 30.0),
    (100.0, 15.0),
    (f64::MIN_POSITIVE, 5.0),
];

const OVER_OPTIMIZATION_PENALTY: f64 = 20.0;
const UNCERTAINTY_PENALTY: f64 = 10.0;
const SCALE_DOWN_FRACTION: f64 = 0.30;
const SCALE_UP_FRACTION: f64 = 0.50;
const RECOVERY_COST_PER_DEPENDENT: f64 = 10_000.0;

fn action_multiplier(action_type: ActionType) -> f64 {
    match action_type {
        ActionType::DeleteResource => 1.5,
        ActionType::ScaleDown => 1.2,
        ActionType::UpdateConfig => 0.8,
        ActionType::ScaleUp => 0.6,
        ActionType::CreateResource => 0.5,
        ActionType::RestartService | ActionType::ModifyNsg => 0.3,
    }
}

/// Computes SRI:Cost from monthly cost change and over-optimization risk.
pub struct FinancialEvaluator {
    topology: Arc<dyn TopologyStore>,
}

impl FinancialEvaluator {
    pub fn new(topology: Arc<dyn TopologyStore>) -> Self {
        Self { topology }
    }

    /// `(monthly_change_usd, cost_uncertain)` per the resolution order.
    fn estimate_change(action: &ProposedAction, resource: Option<&Resource>) -> (f64, bool) {
        if let Some(savings) = action.projected_savings_monthly {
            return (-savings, false);
        }

        // 0.0 from the caller is a known zero, not a missing value.
        let current_cost = action
            .target
            .current_monthly_cost
            .or_else(|| resource.and_then(|r| r.monthly_cost));

        match action.action_type {
            ActionType::DeleteResource => match current_cost {
                Some(cost) => (-cost, false),
                None => (0.0, true),
            },
            ActionType::ScaleDown => match current_cost {
                Some(cost) => (-cost * SCALE_DOWN_FRACTION, true),
                None => (0.0, true),
            },
            ActionType::ScaleUp => match current_cost {
                Some(cost) => (cost * SCALE_UP_FRACTION, true),
                None => (0.0, true),
            },
            ActionType::RestartService
            | ActionType::ModifyNsg
            | ActionType::CreateResource
            | ActionType::UpdateConfig => (0.0, false),
        }
    }

    fn magnitude_score(abs_change: f64) -> f64 {
        MAGNITUDE_THRESHOLDS
            .iter()
            .find(|(threshold, _)| abs_change >= *threshold)
            .map(|(_, points)| *points)
            .unwrap_or(0.0)
    }

    fn detect_over_optimization(
        resource: Option<&Resource>,
        monthly_change: f64,
    ) -> OverOptimization {
        let Some(resource) = resource else {
            return OverOptimization::none();
        };
        if monthly_change >= 0.0 {
            return OverOptimization::none();
        }

        let dependents = resource.dependents.len();
        let services = resource.services_hosted.len();
        let critical_target = resource.is_critical() || dependents >= 2 || services >= 1;
        if !critical_target {
            return OverOptimization::none();
        }

        let risk_usd = RECOVERY_COST_PER_DEPENDENT * (dependents + services).max(1) as f64;
        OverOptimization {
            triggered: true,
            risk_usd,
            rationale: format!(
                "'{}' has {dependents} dependent(s) and {services} hosted service(s); \
                 saving ${:.0}/month risks ${risk_usd:.0} in unplanned recovery costs",
                resource.name,
                monthly_change.abs(),
            ),
        }
    }

    fn reasoning(
        action: &ProposedAction,
        monthly_change: f64,
        cost_uncertain: bool,
        over_optimization: &OverOptimization,
        score: f64,
    ) -> String {
        let direction = if monthly_change < 0.0 {
            "reduction"
        } else if monthly_change > 0.0 {
            "increase"
        } else {
            "no change"
        };
        let estimate_tag = if cost_uncertain { " (estimated)" } else { "" };
        let mut text = format!(
            "Financial impact of '{}': ${:.2}/month {direction}{estimate_tag}; \
             90-day outlook ${:.2}.",
            action.action_type,
            monthly_change.abs(),
            monthly_change * 3.0,
        );
        if over_optimization.triggered {
            text.push_str(&format!(
                " Over-optimization risk: {}.",
                over_optimization.rationale
            ));
        }
        text.push_str(&format!(" SRI:Cost {score:.1}/100."));
        text
    }
}

#[async_trait]
impl RiskEvaluator for FinancialEvaluator {
    type Output = FinancialResult;

    fn dimension(&self) -> SriDimension {
        SriDimension::Cost
    }

    async fn evaluate(&self, action: &ProposedAction) -> Result<FinancialResult, EvaluatorError> {
        let snapshot = self.topology.snapshot().await?;
        let resource = snapshot.find(&action.target.resource_id);

        let (monthly_change, cost_uncertain) = Self::estimate_change(action, resource);
        let over_optimization = Self::detect_over_optimization(resource, monthly_change);

        let mut score =
            Self::magnitude_score(monthly_change.abs()) * action_multiplier(action.action_type);
        if over_optimization.triggered {
            score += OVER_OPTIMIZATION_PENALTY;
        }
        if cost_uncertain {
            score += UNCERTAINTY_PENALTY;
        }
        let score = clamp_score(score);

        debug!(
            action = %action.action_type,
            monthly_change,
            cost_uncertain,
            over_optimization = over_optimization.triggered,
            score,
            "financial impact evaluated"
        );

        Ok(FinancialResult {
            reasoning: Self::reasoning(
                action,
                monthly_change,
                cost_uncertain,
                &over_optimization,
                score,
            ),
            score,
            monthly_change,
            projected_90d: monthly_change * 3.0,
            cost_uncertain,
            over_optimization,
        })
    }
}
