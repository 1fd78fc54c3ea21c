// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Blast-Radius Evaluator — SRI:Infrastructure
//!
//! Scores the infrastructure impact of an action by a one-hop traversal of
//! the resource dependency graph. Multi-hop traversal is a deliberate
//! non-feature: the graph may be cyclic and one hop captures the resources
//! an operator would check first.
//!
//! ## Score components
//!
//! | Component | Contribution |
//! |-----------|--------------|
//! | Action base | `scale_up 10 · scale_down 15 · restart 20 · modify_nsg 30 · update_config 20 · create 15 · delete 40` |
//! | Target criticality tag | `low 0 · medium 10 · high 20 · critical 30` |
//! | Each downstream dependent | 5 |
//! | Each hosted service | 5 |
//! | Each additional critical resource via `governs` / edges | 10 |
//!
//! Accumulated and capped at 100. An unknown target scores 0.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::application::evaluators::{EvaluatorError, RiskEvaluator};
use crate::domain::action::{ActionType, ProposedAction};
use crate::domain::events::SriDimension;
use crate::domain::topology::Resource;
use crate::domain::verdict::{clamp_score, BlastRadiusResult};
use crate::infrastructure::stores::{TopologySnapshot, TopologyStore};

const CRITICALITY_SCORE: [(&str, f64); 4] = [
    ("low", 0.0),
    ("medium", 10.0),
    ("high", 20.0),
    ("critical", 30.0),
];

const DEPENDENT_SCORE: f64 = 5.0;
const SERVICE_SCORE: f64 = 5.0;
const SPOF_SCORE: f64 = 10.0;

fn action_base_score(action_type: ActionType) -> f64 {
    match action_type {
        ActionType::ScaleUp => 10.0,
        ActionType::ScaleDown => 15.0,
        ActionType::RestartService => 20.0,
        ActionType::ModifyNsg => 30.0,
        ActionType::UpdateConfig => 20.0,
        ActionType::CreateResource => 15.0,
        ActionType::DeleteResource => 40.0,
    }
}

/// Computes SRI:Infrastructure from the topology graph.
pub struct BlastRadiusEvaluator {
    topology: Arc<dyn TopologyStore>,
}

impl BlastRadiusEvaluator {
    pub fn new(topology: Arc<dyn TopologyStore>) -> Self {
        Self { topology }
    }

    /// One-hop neighbourhood of the target: dependencies, dependents,
    /// governed resources, and explicit edges in either direction.
    /// Deduplicated, insertion-ordered.
    fn affected_resources(snapshot: &TopologySnapshot, resource: &Resource) -> Vec<String> {
        let mut affected: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if name != resource.name && !affected.iter().any(|n| n == name) {
                affected.push(name.to_string());
            }
        };

        for dep in &resource.dependencies {
            push(dep);
        }
        for dep in &resource.dependents {
            push(dep);
        }
        for governed in &resource.governs {
            push(governed);
        }
        for edge in snapshot.edges_touching(&resource.name) {
            if edge.from == resource.name {
                push(&edge.to);
            } else {
                push(&edge.from);
            }
        }
        affected
    }

    /// Critical resources in the blast radius, the target included.
    fn single_points_of_failure(
        snapshot: &TopologySnapshot,
        resource: &Resource,
        affected: &[String],
    ) -> Vec<String> {
        let mut spofs = Vec::new();
        if resource.is_critical() {
            spofs.push(resource.name.clone());
        }
        for name in affected {
            if let Some(r) = snapshot.get(name) {
                if r.is_critical() && !spofs.contains(&r.name) {
                    spofs.push(r.name.clone());
                }
            }
        }
        spofs
    }

    /// Critical resources reachable via `governs` or explicit edges,
    /// excluding the target itself. These are the 10-point SPOF hits.
    fn scored_spofs(snapshot: &TopologySnapshot, resource: &Resource) -> Vec<String> {
        let mut reachable: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if name != resource.name && !reachable.iter().any(|n| n == name) {
                reachable.push(name.to_string());
            }
        };
        for governed in &resource.governs {
            push(governed);
        }
        for edge in snapshot.edges_touching(&resource.name) {
            if edge.from == resource.name {
                push(&edge.to);
            } else {
                push(&edge.from);
            }
        }
        reachable
            .into_iter()
            .filter(|name| snapshot.get(name).is_some_and(Resource::is_critical))
            .collect()
    }

    fn affected_zones(
        snapshot: &TopologySnapshot,
        resource: &Resource,
        affected: &[String],
    ) -> Vec<String> {
        let mut zones: Vec<String> = Vec::new();
        let mut push = |loc: Option<&String>| {
            if let Some(loc) = loc {
                if !zones.contains(loc) {
                    zones.push(loc.clone());
                }
            }
        };
        push(resource.location.as_ref());
        for name in affected {
            if let Some(r) = snapshot.get(name) {
                push(r.location.as_ref());
            }
        }
        zones
    }

    fn score(
        action: &ProposedAction,
        resource: &Resource,
        scored_spofs: &[String],
    ) -> f64 {
        let mut score = action_base_score(action.action_type);

        if let Some(criticality) = resource.tag("criticality") {
            score += CRITICALITY_SCORE
                .iter()
                .find(|(tag, _)| *tag == criticality)
                .map(|(_, pts)| *pts)
                .unwrap_or(0.0);
        }

        score += resource.dependents.len() as f64 * DEPENDENT_SCORE;
        score += resource.services_hosted.len() as f64 * SERVICE_SCORE;
        score += scored_spofs.len() as f64 * SPOF_SCORE;

        clamp_score(score)
    }

    fn reasoning(
        action: &ProposedAction,
        resource: &Resource,
        score: f64,
        affected: &[String],
        spofs: &[String],
    ) -> String {
        let criticality = resource.tag("criticality").unwrap_or("unknown");
        let preview: Vec<&str> = affected.iter().map(String::as_str).take(3).collect();
        let ellipsis = if affected.len() > 3 { ", ..." } else { "" };
        let mut text = format!(
            "Blast radius for '{}' on '{}' (criticality: {criticality}): \
             {} affected resource(s) [{}{ellipsis}], {} hosted service(s).",
            action.action_type,
            resource.name,
            affected.len(),
            preview.join(", "),
            resource.services_hosted.len(),
        );
        if !spofs.is_empty() {
            text.push_str(&format!(
                " Single points of failure in radius: {}.",
                spofs.join(", ")
            ));
        }
        text.push_str(&format!(" SRI:Infrastructure {score:.1}/100."));
        text
    }
}

#[async_trait]
impl RiskEvaluator for BlastRadiusEvaluator {
    type Output = BlastRadiusResult;

    fn dimension(&self) -> SriDimension {
        SriDimension::Infrastructure
    }

    async fn evaluate(&self, action: &ProposedAction) -> Result<BlastRadiusResult, EvaluatorError> {
        let snapshot = self.topology.snapshot().await?;

        let Some(resource) = snapshot.find(&action.target.resource_id) else {
            return Ok(BlastRadiusResult {
                score: 0.0,
                affected_resources: vec![],
                affected_services: vec![],
                single_points_of_failure: vec![],
                affected_zones: vec![],
                reasoning: format!(
                    "unknown resource '{}': target not present in the topology graph, \
                     blast radius cannot be simulated",
                    action.target.resource_id
                ),
            });
        };

        let affected = Self::affected_resources(&snapshot, resource);
        let spofs = Self::single_points_of_failure(&snapshot, resource, &affected);
        let scored = Self::scored_spofs(&snapshot, resource);
        let zones = Self::affected_zones(&snapshot, resource, &affected);
        let score = Self::score(action, resource, &scored);

        debug!(
            resource = %resource.name,
            action = %action.action_type,
            score,
            spofs = spofs.len(),
            "blast radius evaluated"
        );

        Ok(BlastRadiusResult {
            reasoning: Self::reasoning(action, resource, score, &affected, &spofs),
            score,
            affected_resources: affected,
            affected_services: resource.services_hosted.clone(),
            single_points_of_failure: spofs,
            affected_zones: zones,
        })
    }
}
