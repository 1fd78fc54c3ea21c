// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Historical Evaluator — SRI:Historical
//!
//! Scores an action by weighted similarity to past incidents. The Incident
//! Store decides which candidates come back (keyword or BM25); this
//! evaluator scores whatever it receives, so the result is a pure function
//! of `(action, returned incidents)`.
//!
//! ## Similarity dimensions (weights sum to 1.0)
//!
//! | Dimension | Weight |
//! |-----------|--------|
//! | action_type exact match | 0.40 |
//! | resource_type exact match | 0.30 |
//! | resource name substring of title/summary/tags | 0.20 |
//! | action-type keywords ∩ incident tags non-empty | 0.10 |
//!
//! Incidents below similarity 0.30 are dropped. The best match is the
//! primary signal; every further match contributes at 20% (diminishing
//! returns keep many weak precedents from inflating the score).

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::application::evaluators::{EvaluatorError, RiskEvaluator};
use crate::domain::action::{ActionType, ProposedAction};
use crate::domain::events::SriDimension;
use crate::domain::incident::Incident;
use crate::domain::policy::PolicySeverity;
use crate::domain::verdict::{clamp_score, HistoricalResult, SimilarIncident};
use crate::infrastructure::stores::{IncidentQuery, IncidentStore};

const SIMILARITY_THRESHOLD: f64 = 0.30;
const SECONDARY_WEIGHT: f64 = 0.20;
const CANDIDATE_LIMIT: usize = 64;

const W_ACTION: f64 = 0.40;
const W_RESOURCE_TYPE: f64 = 0.30;
const W_RESOURCE_NAME: f64 = 0.20;
const W_TAGS: f64 = 0.10;

fn severity_weight(severity: PolicySeverity) -> f64 {
    match severity {
        PolicySeverity::Critical => 100.0,
        PolicySeverity::High => 75.0,
        PolicySeverity::Medium => 40.0,
        PolicySeverity::Low => 10.0,
    }
}

/// Tags in the incident corpus that signal a given action type occurred.
fn action_keywords(action_type: ActionType) -> &'static [&'static str] {
    match action_type {
        ActionType::RestartService => &["restart"],
        ActionType::DeleteResource => &["deletion", "delete"],
        ActionType::ModifyNsg => &["nsg-change"],
        ActionType::ScaleDown => &["scale-down"],
        ActionType::ScaleUp => &["scale-up"],
        ActionType::UpdateConfig => &["config-change"],
        ActionType::CreateResource => &[],
    }
}

/// Computes SRI:Historical from incident precedents.
pub struct HistoricalEvaluator {
    incidents: Arc<dyn IncidentStore>,
}

impl HistoricalEvaluator {
    pub fn new(incidents: Arc<dyn IncidentStore>) -> Self {
        Self { incidents }
    }

    fn query_for(action: &ProposedAction) -> IncidentQuery {
        let mut text = format!(
            "{} {} {}",
            action.action_type,
            action.target.resource_type,
            action.target.short_name()
        );
        for keyword in action_keywords(action.action_type) {
            text.push(' ');
            text.push_str(keyword);
        }
        IncidentQuery::new(text, CANDIDATE_LIMIT)
    }

    /// Weighted similarity in [0, 1]. Name matching is case-insensitive.
    fn similarity(action: &ProposedAction, incident: &Incident) -> f64 {
        let mut similarity = 0.0;

        if incident.action_type == action.action_type.as_str() {
            similarity += W_ACTION;
        }
        if incident.resource_type == action.target.resource_type {
            similarity += W_RESOURCE_TYPE;
        }

        let name = action.target.short_name().to_lowercase();
        if !name.is_empty() {
            let in_title = incident.title.to_lowercase().contains(&name);
            let in_summary = incident.summary.to_lowercase().contains(&name);
            let in_tags = incident
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(&name));
            if in_title || in_summary || in_tags {
                similarity += W_RESOURCE_NAME;
            }
        }

        let keywords = action_keywords(action.action_type);
        let tag_hit = incident
            .tags
            .iter()
            .any(|t| keywords.contains(&t.to_lowercase().as_str()));
        if tag_hit {
            similarity += W_TAGS;
        }

        similarity
    }

    fn score(matches: &[SimilarIncident]) -> f64 {
        let Some(best) = matches.first() else {
            return 0.0;
        };
        let mut score = best.similarity * severity_weight(best.severity);
        for incident in &matches[1..] {
            score += incident.similarity * severity_weight(incident.severity) * SECONDARY_WEIGHT;
        }
        clamp_score(score)
    }

    fn reasoning(action: &ProposedAction, matches: &[SimilarIncident], score: f64) -> String {
        let Some(best) = matches.first() else {
            return format!(
                "No historical precedent for '{}' on '{}'; no risk signal from past incidents.",
                action.action_type, action.target.resource_type
            );
        };
        let mut text = format!(
            "Found {} similar incident(s) for '{}' on '{}'. Most relevant: {} \
             (similarity {:.0}%, severity {}).",
            matches.len(),
            action.action_type,
            action.target.resource_type,
            best.incident_id,
            best.similarity * 100.0,
            best.severity,
        );
        if matches.len() > 1 {
            let others: Vec<&str> = matches[1..]
                .iter()
                .map(|m| m.incident_id.as_str())
                .collect();
            text.push_str(&format!(" Additional precedents: {}.", others.join(", ")));
        }
        text.push_str(&format!(" SRI:Historical {score:.1}/100."));
        text
    }
}

#[async_trait]
impl RiskEvaluator for HistoricalEvaluator {
    type Output = HistoricalResult;

    fn dimension(&self) -> SriDimension {
        SriDimension::Historical
    }

    async fn evaluate(&self, action: &ProposedAction) -> Result<HistoricalResult, EvaluatorError> {
        let candidates = self.incidents.lookup(&Self::query_for(action)).await?;

        let mut matches: Vec<(f64, &Incident)> = candidates
            .iter()
            .map(|incident| (Self::similarity(action, incident), incident))
            .filter(|(similarity, _)| *similarity >= SIMILARITY_THRESHOLD)
            .collect();
        matches.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.incident_id.cmp(&b.1.incident_id))
        });

        let similar: Vec<SimilarIncident> = matches
            .iter()
            .map(|(similarity, incident)| SimilarIncident {
                incident_id: incident.incident_id.clone(),
                similarity: *similarity,
                severity: incident.severity,
                summary: incident.summary.clone(),
            })
            .collect();

        let score = Self::score(&similar);
        let most_relevant = similar.first().cloned();
        let recommended_procedure = matches
            .first()
            .and_then(|(_, incident)| incident.recommended_procedure.clone());

        debug!(
            action = %action.action_type,
            candidates = candidates.len(),
            matches = similar.len(),
            score,
            "historical precedent evaluated"
        );

        Ok(HistoricalResult {
            reasoning: Self::reasoning(action, &similar, score),
            score,
            similar_incidents: similar,
            most_relevant_incident: most_relevant,
            recommended_procedure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::ActionTarget;
    use crate::infrastructure::stores::{IncidentRanking, JsonIncidentStore};

    fn incident(
        id: &str,
        action_type: &str,
        resource_type: &str,
        title: &str,
        tags: &[&str],
        severity: PolicySeverity,
    ) -> Incident {
        Incident {
            incident_id: id.to_string(),
            title: title.to_string(),
            summary: format!("summary of {title}"),
            action_type: action_type.to_string(),
            resource_type: resource_type.to_string(),
            resource_name: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            severity,
            outcome_text: "resolved".to_string(),
            recommended_procedure: Some(format!("procedure for {id}")),
        }
    }

    fn evaluator(incidents: Vec<Incident>) -> HistoricalEvaluator {
        HistoricalEvaluator::new(Arc::new(JsonIncidentStore::from_incidents(
            incidents,
            IncidentRanking::Keyword,
        )))
    }

    fn scale_up_action() -> ProposedAction {
        ProposedAction::new(
            ActionType::ScaleUp,
            ActionTarget::new("vm-web-01", "Microsoft.Compute/virtualMachines"),
        )
    }

    #[tokio::test]
    async fn test_no_precedent_scores_zero() {
        let result = evaluator(vec![]).evaluate(&scale_up_action()).await.unwrap();
        assert_eq!(result.score, 0.0);
        assert!(result.similar_incidents.is_empty());
        assert!(result.most_relevant_incident.is_none());
        assert!(result.reasoning.contains("No historical precedent"));
    }

    #[tokio::test]
    async fn test_full_match_uses_best_severity_weight() {
        let incidents = vec![incident(
            "INC-100",
            "scale_up",
            "Microsoft.Compute/virtualMachines",
            "Scale-up of vm-web-01 caused quota exhaustion",
            &["scale-up"],
            PolicySeverity::High,
        )];
        let result = evaluator(incidents)
            .evaluate(&scale_up_action())
            .await
            .unwrap();
        // similarity 1.0 (0.4 + 0.3 + 0.2 + 0.1) × high 75
        assert_eq!(result.score, 75.0);
        assert_eq!(
            result.most_relevant_incident.as_ref().unwrap().incident_id,
            "INC-100"
        );
        assert_eq!(
            result.recommended_procedure.as_deref(),
            Some("procedure for INC-100")
        );
    }

    #[tokio::test]
    async fn test_below_threshold_incident_is_dropped() {
        // Only tag overlap (0.1), below the 0.30 threshold.
        let incidents = vec![incident(
            "INC-200",
            "delete_resource",
            "Microsoft.Storage/storageAccounts",
            "Unrelated deletion",
            &["scale-up"],
            PolicySeverity::Critical,
        )];
        let result = evaluator(incidents)
            .evaluate(&scale_up_action())
            .await
            .unwrap();
        assert_eq!(result.score, 0.0);
        assert!(result.similar_incidents.is_empty());
    }

    #[tokio::test]
    async fn test_secondary_matches_contribute_at_twenty_percent() {
        let incidents = vec![
            incident(
                "INC-301",
                "scale_up",
                "Microsoft.Compute/virtualMachines",
                "vm-web-01 scale event",
                &["scale-up"],
                PolicySeverity::High,
            ),
            incident(
                "INC-302",
                "scale_up",
                "Microsoft.Compute/virtualMachines",
                "other vm scale event",
                &[],
                PolicySeverity::Medium,
            ),
        ];
        let result = evaluator(incidents)
            .evaluate(&scale_up_action())
            .await
            .unwrap();
        // best: 1.0 × 75 = 75; secondary: 0.7 × 40 × 0.2 = 5.6
        assert!((result.score - 80.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_ties_broken_by_incident_id_ascending() {
        let incidents = vec![
            incident(
                "INC-B",
                "scale_up",
                "Microsoft.Compute/virtualMachines",
                "plain",
                &[],
                PolicySeverity::Low,
            ),
            incident(
                "INC-A",
                "scale_up",
                "Microsoft.Compute/virtualMachines",
                "plain",
                &[],
                PolicySeverity::Low,
            ),
        ];
        let result = evaluator(incidents)
            .evaluate(&scale_up_action())
            .await
            .unwrap();
        assert_eq!(result.similar_incidents[0].incident_id, "INC-A");
        assert_eq!(result.similar_incidents[1].incident_id, "INC-B");
    }

    #[tokio::test]
    async fn test_name_match_is_case_insensitive() {
        let incidents = vec![incident(
            "INC-400",
            "restart_service",
            "other/type",
            "Restart of VM-WEB-01 flapped the pool",
            &["restart"],
            PolicySeverity::Medium,
        )];
        let mut action = scale_up_action();
        action.action_type = ActionType::RestartService;
        let result = evaluator(incidents).evaluate(&action).await.unwrap();
        // 0.4 action + 0.2 name + 0.1 tags = 0.7
        assert_eq!(result.similar_incidents.len(), 1);
        assert!((result.similar_incidents[0].similarity - 0.7).abs() < 1e-9);
    }
}
