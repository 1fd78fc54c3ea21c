// Repository Pattern - Storage Backend Abstraction
//
// Defines the pluggable persistence seams for the two mutable collaborators
// (audit log, agent registry), enabling:
// - File-per-record JSON storage for mock mode
// - PostgreSQL for live mode
//
// Both backends satisfy the same contract; aggregation helpers are shared so
// the backends cannot drift apart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::action::{ActionId, ActionType, ProposedAction};
use crate::domain::agent::AgentRecord;
use crate::domain::error::PersistenceError;
use crate::domain::verdict::{Decision, GovernanceVerdict, SriBreakdown};

/// What the audit log stores per evaluation: the verdict plus the action
/// context needed for summaries and per-resource queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub verdict: GovernanceVerdict,
    pub resource_id: String,
    pub resource_type: String,
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub action_reason: String,
}

impl AuditRecord {
    pub fn new(verdict: GovernanceVerdict, action: &ProposedAction) -> Self {
        Self {
            verdict,
            resource_id: action.target.resource_id.clone(),
            resource_type: action.target.resource_type.clone(),
            action_type: action.action_type,
            agent_id: action.agent_id.clone(),
            action_reason: action.reason.clone(),
        }
    }

    pub fn summary(&self) -> VerdictSummary {
        VerdictSummary {
            action_id: self.verdict.action_id,
            timestamp: self.verdict.timestamp,
            decision: self.verdict.decision,
            sri: self.verdict.sri,
            resource_id: self.resource_id.clone(),
            action_type: self.action_type,
            agent_id: self.agent_id.clone(),
            violations: self.verdict.violations.clone(),
        }
    }
}

/// Compact verdict view returned by listing queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictSummary {
    pub action_id: ActionId,
    pub timestamp: DateTime<Utc>,
    pub decision: Decision,
    pub sri: SriBreakdown,
    pub resource_id: String,
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub violations: Vec<String>,
}

/// Whether `record` persisted a new verdict or found it already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    Duplicate,
}

/// Aggregate metrics over the whole audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditAggregate {
    pub total_evaluations: u64,
    pub approved: u64,
    pub escalated: u64,
    pub denied: u64,
    pub composite_min: Option<f64>,
    pub composite_avg: Option<f64>,
    pub composite_max: Option<f64>,
    pub avg_infrastructure: Option<f64>,
    pub avg_policy: Option<f64>,
    pub avg_historical: Option<f64>,
    pub avg_cost: Option<f64>,
    /// `(policy_id, times fired)`, most frequent first.
    pub top_violations: Vec<(String, u64)>,
    /// `(resource_id, evaluations)`, most evaluated first.
    pub top_resources: Vec<(String, u64)>,
}

/// Aggregated risk history for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub resource_id: String,
    pub total_evaluations: u64,
    pub approved: u64,
    pub escalated: u64,
    pub denied: u64,
    pub avg_composite: Option<f64>,
    pub max_composite: Option<f64>,
    pub top_violations: Vec<String>,
    pub last_evaluated: Option<DateTime<Utc>>,
}

/// Durable write-once store of governance verdicts.
///
/// Records are immutable; identity is `action_id` and duplicate recordings
/// are deduplicated. `get_recent` orders strictly by timestamp descending,
/// ties broken by `action_id` ascending.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<RecordOutcome, PersistenceError>;

    async fn get_recent(
        &self,
        limit: usize,
        resource_filter: Option<&str>,
    ) -> Result<Vec<VerdictSummary>, PersistenceError>;

    async fn get_by_id(&self, action_id: ActionId) -> Result<GovernanceVerdict, PersistenceError>;

    async fn get_by_agent(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<VerdictSummary>, PersistenceError>;

    async fn aggregate(&self) -> Result<AuditAggregate, PersistenceError>;

    async fn risk_profile(&self, resource_id: &str) -> Result<RiskProfile, PersistenceError>;
}

/// Per-agent statistics store. Identity is the agent name.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Idempotent: `registered_at` is set on first call only.
    async fn register(
        &self,
        name: &str,
        card_url: Option<&str>,
    ) -> Result<AgentRecord, PersistenceError>;

    /// Atomic: bump `total_proposed` and the matching decision counter,
    /// advance `last_seen`. Unknown agents are registered first.
    async fn update_stats(
        &self,
        name: &str,
        decision: Decision,
        seen_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;

    async fn get(&self, name: &str) -> Result<Option<AgentRecord>, PersistenceError>;

    /// All agents, newest `last_seen` first.
    async fn list(&self) -> Result<Vec<AgentRecord>, PersistenceError>;
}

/// Clamp a listing limit into the supported `[1, 100]` window.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, 100)
}

/// Newest-first ordering shared by both audit back-ends.
pub fn sort_newest_first(summaries: &mut [VerdictSummary]) {
    summaries.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.action_id.0.cmp(&b.action_id.0))
    });
}

/// Build the aggregate metrics from verdict summaries.
///
/// Shared across back-ends so file and PostgreSQL modes cannot diverge.
pub fn aggregate_from(summaries: &[VerdictSummary]) -> AuditAggregate {
    let total = summaries.len() as u64;
    let mut approved = 0;
    let mut escalated = 0;
    let mut denied = 0;
    let mut violations: HashMap<String, u64> = HashMap::new();
    let mut resources: HashMap<String, u64> = HashMap::new();

    for summary in summaries {
        match summary.decision {
            Decision::Approved => approved += 1,
            Decision::Escalated => escalated += 1,
            Decision::Denied => denied += 1,
        }
        for violation in &summary.violations {
            *violations.entry(violation.clone()).or_default() += 1;
        }
        *resources.entry(summary.resource_id.clone()).or_default() += 1;
    }

    let composites: Vec<f64> = summaries.iter().map(|s| s.sri.composite).collect();
    let avg = |extract: fn(&VerdictSummary) -> f64| -> Option<f64> {
        if summaries.is_empty() {
            None
        } else {
            Some(summaries.iter().map(extract).sum::<f64>() / summaries.len() as f64)
        }
    };

    AuditAggregate {
        total_evaluations: total,
        approved,
        escalated,
        denied,
        composite_min: composites.iter().cloned().reduce(f64::min),
        composite_avg: avg(|s| s.sri.composite),
        composite_max: composites.iter().cloned().reduce(f64::max),
        avg_infrastructure: avg(|s| s.sri.infrastructure),
        avg_policy: avg(|s| s.sri.policy),
        avg_historical: avg(|s| s.sri.historical),
        avg_cost: avg(|s| s.sri.cost),
        top_violations: top_counts(violations, 5),
        top_resources: top_counts(resources, 5),
    }
}

/// Build a per-resource risk profile from that resource's summaries
/// (expected newest-first).
pub fn profile_from(resource_id: &str, summaries: &[VerdictSummary]) -> RiskProfile {
    let mut approved = 0;
    let mut escalated = 0;
    let mut denied = 0;
    let mut violations: HashMap<String, u64> = HashMap::new();
    for summary in summaries {
        match summary.decision {
            Decision::Approved => approved += 1,
            Decision::Escalated => escalated += 1,
            Decision::Denied => denied += 1,
        }
        for violation in &summary.violations {
            *violations.entry(violation.clone()).or_default() += 1;
        }
    }

    let composites: Vec<f64> = summaries.iter().map(|s| s.sri.composite).collect();
    let avg_composite = if composites.is_empty() {
        None
    } else {
        Some(composites.iter().sum::<f64>() / composites.len() as f64)
    };

    RiskProfile {
        resource_id: resource_id.to_string(),
        total_evaluations: summaries.len() as u64,
        approved,
        escalated,
        denied,
        avg_composite,
        max_composite: composites.iter().cloned().reduce(f64::max),
        top_violations: top_counts(violations, 5)
            .into_iter()
            .map(|(id, _)| id)
            .collect(),
        last_evaluated: summaries.iter().map(|s| s.timestamp).max(),
    }
}

fn top_counts(counts: HashMap<String, u64>, limit: usize) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(limit);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn summary(composite: f64, decision: Decision, resource: &str) -> VerdictSummary {
        VerdictSummary {
            action_id: ActionId(Uuid::new_v4()),
            timestamp: Utc::now(),
            decision,
            sri: SriBreakdown {
                infrastructure: composite,
                policy: 0.0,
                historical: 0.0,
                cost: 0.0,
                composite,
            },
            resource_id: resource.to_string(),
            action_type: ActionType::ScaleUp,
            agent_id: None,
            violations: vec![],
        }
    }

    #[test]
    fn test_clamp_limit_window() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(20), 20);
        assert_eq!(clamp_limit(500), 100);
    }

    #[test]
    fn test_aggregate_counts_and_stats() {
        let summaries = vec![
            summary(10.0, Decision::Approved, "vm-a"),
            summary(40.0, Decision::Escalated, "vm-a"),
            summary(90.0, Decision::Denied, "vm-b"),
        ];
        let aggregate = aggregate_from(&summaries);
        assert_eq!(aggregate.total_evaluations, 3);
        assert_eq!(aggregate.approved, 1);
        assert_eq!(aggregate.escalated, 1);
        assert_eq!(aggregate.denied, 1);
        assert_eq!(aggregate.composite_min, Some(10.0));
        assert_eq!(aggregate.composite_max, Some(90.0));
        assert!((aggregate.composite_avg.unwrap() - 46.666666).abs() < 1e-4);
        assert_eq!(aggregate.top_resources[0], ("vm-a".to_string(), 2));
    }

    #[test]
    fn test_empty_aggregate_has_no_stats() {
        let aggregate = aggregate_from(&[]);
        assert_eq!(aggregate.total_evaluations, 0);
        assert!(aggregate.composite_avg.is_none());
        assert!(aggregate.top_violations.is_empty());
    }

    #[test]
    fn test_sort_newest_first_ties_by_action_id() {
        let ts = Utc::now();
        let mut a = summary(1.0, Decision::Approved, "vm");
        let mut b = summary(2.0, Decision::Approved, "vm");
        a.timestamp = ts;
        b.timestamp = ts;
        a.action_id = ActionId(Uuid::from_u128(2));
        b.action_id = ActionId(Uuid::from_u128(1));
        let mut summaries = vec![a.clone(), b.clone()];
        sort_newest_first(&mut summaries);
        assert_eq!(summaries[0].action_id, b.action_id);
        assert_eq!(summaries[1].action_id, a.action_id);
    }
}
