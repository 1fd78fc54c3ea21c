// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::domain::action::ActionId;
use crate::domain::error::PersistenceError;
use crate::domain::repository::{
    aggregate_from, clamp_limit, profile_from, sort_newest_first, AuditAggregate, AuditLog,
    AuditRecord, RecordOutcome, RiskProfile, VerdictSummary,
};
use crate::domain::verdict::GovernanceVerdict;

/// Mock-mode audit log: one pretty-printed JSON file per `action_id`.
///
/// Writes are serialized by a local mutex; records are written once and
/// never rewritten (a second `record` for the same id is a no-op).
pub struct FileAuditLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileAuditLog {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, action_id: ActionId) -> PathBuf {
        self.dir.join(format!("{action_id}.json"))
    }

    fn load_all(&self) -> Vec<AuditRecord> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return vec![];
        };
        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(PersistenceError::from)
                .and_then(|raw| serde_json::from_str(&raw).map_err(PersistenceError::from))
            {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable audit record"),
            }
        }
        records
    }

    fn summaries(&self, filter: impl Fn(&AuditRecord) -> bool) -> Vec<VerdictSummary> {
        let mut summaries: Vec<VerdictSummary> = self
            .load_all()
            .into_iter()
            .filter(|r| filter(r))
            .map(|r| r.summary())
            .collect();
        sort_newest_first(&mut summaries);
        summaries
    }
}

#[async_trait]
impl AuditLog for FileAuditLog {
    async fn record(&self, record: &AuditRecord) -> Result<RecordOutcome, PersistenceError> {
        let _guard = self.write_lock.lock();
        let path = self.path_for(record.verdict.action_id);
        if path.exists() {
            return Ok(RecordOutcome::Duplicate);
        }
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, json)?;
        Ok(RecordOutcome::Inserted)
    }

    async fn get_recent(
        &self,
        limit: usize,
        resource_filter: Option<&str>,
    ) -> Result<Vec<VerdictSummary>, PersistenceError> {
        let limit = clamp_limit(limit);
        let mut summaries = self.summaries(|record| match resource_filter {
            Some(fragment) => record.resource_id.contains(fragment),
            None => true,
        });
        summaries.truncate(limit);
        Ok(summaries)
    }

    async fn get_by_id(&self, action_id: ActionId) -> Result<GovernanceVerdict, PersistenceError> {
        let path = self.path_for(action_id);
        if !path.exists() {
            return Err(PersistenceError::NotFound(action_id.to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        let record: AuditRecord = serde_json::from_str(&raw)?;
        Ok(record.verdict)
    }

    async fn get_by_agent(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<VerdictSummary>, PersistenceError> {
        let limit = clamp_limit(limit);
        let mut summaries =
            self.summaries(|record| record.agent_id.as_deref() == Some(agent_id));
        summaries.truncate(limit);
        Ok(summaries)
    }

    async fn aggregate(&self) -> Result<AuditAggregate, PersistenceError> {
        Ok(aggregate_from(&self.summaries(|_| true)))
    }

    async fn risk_profile(&self, resource_id: &str) -> Result<RiskProfile, PersistenceError> {
        let summaries = self.summaries(|record| record.resource_id.contains(resource_id));
        Ok(profile_from(resource_id, &summaries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::{ActionTarget, ActionType, ProposedAction};
    use crate::domain::verdict::{
        BlastRadiusResult, Decision, EvaluatorResults, FinancialResult, HistoricalResult,
        PolicyResult, SriBreakdown, SriThresholds, SriWeights,
    };
    use chrono::Utc;

    fn record(resource: &str, agent: Option<&str>, composite: f64) -> AuditRecord {
        let mut action = ProposedAction::new(
            ActionType::ScaleUp,
            ActionTarget::new(resource, "Microsoft.Compute/virtualMachines"),
        );
        action.agent_id = agent.map(str::to_string);
        let decision = if composite > 60.0 {
            Decision::Denied
        } else if composite > 25.0 {
            Decision::Escalated
        } else {
            Decision::Approved
        };
        let verdict = GovernanceVerdict {
            action_id: action.action_id,
            decision,
            sri: SriBreakdown {
                infrastructure: composite,
                policy: 0.0,
                historical: 0.0,
                cost: 0.0,
                composite,
            },
            weights: SriWeights::default(),
            thresholds: SriThresholds::default(),
            reason: "test".to_string(),
            violations: vec!["POL-X-001".to_string()],
            sub_results: EvaluatorResults {
                blast_radius: BlastRadiusResult::neutral(""),
                policy: PolicyResult::neutral(""),
                historical: HistoricalResult::neutral(""),
                financial: FinancialResult::neutral(""),
            },
            timestamp: Utc::now(),
        };
        AuditRecord::new(verdict, &action)
    }

    #[tokio::test]
    async fn test_record_and_get_by_id_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileAuditLog::new(dir.path()).unwrap();
        let record = record("vm-a", Some("cost-optimization-agent"), 10.0);

        assert_eq!(
            log.record(&record).await.unwrap(),
            RecordOutcome::Inserted
        );
        let stored = log.get_by_id(record.verdict.action_id).await.unwrap();
        assert_eq!(stored, record.verdict);
        // Byte-equivalent JSON once re-serialized.
        assert_eq!(
            serde_json::to_string(&stored).unwrap(),
            serde_json::to_string(&record.verdict).unwrap()
        );
    }

    #[tokio::test]
    async fn test_duplicate_record_is_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileAuditLog::new(dir.path()).unwrap();
        let record = record("vm-a", None, 10.0);

        assert_eq!(log.record(&record).await.unwrap(), RecordOutcome::Inserted);
        assert_eq!(log.record(&record).await.unwrap(), RecordOutcome::Duplicate);
        assert_eq!(log.get_recent(10, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_recent_orders_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileAuditLog::new(dir.path()).unwrap();

        let mut first = record("vm-a", None, 10.0);
        first.verdict.timestamp = Utc::now() - chrono::Duration::minutes(5);
        let second = record("vm-b", None, 20.0);
        log.record(&first).await.unwrap();
        log.record(&second).await.unwrap();

        let recent = log.get_recent(10, None).await.unwrap();
        assert_eq!(recent[0].action_id, second.verdict.action_id);
        assert_eq!(recent[1].action_id, first.verdict.action_id);
    }

    #[tokio::test]
    async fn test_resource_substring_filter() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileAuditLog::new(dir.path()).unwrap();
        log.record(&record("vm-web-01", None, 10.0)).await.unwrap();
        log.record(&record("sql-prod", None, 10.0)).await.unwrap();

        let filtered = log.get_recent(10, Some("web")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].resource_id, "vm-web-01");
    }

    #[tokio::test]
    async fn test_get_by_agent_filters() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileAuditLog::new(dir.path()).unwrap();
        log.record(&record("vm-a", Some("deploy-agent"), 10.0))
            .await
            .unwrap();
        log.record(&record("vm-b", Some("monitoring-agent"), 10.0))
            .await
            .unwrap();

        let history = log.get_by_agent("deploy-agent", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].agent_id.as_deref(), Some("deploy-agent"));
    }

    #[tokio::test]
    async fn test_missing_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileAuditLog::new(dir.path()).unwrap();
        assert!(matches!(
            log.get_by_id(ActionId::new()).await,
            Err(PersistenceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_aggregate_and_risk_profile() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileAuditLog::new(dir.path()).unwrap();
        log.record(&record("vm-a", None, 10.0)).await.unwrap();
        log.record(&record("vm-a", None, 40.0)).await.unwrap();
        log.record(&record("vm-b", None, 90.0)).await.unwrap();

        let aggregate = log.aggregate().await.unwrap();
        assert_eq!(aggregate.total_evaluations, 3);
        assert_eq!(aggregate.approved, 1);
        assert_eq!(aggregate.escalated, 1);
        assert_eq!(aggregate.denied, 1);
        assert_eq!(aggregate.top_violations[0].0, "POL-X-001");

        let profile = log.risk_profile("vm-a").await.unwrap();
        assert_eq!(profile.total_evaluations, 2);
        assert_eq!(profile.max_composite, Some(40.0));
        assert!(profile.last_evaluated.is_some());
    }
}
