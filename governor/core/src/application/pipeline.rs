// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Governance Pipeline
//!
//! Orchestrates one `evaluate(action) → verdict` call:
//!
//! 1. Validates the action (`InvalidInput` on schema problems).
//! 2. Fans out to the four evaluators, which run concurrently; total wall
//!    time tracks the slowest evaluator, not the sum.
//! 3. An evaluator that fails or exceeds its timeout contributes the
//!    neutral 50.0 and a note in the verdict reason; the call only fails
//!    with `Internal` when all four evaluators are lost.
//! 4. The decision engine composes the verdict; optional narration rewrites
//!    the reason text (never the scores).
//! 5. The verdict is persisted to the audit log, then the agent registry is
//!    updated — in that order; neither failure blocks the return.
//!
//! A caller-provided deadline cancels the fan-out cooperatively; on expiry
//! the call fails with `DeadlineExceeded` and nothing is persisted. No lock
//! is held across evaluator suspension points; concurrent `evaluate` calls
//! share nothing mutable.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::application::decision::DecisionEngine;
use crate::application::evaluators::{EvaluatorError, RiskEvaluator};
use crate::domain::action::ProposedAction;
use crate::domain::error::GovernanceError;
use crate::domain::events::{GovernanceEvent, SriDimension};
use crate::domain::repository::{AgentRegistry, AuditLog, AuditRecord, RecordOutcome};
use crate::domain::verdict::{
    BlastRadiusResult, FinancialResult, GovernanceVerdict, HistoricalResult, PolicyResult,
};
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::narration::{narrate_reason, Narrator, NoopNarrator};

/// End-to-end governance pipeline. Cheap to clone via inner `Arc`s.
pub struct GovernancePipeline {
    blast: Arc<dyn RiskEvaluator<Output = BlastRadiusResult>>,
    policy: Arc<dyn RiskEvaluator<Output = PolicyResult>>,
    historical: Arc<dyn RiskEvaluator<Output = HistoricalResult>>,
    financial: Arc<dyn RiskEvaluator<Output = FinancialResult>>,
    engine: DecisionEngine,
    audit: Arc<dyn AuditLog>,
    registry: Arc<dyn AgentRegistry>,
    events: EventBus,
    narrator: Arc<dyn Narrator>,
    evaluator_timeout: Duration,
}

impl GovernancePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        blast: Arc<dyn RiskEvaluator<Output = BlastRadiusResult>>,
        policy: Arc<dyn RiskEvaluator<Output = PolicyResult>>,
        historical: Arc<dyn RiskEvaluator<Output = HistoricalResult>>,
        financial: Arc<dyn RiskEvaluator<Output = FinancialResult>>,
        engine: DecisionEngine,
        audit: Arc<dyn AuditLog>,
        registry: Arc<dyn AgentRegistry>,
        events: EventBus,
        evaluator_timeout: Duration,
    ) -> Self {
        Self {
            blast,
            policy,
            historical,
            financial,
            engine,
            audit,
            registry,
            events,
            narrator: Arc::new(NoopNarrator),
            evaluator_timeout,
        }
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn audit(&self) -> &Arc<dyn AuditLog> {
        &self.audit
    }

    pub fn registry(&self) -> &Arc<dyn AgentRegistry> {
        &self.registry
    }

    /// Evaluate with no caller deadline.
    pub async fn evaluate(
        &self,
        action: &ProposedAction,
    ) -> Result<GovernanceVerdict, GovernanceError> {
        self.evaluate_with_deadline(action, None).await
    }

    /// Evaluate with an optional caller deadline covering the whole call.
    pub async fn evaluate_with_deadline(
        &self,
        action: &ProposedAction,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<GovernanceVerdict, GovernanceError> {
        validate(action)?;

        self.events.publish(GovernanceEvent::EvaluationStarted {
            action_id: action.action_id,
            action_type: action.action_type,
            resource_id: action.target.resource_id.clone(),
            started_at: action.timestamp,
        });

        let fan_out = self.fan_out(action);
        let (blast, policy, historical, financial, notes) = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fan_out)
                .await
                .map_err(|_| GovernanceError::DeadlineExceeded)?,
            None => fan_out.await,
        };

        if notes.len() == 4 {
            return Err(GovernanceError::Internal(
                "all four evaluators failed".to_string(),
            ));
        }

        let mut verdict = self
            .engine
            .decide(action, blast, policy, historical, financial, &notes);

        self.events.publish(GovernanceEvent::VerdictReached {
            action_id: verdict.action_id,
            decision: verdict.decision,
            composite: verdict.sri.composite,
        });

        // Narration rewrites prose only, and must run before the verdict
        // becomes the immutable audit record.
        narrate_reason(self.narrator.as_ref(), &mut verdict).await;

        self.record(action, &verdict).await;
        Ok(verdict)
    }

    /// Run the four evaluators concurrently, substituting the neutral score
    /// for any that fail or time out. Returns the failure notes alongside.
    async fn fan_out(
        &self,
        action: &ProposedAction,
    ) -> (
        BlastRadiusResult,
        PolicyResult,
        HistoricalResult,
        FinancialResult,
        Vec<String>,
    ) {
        let limit = self.evaluator_timeout;
        let (blast, policy, historical, financial) = tokio::join!(
            settle(limit, self.blast.evaluate(action)),
            settle(limit, self.policy.evaluate(action)),
            settle(limit, self.historical.evaluate(action)),
            settle(limit, self.financial.evaluate(action)),
        );

        let mut notes = Vec::new();
        let blast = self.unwrap_settled(
            action,
            SriDimension::Infrastructure,
            blast,
            BlastRadiusResult::neutral,
            &mut notes,
            |r| r.score,
        );
        let policy = self.unwrap_settled(
            action,
            SriDimension::Policy,
            policy,
            PolicyResult::neutral,
            &mut notes,
            |r| r.score,
        );
        let historical = self.unwrap_settled(
            action,
            SriDimension::Historical,
            historical,
            HistoricalResult::neutral,
            &mut notes,
            |r| r.score,
        );
        let financial = self.unwrap_settled(
            action,
            SriDimension::Cost,
            financial,
            FinancialResult::neutral,
            &mut notes,
            |r| r.score,
        );

        (blast, policy, historical, financial, notes)
    }

    fn unwrap_settled<T>(
        &self,
        action: &ProposedAction,
        dimension: SriDimension,
        settled: Result<T, String>,
        neutral: impl FnOnce(&str) -> T,
        notes: &mut Vec<String>,
        score: impl FnOnce(&T) -> f64,
    ) -> T {
        match settled {
            Ok(result) => {
                self.events.publish(GovernanceEvent::EvaluatorSettled {
                    action_id: action.action_id,
                    dimension,
                    score: score(&result),
                    failed: false,
                });
                result
            }
            Err(cause) => {
                let note = format!(
                    "{} evaluator unavailable ({cause}); neutral score 50.0 substituted",
                    dimension.as_str()
                );
                warn!(
                    action_id = %action.action_id,
                    dimension = dimension.as_str(),
                    %cause,
                    "evaluator failure absorbed"
                );
                self.events.publish(GovernanceEvent::EvaluatorSettled {
                    action_id: action.action_id,
                    dimension,
                    score: 50.0,
                    failed: true,
                });
                let result = neutral(&note);
                notes.push(note);
                result
            }
        }
    }

    /// Record side-effects: audit log first, then agent registry. Neither
    /// failure blocks the verdict from returning.
    async fn record(&self, action: &ProposedAction, verdict: &GovernanceVerdict) {
        let record = AuditRecord::new(verdict.clone(), action);
        let outcome = match self.audit.record(&record).await {
            Ok(outcome) => {
                self.events.publish(GovernanceEvent::VerdictRecorded {
                    action_id: verdict.action_id,
                });
                Some(outcome)
            }
            Err(e) => {
                warn!(
                    action_id = %verdict.action_id,
                    error = %e,
                    "audit persistence failed; verdict still returned"
                );
                None
            }
        };

        // A re-recorded verdict must not inflate agent counters.
        if outcome == Some(RecordOutcome::Duplicate) {
            return;
        }

        if let Some(agent_id) = &action.agent_id {
            if let Err(e) = self
                .registry
                .update_stats(agent_id, verdict.decision, verdict.timestamp)
                .await
            {
                warn!(
                    %agent_id,
                    error = %e,
                    "agent registry update failed; verdict still returned"
                );
            }
        }

        info!(
            action_id = %verdict.action_id,
            decision = %verdict.decision,
            composite = verdict.sri.composite,
            "verdict recorded"
        );
    }
}

fn validate(action: &ProposedAction) -> Result<(), GovernanceError> {
    if action.target.resource_id.trim().is_empty() {
        return Err(GovernanceError::InvalidInput(
            "target.resource_id must not be empty".to_string(),
        ));
    }
    if action.target.resource_type.trim().is_empty() {
        return Err(GovernanceError::InvalidInput(
            "target.resource_type must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Await one evaluator under the per-evaluator timeout, flattening both
/// failure modes into a printable cause.
async fn settle<T>(
    limit: Duration,
    fut: impl std::future::Future<Output = Result<T, EvaluatorError>>,
) -> Result<T, String> {
    match timeout(limit, fut).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {}s", limit.as_secs())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::evaluators::{
        BlastRadiusEvaluator, FinancialEvaluator, HistoricalEvaluator, PolicyComplianceEvaluator,
    };
    use crate::domain::action::{ActionTarget, ActionType};
    use crate::domain::agent::AgentRecord;
    use crate::domain::error::PersistenceError;
    use crate::domain::repository::{
        AuditAggregate, RiskProfile, VerdictSummary,
    };
    use crate::domain::verdict::{Decision, SriThresholds, SriWeights};
    use crate::infrastructure::audit::FileAuditLog;
    use crate::infrastructure::registry::FileAgentRegistry;
    use crate::infrastructure::stores::{
        IncidentRanking, JsonIncidentStore, JsonPolicyStore, JsonTopologyStore,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;

    fn real_pipeline(audit: Arc<dyn AuditLog>, registry: Arc<dyn AgentRegistry>) -> GovernancePipeline {
        let topology: Arc<JsonTopologyStore> = Arc::new(JsonTopologyStore::from_document(
            serde_json::from_value(serde_json::json!({
                "resources": [
                    {"name": "vm-web-01", "type": "Microsoft.Compute/virtualMachines",
                     "tags": {"tier": "web"}, "monthly_cost": 30.0}
                ],
                "dependency_edges": []
            }))
            .unwrap(),
        ));
        let policies = Arc::new(JsonPolicyStore::from_policies(vec![]));
        let incidents = Arc::new(JsonIncidentStore::from_incidents(
            vec![],
            IncidentRanking::Keyword,
        ));
        GovernancePipeline::new(
            Arc::new(BlastRadiusEvaluator::new(topology.clone())),
            Arc::new(PolicyComplianceEvaluator::new(policies, topology.clone())),
            Arc::new(HistoricalEvaluator::new(incidents)),
            Arc::new(FinancialEvaluator::new(topology)),
            DecisionEngine::new(SriWeights::default(), SriThresholds::default()),
            audit,
            registry,
            EventBus::with_default_capacity(),
            Duration::from_secs(10),
        )
    }

    fn scale_up_action() -> ProposedAction {
        ProposedAction::new(
            ActionType::ScaleUp,
            ActionTarget::new("vm-web-01", "Microsoft.Compute/virtualMachines"),
        )
        .with_agent("monitoring-agent")
        .with_reason("CPU 87% for 15min")
    }

    // ── Mock collaborators ───────────────────────────────────────────────

    struct SlowEvaluator<T: Clone + Send + Sync> {
        delay: Duration,
        result: T,
        dimension: SriDimension,
    }

    #[async_trait]
    impl<T: Clone + Send + Sync> RiskEvaluator for SlowEvaluator<T> {
        type Output = T;

        fn dimension(&self) -> SriDimension {
            self.dimension
        }

        async fn evaluate(&self, _action: &ProposedAction) -> Result<T, EvaluatorError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.result.clone())
        }
    }

    struct FailingEvaluator<T> {
        dimension: SriDimension,
        _marker: std::marker::PhantomData<T>,
    }

    impl<T> FailingEvaluator<T> {
        fn new(dimension: SriDimension) -> Self {
            Self {
                dimension,
                _marker: std::marker::PhantomData,
            }
        }
    }

    #[async_trait]
    impl<T: Send + Sync> RiskEvaluator for FailingEvaluator<T> {
        type Output = T;

        fn dimension(&self) -> SriDimension {
            self.dimension
        }

        async fn evaluate(&self, _action: &ProposedAction) -> Result<T, EvaluatorError> {
            Err(EvaluatorError::Internal("backing index corrupted".to_string()))
        }
    }

    #[derive(Clone)]
    struct OrderProbe {
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl AuditLog for OrderProbe {
        async fn record(&self, _record: &AuditRecord) -> Result<RecordOutcome, PersistenceError> {
            self.order.lock().push("audit");
            Ok(RecordOutcome::Inserted)
        }
        async fn get_recent(
            &self,
            _limit: usize,
            _resource_filter: Option<&str>,
        ) -> Result<Vec<VerdictSummary>, PersistenceError> {
            Ok(vec![])
        }
        async fn get_by_id(
            &self,
            action_id: crate::domain::action::ActionId,
        ) -> Result<GovernanceVerdict, PersistenceError> {
            Err(PersistenceError::NotFound(action_id.to_string()))
        }
        async fn get_by_agent(
            &self,
            _agent_id: &str,
            _limit: usize,
        ) -> Result<Vec<VerdictSummary>, PersistenceError> {
            Ok(vec![])
        }
        async fn aggregate(&self) -> Result<AuditAggregate, PersistenceError> {
            Ok(crate::domain::repository::aggregate_from(&[]))
        }
        async fn risk_profile(&self, resource_id: &str) -> Result<RiskProfile, PersistenceError> {
            Ok(crate::domain::repository::profile_from(resource_id, &[]))
        }
    }

    #[async_trait]
    impl AgentRegistry for OrderProbe {
        async fn register(
            &self,
            name: &str,
            card_url: Option<&str>,
        ) -> Result<AgentRecord, PersistenceError> {
            Ok(AgentRecord::new(name, card_url.map(str::to_string)))
        }
        async fn update_stats(
            &self,
            _name: &str,
            _decision: Decision,
            _seen_at: DateTime<Utc>,
        ) -> Result<(), PersistenceError> {
            self.order.lock().push("registry");
            Ok(())
        }
        async fn get(&self, _name: &str) -> Result<Option<AgentRecord>, PersistenceError> {
            Ok(None)
        }
        async fn list(&self) -> Result<Vec<AgentRecord>, PersistenceError> {
            Ok(vec![])
        }
    }

    fn file_stores() -> (tempfile::TempDir, Arc<dyn AuditLog>, Arc<dyn AgentRegistry>) {
        let dir = tempfile::tempdir().unwrap();
        let audit = Arc::new(FileAuditLog::new(dir.path().join("verdicts")).unwrap());
        let registry = Arc::new(FileAgentRegistry::new(dir.path().join("agents")).unwrap());
        (dir, audit, registry)
    }

    // ── Tests ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_evaluate_produces_bounded_scores_and_persists() {
        let (_dir, audit, registry) = file_stores();
        let pipeline = real_pipeline(audit.clone(), registry.clone());
        let action = scale_up_action();

        let verdict = pipeline.evaluate(&action).await.unwrap();
        assert!((0.0..=100.0).contains(&verdict.sri.composite));
        for score in [
            verdict.sri.infrastructure,
            verdict.sri.policy,
            verdict.sri.historical,
            verdict.sri.cost,
        ] {
            assert!((0.0..=100.0).contains(&score));
        }

        // Verdict is retrievable and byte-equivalent.
        let stored = audit.get_by_id(verdict.action_id).await.unwrap();
        assert_eq!(
            serde_json::to_string(&stored).unwrap(),
            serde_json::to_string(&verdict).unwrap()
        );

        // Registry saw the decision.
        let record = registry.get("monitoring-agent").await.unwrap().unwrap();
        assert_eq!(record.total_proposed, 1);
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected_before_fan_out() {
        let (_dir, audit, registry) = file_stores();
        let pipeline = real_pipeline(audit.clone(), registry);
        let action = ProposedAction::new(ActionType::ScaleUp, ActionTarget::new("", "x"));

        assert!(matches!(
            pipeline.evaluate(&action).await,
            Err(GovernanceError::InvalidInput(_))
        ));
        assert!(audit.get_recent(10, None).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evaluators_run_concurrently() {
        let (_dir, audit, registry) = file_stores();
        let mut pipeline = real_pipeline(audit, registry);
        // Four evaluators, each sleeping one second.
        pipeline.blast = Arc::new(SlowEvaluator {
            delay: Duration::from_secs(1),
            result: BlastRadiusResult::neutral("slow"),
            dimension: SriDimension::Infrastructure,
        });
        pipeline.policy = Arc::new(SlowEvaluator {
            delay: Duration::from_secs(1),
            result: PolicyResult::neutral("slow"),
            dimension: SriDimension::Policy,
        });
        pipeline.historical = Arc::new(SlowEvaluator {
            delay: Duration::from_secs(1),
            result: HistoricalResult::neutral("slow"),
            dimension: SriDimension::Historical,
        });
        pipeline.financial = Arc::new(SlowEvaluator {
            delay: Duration::from_secs(1),
            result: FinancialResult::neutral("slow"),
            dimension: SriDimension::Cost,
        });

        let started = tokio::time::Instant::now();
        pipeline.evaluate(&scale_up_action()).await.unwrap();
        let elapsed = started.elapsed();
        // Wall time tracks the slowest evaluator, not the sum of four.
        assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_single_evaluator_failure_is_absorbed() {
        let (_dir, audit, registry) = file_stores();
        let mut pipeline = real_pipeline(audit.clone(), registry);
        pipeline.historical = Arc::new(FailingEvaluator::new(SriDimension::Historical));

        let verdict = pipeline.evaluate(&scale_up_action()).await.unwrap();
        assert_eq!(verdict.sri.historical, 50.0);
        assert!(verdict.reason.contains("historical evaluator unavailable"));
        // Still recorded.
        assert!(audit.get_by_id(verdict.action_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_all_evaluators_failing_is_internal_error() {
        let (_dir, audit, registry) = file_stores();
        let mut pipeline = real_pipeline(audit.clone(), registry);
        pipeline.blast = Arc::new(FailingEvaluator::new(SriDimension::Infrastructure));
        pipeline.policy = Arc::new(FailingEvaluator::new(SriDimension::Policy));
        pipeline.historical = Arc::new(FailingEvaluator::new(SriDimension::Historical));
        pipeline.financial = Arc::new(FailingEvaluator::new(SriDimension::Cost));

        assert!(matches!(
            pipeline.evaluate(&scale_up_action()).await,
            Err(GovernanceError::Internal(_))
        ));
        assert!(audit.get_recent(10, None).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evaluator_timeout_yields_neutral_score() {
        let (_dir, audit, registry) = file_stores();
        let mut pipeline = real_pipeline(audit, registry);
        pipeline.evaluator_timeout = Duration::from_millis(100);
        pipeline.historical = Arc::new(SlowEvaluator {
            delay: Duration::from_secs(60),
            result: HistoricalResult::neutral("never"),
            dimension: SriDimension::Historical,
        });

        let verdict = pipeline.evaluate(&scale_up_action()).await.unwrap();
        assert_eq!(verdict.sri.historical, 50.0);
        assert!(verdict.reason.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded_persists_nothing() {
        let (_dir, audit, registry) = file_stores();
        let mut pipeline = real_pipeline(audit.clone(), registry);
        pipeline.blast = Arc::new(SlowEvaluator {
            delay: Duration::from_secs(30),
            result: BlastRadiusResult::neutral("slow"),
            dimension: SriDimension::Infrastructure,
        });

        let deadline = tokio::time::Instant::now() + Duration::from_millis(50);
        let result = pipeline
            .evaluate_with_deadline(&scale_up_action(), Some(deadline))
            .await;
        assert!(matches!(result, Err(GovernanceError::DeadlineExceeded)));
        assert!(audit.get_recent(10, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_audit_write_happens_before_registry_update() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let probe = OrderProbe {
            order: order.clone(),
        };
        let pipeline = real_pipeline(Arc::new(probe.clone()), Arc::new(probe));

        pipeline.evaluate(&scale_up_action()).await.unwrap();
        assert_eq!(*order.lock(), vec!["audit", "registry"]);
    }

    #[tokio::test]
    async fn test_recording_same_verdict_twice_is_idempotent() {
        let (_dir, audit, registry) = file_stores();
        let pipeline = real_pipeline(audit.clone(), registry.clone());
        let action = scale_up_action();

        let verdict = pipeline.evaluate(&action).await.unwrap();
        // Replay the recording step with the identical verdict.
        pipeline.record(&action, &verdict).await;

        assert_eq!(audit.get_recent(10, None).await.unwrap().len(), 1);
        let record = registry.get("monitoring-agent").await.unwrap().unwrap();
        assert_eq!(record.total_proposed, 1);
    }

    #[tokio::test]
    async fn test_events_emitted_in_pipeline_order() {
        let (_dir, audit, registry) = file_stores();
        let pipeline = real_pipeline(audit, registry);
        let mut receiver = pipeline.events().subscribe();

        let verdict = pipeline.evaluate(&scale_up_action()).await.unwrap();

        let mut kinds = Vec::new();
        for _ in 0..7 {
            let event = receiver.recv().await.unwrap();
            assert_eq!(event.action_id(), verdict.action_id);
            kinds.push(match event {
                GovernanceEvent::EvaluationStarted { .. } => "started",
                GovernanceEvent::EvaluatorSettled { .. } => "settled",
                GovernanceEvent::VerdictReached { .. } => "reached",
                GovernanceEvent::VerdictRecorded { .. } => "recorded",
            });
        }
        assert_eq!(kinds[0], "started");
        assert_eq!(kinds[1..5], ["settled"; 4]);
        assert_eq!(kinds[5], "reached");
        assert_eq!(kinds[6], "recorded");
    }
}
