// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// In-Process Invocation Surface
//
// Typed façade over the pipeline and the two mutable stores. The HTTP and
// stdio surfaces translate their wire formats and call into this; tests use
// it directly. Every surface converges here, so behaviour cannot drift
// between transports.

use std::sync::Arc;

use crate::application::pipeline::GovernancePipeline;
use crate::domain::action::{ActionId, ProposedAction};
use crate::domain::agent::AgentRecord;
use crate::domain::error::{GovernanceError, PersistenceError};
use crate::domain::repository::{AuditAggregate, RiskProfile, VerdictSummary};
use crate::domain::verdict::GovernanceVerdict;
use crate::infrastructure::event_bus::EventBus;

/// The in-process governance surface.
#[derive(Clone)]
pub struct GovernanceFacade {
    pipeline: Arc<GovernancePipeline>,
}

impl GovernanceFacade {
    pub fn new(pipeline: Arc<GovernancePipeline>) -> Self {
        Self { pipeline }
    }

    pub fn events(&self) -> &EventBus {
        self.pipeline.events()
    }

    /// Evaluate a proposed action through the full pipeline.
    pub async fn evaluate_action(
        &self,
        action: &ProposedAction,
    ) -> Result<GovernanceVerdict, GovernanceError> {
        self.pipeline.evaluate(action).await
    }

    /// Evaluate with a caller-provided deadline.
    pub async fn evaluate_action_with_deadline(
        &self,
        action: &ProposedAction,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<GovernanceVerdict, GovernanceError> {
        self.pipeline.evaluate_with_deadline(action, deadline).await
    }

    /// Recent verdicts, newest first; `limit` clamps to `[1, 100]`.
    pub async fn recent_decisions(
        &self,
        limit: usize,
        resource_filter: Option<&str>,
    ) -> Result<Vec<VerdictSummary>, PersistenceError> {
        self.pipeline.audit().get_recent(limit, resource_filter).await
    }

    pub async fn decision(&self, action_id: ActionId) -> Result<GovernanceVerdict, PersistenceError> {
        self.pipeline.audit().get_by_id(action_id).await
    }

    /// Aggregated risk history for one resource.
    pub async fn risk_profile(&self, resource_id: &str) -> Result<RiskProfile, PersistenceError> {
        self.pipeline.audit().risk_profile(resource_id).await
    }

    /// Dashboard metrics over the whole audit trail.
    pub async fn metrics(&self) -> Result<AuditAggregate, PersistenceError> {
        self.pipeline.audit().aggregate().await
    }

    pub async fn register_agent(
        &self,
        name: &str,
        card_url: Option<&str>,
    ) -> Result<AgentRecord, PersistenceError> {
        self.pipeline.registry().register(name, card_url).await
    }

    /// All known agents, newest `last_seen` first.
    pub async fn agents(&self) -> Result<Vec<AgentRecord>, PersistenceError> {
        self.pipeline.registry().list().await
    }

    /// Recent verdicts proposed by one agent (joins the audit log).
    pub async fn agent_history(
        &self,
        name: &str,
        limit: usize,
    ) -> Result<Vec<VerdictSummary>, PersistenceError> {
        self.pipeline.audit().get_by_agent(name, limit).await
    }
}
