// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Engine Runtime - Component Wiring
//
// Builds the full governance engine from Settings: read stores, evaluators,
// decision engine, audit log, agent registry, event bus, and the optional
// narrator. Mock mode is fully file-backed and works offline; live mode
// moves the two mutable collaborators to PostgreSQL.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::application::decision::DecisionEngine;
use crate::application::evaluators::{
    BlastRadiusEvaluator, FinancialEvaluator, HistoricalEvaluator, PolicyComplianceEvaluator,
};
use crate::application::facade::GovernanceFacade;
use crate::application::pipeline::GovernancePipeline;
use crate::domain::repository::{AgentRegistry, AuditLog};
use crate::infrastructure::audit::{FileAuditLog, PostgresAuditLog};
use crate::infrastructure::config::Settings;
use crate::infrastructure::db::Database;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::narration::{Narrator, NoopNarrator, OpenAiNarrator};
use crate::infrastructure::registry::{FileAgentRegistry, PostgresAgentRegistry};
use crate::infrastructure::stores::{
    IncidentRanking, JsonIncidentStore, JsonPolicyStore, JsonTopologyStore,
};

/// A fully wired engine instance.
#[derive(Clone)]
pub struct Engine {
    pub facade: GovernanceFacade,
    pub settings: Arc<Settings>,
}

impl Engine {
    /// Wire every component from validated settings.
    pub async fn build(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let topology = Arc::new(
            JsonTopologyStore::load(settings.topology_path())
                .context("loading topology store")?,
        );
        let policies = Arc::new(
            JsonPolicyStore::load(settings.policies_path()).context("loading policy store")?,
        );
        let incidents = Arc::new(
            JsonIncidentStore::load(settings.incidents_path(), IncidentRanking::Bm25)
                .context("loading incident store")?,
        );

        let (audit, registry): (Arc<dyn AuditLog>, Arc<dyn AgentRegistry>) =
            if settings.use_local_mocks {
                info!(data_dir = %settings.data_dir.display(), "storage: local JSON files");
                (
                    Arc::new(FileAuditLog::new(settings.verdicts_dir())?),
                    Arc::new(FileAgentRegistry::new(settings.agents_dir())?),
                )
            } else {
                let url = settings
                    .database_url
                    .as_deref()
                    .context("SENTINEL_DATABASE_URL is required when local mocks are disabled")?;
                let db = Database::new(url).await.context("connecting to PostgreSQL")?;
                db.ensure_schema().await.context("creating schema")?;
                info!("storage: PostgreSQL");
                (
                    Arc::new(PostgresAuditLog::new(db.get_pool().clone())),
                    Arc::new(PostgresAgentRegistry::new(db.get_pool().clone())),
                )
            };

        let narrator: Arc<dyn Narrator> = match (&settings.narration_endpoint, &settings.narration_api_key) {
            (Some(endpoint), Some(api_key)) => {
                info!(%endpoint, model = %settings.narration_model, "narration enabled");
                Arc::new(OpenAiNarrator::new(
                    endpoint.clone(),
                    api_key.clone(),
                    settings.narration_model.clone(),
                ))
            }
            _ => Arc::new(NoopNarrator),
        };

        let pipeline = GovernancePipeline::new(
            Arc::new(BlastRadiusEvaluator::new(topology.clone())),
            Arc::new(PolicyComplianceEvaluator::new(policies, topology.clone())),
            Arc::new(HistoricalEvaluator::new(incidents)),
            Arc::new(FinancialEvaluator::new(topology)),
            DecisionEngine::new(settings.weights, settings.thresholds),
            audit,
            registry,
            EventBus::with_default_capacity(),
            settings.evaluator_timeout(),
        )
        .with_narrator(narrator);

        Ok(Self {
            facade: GovernanceFacade::new(Arc::new(pipeline)),
            settings: Arc::new(settings),
        })
    }
}
