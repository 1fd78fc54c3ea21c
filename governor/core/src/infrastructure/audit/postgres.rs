// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Audit Log
//!
//! Live-mode `AuditLog` backed by the `governance_verdicts` table. The full
//! [`AuditRecord`] lives in a JSONB column; indexed columns exist only for
//! ordering and filtering. Insert-or-ignore on `action_id` gives the
//! write-once / dedup contract directly from the database.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::action::ActionId;
use crate::domain::error::PersistenceError;
use crate::domain::repository::{
    aggregate_from, clamp_limit, profile_from, AuditAggregate, AuditLog, AuditRecord,
    RecordOutcome, RiskProfile, VerdictSummary,
};
use crate::domain::verdict::GovernanceVerdict;

pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn summary_from_row(row: &sqlx::postgres::PgRow) -> Result<VerdictSummary, PersistenceError> {
        let record: serde_json::Value = row.get("record");
        let record: AuditRecord = serde_json::from_value(record)?;
        Ok(record.summary())
    }

    /// Filtered summaries; `clause` must reference the filter as `$1`.
    async fn summaries_where(
        &self,
        clause: &str,
        param: &str,
        limit: Option<i64>,
    ) -> Result<Vec<VerdictSummary>, PersistenceError> {
        let sql = format!(
            "SELECT record FROM governance_verdicts {clause} \
             ORDER BY recorded_at DESC, action_id ASC {}",
            if limit.is_some() { "LIMIT $2" } else { "" },
        );
        let mut query = sqlx::query(&sql).bind(param);
        if let Some(limit) = limit {
            query = query.bind(limit);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::summary_from_row).collect()
    }

    async fn summaries_limit_only(
        &self,
        limit: i64,
    ) -> Result<Vec<VerdictSummary>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT record FROM governance_verdicts \
             ORDER BY recorded_at DESC, action_id ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::summary_from_row).collect()
    }
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    async fn record(&self, record: &AuditRecord) -> Result<RecordOutcome, PersistenceError> {
        let payload = serde_json::to_value(record)?;
        let result = sqlx::query(
            r#"
            INSERT INTO governance_verdicts
                (action_id, recorded_at, decision, composite, resource_id, agent_id, record)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (action_id) DO NOTHING
            "#,
        )
        .bind(record.verdict.action_id.0)
        .bind(record.verdict.timestamp)
        .bind(record.verdict.decision.as_str())
        .bind(record.verdict.sri.composite)
        .bind(&record.resource_id)
        .bind(record.agent_id.as_deref())
        .bind(payload)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(RecordOutcome::Duplicate)
        } else {
            Ok(RecordOutcome::Inserted)
        }
    }

    async fn get_recent(
        &self,
        limit: usize,
        resource_filter: Option<&str>,
    ) -> Result<Vec<VerdictSummary>, PersistenceError> {
        let limit = clamp_limit(limit) as i64;
        match resource_filter {
            Some(fragment) => {
                self.summaries_where(
                    "WHERE resource_id LIKE '%' || $1 || '%'",
                    fragment,
                    Some(limit),
                )
                .await
            }
            None => self.summaries_limit_only(limit).await,
        }
    }

    async fn get_by_id(&self, action_id: ActionId) -> Result<GovernanceVerdict, PersistenceError> {
        let row = sqlx::query("SELECT record FROM governance_verdicts WHERE action_id = $1")
            .bind(action_id.0)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PersistenceError::NotFound(action_id.to_string()))?;
        let record: serde_json::Value = row.get("record");
        let record: AuditRecord = serde_json::from_value(record)?;
        Ok(record.verdict)
    }

    async fn get_by_agent(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<VerdictSummary>, PersistenceError> {
        let limit = clamp_limit(limit) as i64;
        self.summaries_where("WHERE agent_id = $1", agent_id, Some(limit))
            .await
    }

    async fn aggregate(&self) -> Result<AuditAggregate, PersistenceError> {
        let rows = sqlx::query(
            "SELECT record FROM governance_verdicts ORDER BY recorded_at DESC, action_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        let summaries: Result<Vec<VerdictSummary>, _> =
            rows.iter().map(Self::summary_from_row).collect();
        Ok(aggregate_from(&summaries?))
    }

    async fn risk_profile(&self, resource_id: &str) -> Result<RiskProfile, PersistenceError> {
        let summaries = self
            .summaries_where(
                "WHERE resource_id LIKE '%' || $1 || '%'",
                resource_id,
                None,
            )
            .await?;
        Ok(profile_from(resource_id, &summaries))
    }
}
