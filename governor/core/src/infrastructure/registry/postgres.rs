// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Agent Registry
//!
//! Live-mode `AgentRegistry` backed by the `governance_agents` table.
//! Counter updates are a single `INSERT … ON CONFLICT DO UPDATE` statement,
//! so concurrent verdicts for the same agent serialize on the row and the
//! `total_proposed = approved + escalated + denied` invariant holds at every
//! observable point.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::agent::AgentRecord;
use crate::domain::error::PersistenceError;
use crate::domain::repository::AgentRegistry;
use crate::domain::verdict::Decision;

pub struct PostgresAgentRegistry {
    pool: PgPool,
}

impl PostgresAgentRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn record_from_row(row: &sqlx::postgres::PgRow) -> AgentRecord {
        AgentRecord {
            name: row.get("name"),
            registered_at: row.get("registered_at"),
            last_seen: row.get("last_seen"),
            total_proposed: row.get::<i64, _>("total_proposed") as u64,
            approved: row.get::<i64, _>("approved") as u64,
            escalated: row.get::<i64, _>("escalated") as u64,
            denied: row.get::<i64, _>("denied") as u64,
            card_url: row.get("card_url"),
        }
    }
}

#[async_trait]
impl AgentRegistry for PostgresAgentRegistry {
    async fn register(
        &self,
        name: &str,
        card_url: Option<&str>,
    ) -> Result<AgentRecord, PersistenceError> {
        let row = sqlx::query(
            r#"
            INSERT INTO governance_agents (name, registered_at, last_seen, card_url)
            VALUES ($1, $2, $2, $3)
            ON CONFLICT (name) DO UPDATE SET
                last_seen = EXCLUDED.last_seen,
                card_url = COALESCE(EXCLUDED.card_url, governance_agents.card_url)
            RETURNING name, registered_at, last_seen, total_proposed,
                      approved, escalated, denied, card_url
            "#,
        )
        .bind(name)
        .bind(Utc::now())
        .bind(card_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(Self::record_from_row(&row))
    }

    async fn update_stats(
        &self,
        name: &str,
        decision: Decision,
        seen_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let (approved, escalated, denied): (i64, i64, i64) = match decision {
            Decision::Approved => (1, 0, 0),
            Decision::Escalated => (0, 1, 0),
            Decision::Denied => (0, 0, 1),
        };
        sqlx::query(
            r#"
            INSERT INTO governance_agents
                (name, registered_at, last_seen, total_proposed, approved, escalated, denied)
            VALUES ($1, $2, $2, 1, $3, $4, $5)
            ON CONFLICT (name) DO UPDATE SET
                total_proposed = governance_agents.total_proposed + 1,
                approved = governance_agents.approved + $3,
                escalated = governance_agents.escalated + $4,
                denied = governance_agents.denied + $5,
                last_seen = GREATEST(governance_agents.last_seen, $2)
            "#,
        )
        .bind(name)
        .bind(seen_at)
        .bind(approved)
        .bind(escalated)
        .bind(denied)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<AgentRecord>, PersistenceError> {
        let row = sqlx::query(
            "SELECT name, registered_at, last_seen, total_proposed, \
                    approved, escalated, denied, card_url \
             FROM governance_agents WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(Self::record_from_row))
    }

    async fn list(&self) -> Result<Vec<AgentRecord>, PersistenceError> {
        let rows = sqlx::query(
            "SELECT name, registered_at, last_seen, total_proposed, \
                    approved, escalated, denied, card_url \
             FROM governance_agents ORDER BY last_seen DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::record_from_row).collect())
    }
}
