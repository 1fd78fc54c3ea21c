// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype injected into
//! the live-mode audit log and agent registry. Mock mode never touches this
//! module.

use anyhow::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the governance tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS governance_verdicts (
                action_id     UUID PRIMARY KEY,
                recorded_at   TIMESTAMPTZ NOT NULL,
                decision      TEXT NOT NULL,
                composite     DOUBLE PRECISION NOT NULL,
                resource_id   TEXT NOT NULL,
                agent_id      TEXT,
                record        JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_verdicts_recorded_at
                ON governance_verdicts (recorded_at DESC, action_id ASC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS governance_agents (
                name           TEXT PRIMARY KEY,
                registered_at  TIMESTAMPTZ NOT NULL,
                last_seen      TIMESTAMPTZ NOT NULL,
                total_proposed BIGINT NOT NULL DEFAULT 0,
                approved       BIGINT NOT NULL DEFAULT 0,
                escalated      BIGINT NOT NULL DEFAULT 0,
                denied         BIGINT NOT NULL DEFAULT 0,
                card_url       TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
