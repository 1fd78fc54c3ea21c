// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use thiserror::Error;

/// Errors surfaced to callers of the governance pipeline.
///
/// Evaluator and persistence failures are absorbed inside the pipeline
/// (neutral sub-score / logged warning) and never appear here.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// The submitted action failed schema or type validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The caller-provided deadline expired before composition.
    #[error("deadline exceeded before verdict composition")]
    DeadlineExceeded,

    /// All four evaluators fatally failed.
    #[error("internal error: {0}")]
    Internal(String),

    /// Streaming-surface admission refused the request.
    #[error("rate limited: {0} concurrent evaluations in flight")]
    RateLimited(usize),
}

/// Startup configuration problems. Fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SRI weights must sum to 1.0 (got {0})")]
    WeightSum(f64),

    #[error("invalid thresholds: auto_approve {auto} must be <= human_review {human}, both in [0, 100]")]
    Thresholds { auto: f64, human: f64 },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("cannot load {path}: {reason}")]
    DataFile { path: String, reason: String },

    #[error("policy '{policy_id}' failed to parse: {reason}")]
    BadPolicy { policy_id: String, reason: String },
}

/// Failures from read-only data stores.
///
/// Evaluators absorb these and treat them as "no data".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lookup failed: {0}")]
    Lookup(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Failures from the audit log and agent registry writers.
///
/// Logged as warnings; the verdict still flows back to the caller.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => PersistenceError::NotFound("row not found".to_string()),
            other => PersistenceError::Database(other.to_string()),
        }
    }
}
