// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// The four deterministic scoring evaluators behind the SRI dimensions.
//
// Each evaluator is independent, side-effect free, and produces its typed
// result without any LLM involvement. The pipeline runs all four
// concurrently and absorbs individual failures into a neutral score.

pub mod blast_radius;
pub mod financial;
pub mod historical;
pub mod policy_compliance;

pub use blast_radius::BlastRadiusEvaluator;
pub use financial::FinancialEvaluator;
pub use historical::HistoricalEvaluator;
pub use policy_compliance::PolicyComplianceEvaluator;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::action::ProposedAction;
use crate::domain::error::StoreError;
use crate::domain::events::SriDimension;

/// Internal evaluator failure. Absorbed by the pipeline: the dimension
/// falls back to a neutral 50.0 and the failure is noted in the verdict.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("store lookup failed: {0}")]
    Store(#[from] StoreError),

    #[error("evaluator failed: {0}")]
    Internal(String),
}

/// One risk dimension scorer. Implementations must be safe to call
/// concurrently and must return promptly on cancellation.
#[async_trait]
pub trait RiskEvaluator: Send + Sync {
    type Output: Send;

    fn dimension(&self) -> SriDimension;

    async fn evaluate(&self, action: &ProposedAction) -> Result<Self::Output, EvaluatorError>;
}
