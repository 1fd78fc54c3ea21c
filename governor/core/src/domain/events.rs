// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::action::{ActionId, ActionType};
use crate::domain::verdict::Decision;

/// One of the four scoring dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SriDimension {
    Infrastructure,
    Policy,
    Historical,
    Cost,
}

impl SriDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            SriDimension::Infrastructure => "infrastructure",
            SriDimension::Policy => "policy",
            SriDimension::Historical => "historical",
            SriDimension::Cost => "cost",
        }
    }
}

/// Domain events published on the in-process event bus while an action
/// moves through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GovernanceEvent {
    EvaluationStarted {
        action_id: ActionId,
        action_type: ActionType,
        resource_id: String,
        started_at: DateTime<Utc>,
    },
    EvaluatorSettled {
        action_id: ActionId,
        dimension: SriDimension,
        score: f64,
        failed: bool,
    },
    VerdictReached {
        action_id: ActionId,
        decision: Decision,
        composite: f64,
    },
    VerdictRecorded {
        action_id: ActionId,
    },
}

impl GovernanceEvent {
    pub fn action_id(&self) -> ActionId {
        match self {
            GovernanceEvent::EvaluationStarted { action_id, .. }
            | GovernanceEvent::EvaluatorSettled { action_id, .. }
            | GovernanceEvent::VerdictReached { action_id, .. }
            | GovernanceEvent::VerdictRecorded { action_id } => *action_id,
        }
    }
}
