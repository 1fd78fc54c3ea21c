use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for one governance evaluation.
///
/// Assigned by the engine when the proposing agent does not supply one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Kinds of infrastructure mutations operational agents can propose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ScaleUp,
    ScaleDown,
    DeleteResource,
    RestartService,
    ModifyNsg,
    CreateResource,
    UpdateConfig,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::ScaleUp => "scale_up",
            ActionType::ScaleDown => "scale_down",
            ActionType::DeleteResource => "delete_resource",
            ActionType::RestartService => "restart_service",
            ActionType::ModifyNsg => "modify_nsg",
            ActionType::CreateResource => "create_resource",
            ActionType::UpdateConfig => "update_config",
        }
    }

    /// Actions that can break resources depending on the target.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            ActionType::DeleteResource
                | ActionType::ScaleDown
                | ActionType::RestartService
                | ActionType::ModifyNsg
        )
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Medium
    }
}

/// Target resource of a proposed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionTarget {
    pub resource_id: String,
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_monthly_cost: Option<f64>,
}

impl ActionTarget {
    pub fn new(resource_id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            current_sku: None,
            proposed_sku: None,
            current_monthly_cost: None,
        }
    }

    /// Short name of the target: the final segment of a full provider path
    /// (`/subscriptions/.../virtualMachines/vm-23` → `vm-23`), or the id
    /// itself when it carries no path separators.
    pub fn short_name(&self) -> &str {
        self.resource_id
            .rsplit('/')
            .next()
            .unwrap_or(&self.resource_id)
    }
}

/// An infrastructure mutation proposed by an operational agent.
///
/// Immutable after acceptance by the pipeline. `resource_id` and
/// `action_type` are the only required fields; everything else defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    #[serde(default)]
    pub action_id: ActionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub action_type: ActionType,
    pub target: ActionTarget,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected_savings_monthly: Option<f64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ProposedAction {
    pub fn new(action_type: ActionType, target: ActionTarget) -> Self {
        Self {
            action_id: ActionId::new(),
            agent_id: None,
            action_type,
            target,
            reason: String::new(),
            urgency: Urgency::default(),
            projected_savings_monthly: None,
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}
