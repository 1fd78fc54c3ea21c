use serde::{Deserialize, Serialize};

use crate::domain::policy::PolicySeverity;

/// A past operational incident used as a risk precedent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: String,
    pub title: String,
    pub summary: String,
    pub action_type: String,
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub severity: PolicySeverity,
    pub outcome_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_procedure: Option<String>,
}
