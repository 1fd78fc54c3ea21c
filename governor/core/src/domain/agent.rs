use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::verdict::Decision;

/// Per-agent statistics tracked by the registry. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    pub registered_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub total_proposed: u64,
    pub approved: u64,
    pub escalated: u64,
    pub denied: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_url: Option<String>,
}

impl AgentRecord {
    pub fn new(name: impl Into<String>, card_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            registered_at: now,
            last_seen: now,
            total_proposed: 0,
            approved: 0,
            escalated: 0,
            denied: 0,
            card_url,
        }
    }

    /// Apply one verdict outcome: bump `total_proposed` and the matching
    /// counter, advance `last_seen` monotonically.
    pub fn apply_decision(&mut self, decision: Decision, seen_at: DateTime<Utc>) {
        self.total_proposed += 1;
        match decision {
            Decision::Approved => self.approved += 1,
            Decision::Escalated => self.escalated += 1,
            Decision::Denied => self.denied += 1,
        }
        if seen_at > self.last_seen {
            self.last_seen = seen_at;
        }
    }
}
