// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Governance Policy Domain
//!
//! Data-driven policies evaluated against every proposed action. Each policy
//! carries a [`PolicyPredicate`] — a tagged variant over the supported
//! predicate kinds, each with its own validated parameters. Policies that
//! fail to parse at startup are a configuration error, never a silent skip.
//!
//! ## Predicate kinds
//!
//! | Kind | Fires when |
//! |------|------------|
//! | `tag_match` | target tag `key == value` AND action_type ∈ `actions` |
//! | `action_in` | action_type ∈ `actions` |
//! | `time_window` | action timestamp (UTC) inside a recurring weekly window |
//! | `resource_type_in` | target resource_type ∈ `types` |
//! | `env_requires_review` | target `environment` tag ∈ {production, prod} |
//! | `min_dependents` | target has ≥ `min` dependents AND action is destructive |
//!
//! Window endpoints are start-inclusive, end-exclusive. Wrap-around windows
//! (e.g. Friday 17:00 → Monday 08:00) are supported.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::action::{ActionType, ProposedAction};
use crate::domain::topology::Resource;

/// Severity attached to policies and incidents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl PolicySeverity {
    /// Ordering rank for violation sorting: critical first.
    pub fn rank(&self) -> u8 {
        match self {
            PolicySeverity::Critical => 0,
            PolicySeverity::High => 1,
            PolicySeverity::Medium => 2,
            PolicySeverity::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicySeverity::Critical => "critical",
            PolicySeverity::High => "high",
            PolicySeverity::Medium => "medium",
            PolicySeverity::Low => "low",
        }
    }
}

impl std::fmt::Display for PolicySeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Day of week used in change windows. Monday = 0 … Sunday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl WeekDay {
    pub fn num(&self) -> u8 {
        match self {
            WeekDay::Monday => 0,
            WeekDay::Tuesday => 1,
            WeekDay::Wednesday => 2,
            WeekDay::Thursday => 3,
            WeekDay::Friday => 4,
            WeekDay::Saturday => 5,
            WeekDay::Sunday => 6,
        }
    }
}

/// Minute-precision time of day, parsed from `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay(pub u16);

impl TimeOfDay {
    pub fn minutes(&self) -> u16 {
        self.0
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid time '{s}': expected HH:MM"))?;
        let hours: u16 = h.parse().map_err(|_| format!("invalid hour in '{s}'"))?;
        let minutes: u16 = m.parse().map_err(|_| format!("invalid minute in '{s}'"))?;
        if hours > 23 || minutes > 59 {
            return Err(format!("time '{s}' out of range"));
        }
        Ok(TimeOfDay(hours * 60 + minutes))
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Typed decision function over `(action, target resource)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyPredicate {
    /// Target tag `key` equals `value` and the action is in `actions`.
    TagMatch {
        key: String,
        value: String,
        actions: HashSet<ActionType>,
    },
    /// Action type is in `actions`.
    ActionIn { actions: HashSet<ActionType> },
    /// Action timestamp falls inside a recurring weekly window.
    TimeWindow {
        day_start: WeekDay,
        day_end: WeekDay,
        time_start: TimeOfDay,
        time_end: TimeOfDay,
    },
    /// Target resource type is in `types`.
    ResourceTypeIn { types: HashSet<String> },
    /// Target's `environment` tag marks it as production.
    EnvRequiresReview,
    /// Target has at least `min` dependents and the action is destructive.
    MinDependents { min: usize },
}

/// A predicate that fired, with an optional rationale for the verdict text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateHit {
    pub rationale: Option<String>,
}

impl PolicyPredicate {
    /// Evaluate this predicate against the action and its resolved target.
    ///
    /// Returns `Some` when the predicate fires.
    pub fn evaluate(
        &self,
        action: &ProposedAction,
        resource: Option<&Resource>,
    ) -> Option<PredicateHit> {
        match self {
            PolicyPredicate::TagMatch {
                key,
                value,
                actions,
            } => {
                let resource = resource?;
                if resource.tag(key) == Some(value.as_str())
                    && actions.contains(&action.action_type)
                {
                    Some(PredicateHit {
                        rationale: Some(format!(
                            "'{}' is tagged {key}={value}",
                            resource.name
                        )),
                    })
                } else {
                    None
                }
            }
            PolicyPredicate::ActionIn { actions } => actions
                .contains(&action.action_type)
                .then(|| PredicateHit { rationale: None }),
            PolicyPredicate::TimeWindow {
                day_start,
                day_end,
                time_start,
                time_end,
            } => {
                use chrono::{Datelike, Timelike};
                let wd = action.timestamp.weekday().num_days_from_monday() as u8;
                let minute_of_day =
                    (action.timestamp.hour() * 60 + action.timestamp.minute()) as u16;
                in_window(
                    wd,
                    minute_of_day,
                    day_start.num(),
                    day_end.num(),
                    time_start.minutes(),
                    time_end.minutes(),
                )
                .then(|| PredicateHit {
                    rationale: Some(format!(
                        "timestamp falls inside blocked window {day_start:?} {time_start} – {day_end:?} {time_end}"
                    )),
                })
            }
            PolicyPredicate::ResourceTypeIn { types } => types
                .contains(&action.target.resource_type)
                .then(|| PredicateHit { rationale: None }),
            PolicyPredicate::EnvRequiresReview => {
                let resource = resource?;
                resource.is_production().then(|| PredicateHit {
                    rationale: Some(format!("'{}' is a production resource", resource.name)),
                })
            }
            PolicyPredicate::MinDependents { min } => {
                let resource = resource?;
                (resource.dependents.len() >= *min && action.action_type.is_destructive()).then(
                    || PredicateHit {
                        rationale: Some(format!(
                            "'{}' has {} dependents",
                            resource.name,
                            resource.dependents.len()
                        )),
                    },
                )
            }
        }
    }
}

/// Recurring weekly window membership. Start inclusive, end exclusive.
///
/// Three window shapes:
/// - same-day (`Monday 17:00 – Monday 20:00`)
/// - forward multi-day within the week (`Tuesday 09:00 – Thursday 17:00`)
/// - wrap-around over the week boundary (`Friday 17:00 – Monday 08:00`)
fn in_window(wd: u8, minute: u16, s_day: u8, e_day: u8, s_min: u16, e_min: u16) -> bool {
    if s_day == e_day {
        wd == s_day && s_min <= minute && minute < e_min
    } else if s_day < e_day {
        (s_day < wd && wd < e_day)
            || (wd == s_day && minute >= s_min)
            || (wd == e_day && minute < e_min)
    } else {
        (wd > s_day || wd < e_day)
            || (wd == s_day && minute >= s_min)
            || (wd == e_day && minute < e_min)
    }
}

/// A governance policy as loaded from the policy store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub policy_id: String,
    pub severity: PolicySeverity,
    pub description: String,
    pub predicate: PolicyPredicate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::ActionTarget;
    use chrono::{TimeZone, Utc};

    fn action_at(ts: chrono::DateTime<Utc>) -> ProposedAction {
        let mut action = ProposedAction::new(
            ActionType::UpdateConfig,
            ActionTarget::new("vm-23", "Microsoft.Compute/virtualMachines"),
        );
        action.timestamp = ts;
        action
    }

    fn monday_window() -> PolicyPredicate {
        PolicyPredicate::TimeWindow {
            day_start: WeekDay::Monday,
            day_end: WeekDay::Monday,
            time_start: "17:00".parse().unwrap(),
            time_end: "20:00".parse().unwrap(),
        }
    }

    // ── TimeWindow boundaries ────────────────────────────────────────────

    #[test]
    fn test_same_day_window_start_inclusive_end_exclusive() {
        let window = monday_window();
        // 2025-06-02 is a Monday.
        let cases = [
            (Utc.with_ymd_and_hms(2025, 6, 2, 16, 59, 59).unwrap(), false),
            (Utc.with_ymd_and_hms(2025, 6, 2, 17, 0, 0).unwrap(), true),
            (Utc.with_ymd_and_hms(2025, 6, 2, 19, 59, 59).unwrap(), true),
            (Utc.with_ymd_and_hms(2025, 6, 2, 20, 0, 0).unwrap(), false),
        ];
        for (ts, expect) in cases {
            let fired = window.evaluate(&action_at(ts), None).is_some();
            assert_eq!(fired, expect, "at {ts}");
        }
    }

    #[test]
    fn test_same_day_window_other_weekday_does_not_fire() {
        let window = monday_window();
        // Tuesday 18:00: right hours, wrong day.
        let ts = Utc.with_ymd_and_hms(2025, 6, 3, 18, 0, 0).unwrap();
        assert!(window.evaluate(&action_at(ts), None).is_none());
    }

    #[test]
    fn test_forward_multi_day_window() {
        let window = PolicyPredicate::TimeWindow {
            day_start: WeekDay::Tuesday,
            day_end: WeekDay::Thursday,
            time_start: "09:00".parse().unwrap(),
            time_end: "17:00".parse().unwrap(),
        };
        // Wednesday any time is inside.
        let wed = Utc.with_ymd_and_hms(2025, 6, 4, 2, 0, 0).unwrap();
        assert!(window.evaluate(&action_at(wed), None).is_some());
        // Tuesday before start is outside; after start inside.
        let tue_early = Utc.with_ymd_and_hms(2025, 6, 3, 8, 59, 0).unwrap();
        assert!(window.evaluate(&action_at(tue_early), None).is_none());
        let tue_in = Utc.with_ymd_and_hms(2025, 6, 3, 9, 0, 0).unwrap();
        assert!(window.evaluate(&action_at(tue_in), None).is_some());
        // Thursday end is exclusive.
        let thu_end = Utc.with_ymd_and_hms(2025, 6, 5, 17, 0, 0).unwrap();
        assert!(window.evaluate(&action_at(thu_end), None).is_none());
        let thu_in = Utc.with_ymd_and_hms(2025, 6, 5, 16, 59, 0).unwrap();
        assert!(window.evaluate(&action_at(thu_in), None).is_some());
    }

    #[test]
    fn test_wraparound_weekend_window() {
        // Friday 17:00 → Monday 08:00.
        let window = PolicyPredicate::TimeWindow {
            day_start: WeekDay::Friday,
            day_end: WeekDay::Monday,
            time_start: "17:00".parse().unwrap(),
            time_end: "08:00".parse().unwrap(),
        };
        // Saturday (2025-06-07) and Sunday (2025-06-08), any time of day.
        let sat = Utc.with_ymd_and_hms(2025, 6, 7, 12, 0, 0).unwrap();
        assert!(window.evaluate(&action_at(sat), None).is_some());
        let sun = Utc.with_ymd_and_hms(2025, 6, 8, 23, 30, 0).unwrap();
        assert!(window.evaluate(&action_at(sun), None).is_some());
        // Friday before 17:00 outside, after inside.
        let fri_day = Utc.with_ymd_and_hms(2025, 6, 6, 12, 0, 0).unwrap();
        assert!(window.evaluate(&action_at(fri_day), None).is_none());
        let fri_eve = Utc.with_ymd_and_hms(2025, 6, 6, 17, 0, 0).unwrap();
        assert!(window.evaluate(&action_at(fri_eve), None).is_some());
        // Monday before 08:00 inside, from 08:00 outside.
        let mon_early = Utc.with_ymd_and_hms(2025, 6, 9, 7, 59, 0).unwrap();
        assert!(window.evaluate(&action_at(mon_early), None).is_some());
        let mon_late = Utc.with_ymd_and_hms(2025, 6, 9, 8, 0, 0).unwrap();
        assert!(window.evaluate(&action_at(mon_late), None).is_none());
        // Midweek outside.
        let wed = Utc.with_ymd_and_hms(2025, 6, 11, 12, 0, 0).unwrap();
        assert!(window.evaluate(&action_at(wed), None).is_none());
    }

    // ── Other predicates ─────────────────────────────────────────────────

    fn dr_resource() -> Resource {
        serde_json::from_value(serde_json::json!({
            "name": "vm-dr-01",
            "type": "Microsoft.Compute/virtualMachines",
            "tags": {"disaster-recovery": "true", "environment": "production"},
            "dependents": ["dr-failover-service", "backup-coordinator"]
        }))
        .unwrap()
    }

    #[test]
    fn test_tag_match_requires_action_in_set() {
        let predicate = PolicyPredicate::TagMatch {
            key: "disaster-recovery".to_string(),
            value: "true".to_string(),
            actions: [ActionType::DeleteResource, ActionType::ScaleDown]
                .into_iter()
                .collect(),
        };
        let resource = dr_resource();

        let delete = ProposedAction::new(
            ActionType::DeleteResource,
            ActionTarget::new("vm-dr-01", "Microsoft.Compute/virtualMachines"),
        );
        assert!(predicate.evaluate(&delete, Some(&resource)).is_some());

        let restart = ProposedAction::new(
            ActionType::RestartService,
            ActionTarget::new("vm-dr-01", "Microsoft.Compute/virtualMachines"),
        );
        assert!(predicate.evaluate(&restart, Some(&resource)).is_none());

        // Unknown resource: tag predicates cannot fire.
        assert!(predicate.evaluate(&delete, None).is_none());
    }

    #[test]
    fn test_env_requires_review_fires_on_production() {
        let predicate = PolicyPredicate::EnvRequiresReview;
        let action = ProposedAction::new(
            ActionType::UpdateConfig,
            ActionTarget::new("vm-dr-01", "Microsoft.Compute/virtualMachines"),
        );
        assert!(predicate.evaluate(&action, Some(&dr_resource())).is_some());

        let dev: Resource = serde_json::from_value(serde_json::json!({
            "name": "vm-dev", "type": "x", "tags": {"environment": "dev"}
        }))
        .unwrap();
        assert!(predicate.evaluate(&action, Some(&dev)).is_none());
    }

    #[test]
    fn test_min_dependents_requires_destructive_action() {
        let predicate = PolicyPredicate::MinDependents { min: 2 };
        let resource = dr_resource();

        let delete = ProposedAction::new(
            ActionType::DeleteResource,
            ActionTarget::new("vm-dr-01", "Microsoft.Compute/virtualMachines"),
        );
        assert!(predicate.evaluate(&delete, Some(&resource)).is_some());

        let scale_up = ProposedAction::new(
            ActionType::ScaleUp,
            ActionTarget::new("vm-dr-01", "Microsoft.Compute/virtualMachines"),
        );
        assert!(predicate.evaluate(&scale_up, Some(&resource)).is_none());
    }

    #[test]
    fn test_predicate_json_format() {
        let json = r#"{
            "kind": "tag_match",
            "key": "disaster-recovery",
            "value": "true",
            "actions": ["delete_resource", "scale_down"]
        }"#;
        let predicate: PolicyPredicate = serde_json::from_str(json).unwrap();
        assert!(matches!(predicate, PolicyPredicate::TagMatch { .. }));

        let json = r#"{
            "kind": "time_window",
            "day_start": "Friday", "day_end": "Monday",
            "time_start": "17:00", "time_end": "08:00"
        }"#;
        let predicate: PolicyPredicate = serde_json::from_str(json).unwrap();
        assert!(matches!(predicate, PolicyPredicate::TimeWindow { .. }));
    }

    #[test]
    fn test_invalid_time_rejected() {
        assert!("25:00".parse::<TimeOfDay>().is_err());
        assert!("17:75".parse::<TimeOfDay>().is_err());
        assert!("1700".parse::<TimeOfDay>().is_err());
        assert_eq!("17:05".parse::<TimeOfDay>().unwrap().minutes(), 17 * 60 + 5);
    }
}
