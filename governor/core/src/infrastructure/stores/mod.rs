// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Read-only data stores for the governance evaluators.
//
// All three stores are read-only at request time and hand out immutable
// snapshots; hot reload swaps the snapshot atomically so in-flight
// evaluations keep a consistent view.

pub mod incident;
pub mod policy;
pub mod topology;

pub use incident::{IncidentQuery, IncidentRanking, IncidentStore, JsonIncidentStore};
pub use policy::{JsonPolicyStore, PolicyStore};
pub use topology::{JsonTopologyStore, TopologySnapshot, TopologyStore};
