// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Sentinel governance engine
//!
//! Evaluates proposed infrastructure actions across four risk dimensions
//! and issues an approved / escalated / denied verdict.
//!
//! # Architecture
//!
//! - **domain** — actions, verdicts, policies, incidents, topology, errors
//! - **application** — pipeline, decision engine, evaluators, façade
//! - **infrastructure** — config, stores, audit log, registry, event bus
//! - **presentation** — A2A streaming HTTP, dashboard REST, stdio tools

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod runtime;

pub use domain::*;
