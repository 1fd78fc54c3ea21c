// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Sentinel Rust SDK
//!
//! Submit proposed infrastructure actions to a running Sentinel governance
//! engine and read back verdicts, over the A2A surface or the dashboard API.

pub mod client;
pub mod types;

pub use client::SentinelClient;
pub use types::*;
