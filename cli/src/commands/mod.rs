// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod evaluate;
pub mod query;
pub mod serve;
pub mod submit;

use anyhow::Result;
use sentinel_core::infrastructure::config::Settings;
use sentinel_core::runtime::Engine;

/// Build an engine from the environment; shared by every local command.
pub async fn build_engine() -> Result<Engine> {
    let settings = Settings::from_env()?;
    Engine::build(settings).await
}
