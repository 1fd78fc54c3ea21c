// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use colored::Colorize;
use tracing::info;

use sentinel_core::domain::events::GovernanceEvent;
use sentinel_core::presentation::{serve_http, stdio};

use super::build_engine;

/// Run the A2A streaming server and dashboard API.
pub async fn run_server() -> Result<()> {
    let engine = build_engine().await?;

    // Mirror pipeline progress into the server log.
    let mut events = engine.facade.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                GovernanceEvent::EvaluationStarted {
                    action_id,
                    action_type,
                    resource_id,
                    ..
                } => info!(%action_id, %action_type, %resource_id, "evaluation started"),
                GovernanceEvent::VerdictReached {
                    action_id,
                    decision,
                    composite,
                } => info!(%action_id, %decision, composite, "verdict reached"),
                _ => {}
            }
        }
    });

    println!(
        "{} listening on {} (card at /.well-known/agent-card.json)",
        "sentinel".green().bold(),
        engine.settings.bind_addr.cyan()
    );
    serve_http(engine.facade.clone(), &engine.settings).await
}

/// Serve the stdio tool protocol until stdin closes.
pub async fn run_stdio() -> Result<()> {
    let engine = build_engine().await?;
    stdio::serve(engine.facade).await
}
