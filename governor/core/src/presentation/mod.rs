// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod a2a;
pub mod dashboard;
pub mod jsonrpc;
pub mod stdio;

use axum::Router;

use crate::application::facade::GovernanceFacade;
use crate::infrastructure::config::Settings;

/// The full HTTP application: A2A surface at the root plus the read-only
/// dashboard API under `/api`.
pub fn http_app(facade: GovernanceFacade, settings: &Settings) -> Router {
    a2a::router(
        facade.clone(),
        &settings.server_url,
        settings.max_concurrent_evaluations,
    )
    .merge(dashboard::router(facade))
}

/// Bind and serve the HTTP application until the process is stopped.
pub async fn serve_http(facade: GovernanceFacade, settings: &Settings) -> anyhow::Result<()> {
    let app = http_app(facade, settings);
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(bind_addr = %settings.bind_addr, "HTTP surface listening");
    axum::serve(listener, app).await?;
    Ok(())
}
