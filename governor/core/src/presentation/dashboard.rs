// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Dashboard REST Surface - Read-Only Queries
//
// Serves governance data to the dashboard frontend. Strictly read-only over
// the audit log and agent registry; list limits clamp to [1, 100] with a
// default of 20.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::application::facade::GovernanceFacade;
use crate::domain::action::ActionId;
use crate::domain::error::PersistenceError;

const DEFAULT_LIMIT: usize = 20;

pub struct DashboardState {
    pub facade: GovernanceFacade,
}

/// Build the read-only dashboard router, mounted under `/api`.
pub fn router(facade: GovernanceFacade) -> Router {
    Router::new()
        .route("/api/evaluations", get(list_evaluations))
        .route("/api/evaluations/:id", get(get_evaluation))
        .route("/api/metrics", get(metrics))
        .route("/api/resources/:id/risk", get(resource_risk))
        .route("/api/agents", get(list_agents))
        .route("/api/agents/:name/history", get(agent_history))
        .with_state(Arc::new(DashboardState { facade }))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<usize>,
    resource_id: Option<String>,
}

fn persistence_error(error: PersistenceError) -> Response {
    match error {
        PersistenceError::NotFound(what) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("not found: {what}")})),
        )
            .into_response(),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": other.to_string()})),
        )
            .into_response(),
    }
}

async fn list_evaluations(
    State(state): State<Arc<DashboardState>>,
    Query(params): Query<ListParams>,
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    match state
        .facade
        .recent_decisions(limit, params.resource_id.as_deref())
        .await
    {
        Ok(summaries) => Json(json!({
            "count": summaries.len(),
            "evaluations": summaries,
        }))
        .into_response(),
        Err(error) => persistence_error(error),
    }
}

async fn get_evaluation(
    State(state): State<Arc<DashboardState>>,
    Path(id): Path<String>,
) -> Response {
    let Ok(action_id) = id.parse::<uuid::Uuid>().map(ActionId) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid action id"})),
        )
            .into_response();
    };
    match state.facade.decision(action_id).await {
        Ok(verdict) => Json(verdict).into_response(),
        Err(error) => persistence_error(error),
    }
}

async fn metrics(State(state): State<Arc<DashboardState>>) -> Response {
    match state.facade.metrics().await {
        Ok(aggregate) => Json(aggregate).into_response(),
        Err(error) => persistence_error(error),
    }
}

async fn resource_risk(
    State(state): State<Arc<DashboardState>>,
    Path(id): Path<String>,
) -> Response {
    match state.facade.risk_profile(&id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(error) => persistence_error(error),
    }
}

async fn list_agents(State(state): State<Arc<DashboardState>>) -> Response {
    match state.facade.agents().await {
        Ok(agents) => Json(json!({
            "count": agents.len(),
            "agents": agents,
        }))
        .into_response(),
        Err(error) => persistence_error(error),
    }
}

async fn agent_history(
    State(state): State<Arc<DashboardState>>,
    Path(name): Path<String>,
    Query(params): Query<ListParams>,
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    match state.facade.agent_history(&name, limit).await {
        Ok(history) => Json(json!({
            "agent": name,
            "count": history.len(),
            "history": history,
        }))
        .into_response(),
        Err(error) => persistence_error(error),
    }
}
