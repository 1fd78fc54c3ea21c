// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # A2A Invocation Surface (Streaming HTTP)
//!
//! Publishes the governance engine to other agents over the A2A protocol:
//! a machine-readable agent card at a well-known URL, plus a JSON-RPC 2.0
//! endpoint accepting `tasks/sendMessage` (single JSON response) and
//! `tasks/sendSubscribe` (server-sent events).
//!
//! A streamed evaluation emits, in order: five textual progress updates,
//! one artifact event carrying the full verdict JSON, and a final
//! task-complete event. Progress strings are client feedback, not a
//! serialization of evaluator scheduling.
//!
//! In-flight evaluations are bounded by a semaphore sized from
//! `max_concurrent_evaluations`; excess requests are refused with JSON-RPC
//! error `-32005` before any evaluator runs.

use axum::{
    extract::State,
    response::{sse::Event, IntoResponse, Response, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::application::facade::GovernanceFacade;
use crate::domain::action::ProposedAction;
use crate::domain::error::GovernanceError;
use crate::domain::verdict::GovernanceVerdict;
use crate::presentation::jsonrpc::{
    JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND,
    RATE_LIMITED,
};

// ── Agent card ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub version: String,
    pub url: String,
    pub capabilities: AgentCapabilities,
    pub skills: Vec<AgentSkill>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentCapabilities {
    pub streaming: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Build the agent card advertised at `/.well-known/agent-card.json`.
pub fn build_agent_card(server_url: &str) -> AgentCard {
    AgentCard {
        name: "Sentinel Governance Engine".to_string(),
        description: "AI-action governance: scores proposed infrastructure actions across \
                      blast radius, policy compliance, historical incidents, and financial \
                      impact, and returns an approved/escalated/denied verdict before \
                      anything reaches the cloud control plane."
            .to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        url: server_url.to_string(),
        capabilities: AgentCapabilities { streaming: true },
        skills: vec![
            AgentSkill {
                id: "evaluate_action".to_string(),
                name: "Evaluate Action".to_string(),
                description: "Evaluate a ProposedAction JSON object and return a \
                              GovernanceVerdict with the full SRI breakdown."
                    .to_string(),
            },
            AgentSkill {
                id: "query_decision_history".to_string(),
                name: "Query Decision History".to_string(),
                description: "Query past governance verdicts from the audit trail.".to_string(),
            },
            AgentSkill {
                id: "get_resource_risk_profile".to_string(),
                name: "Get Resource Risk Profile".to_string(),
                description: "Aggregated SRI risk profile for one resource across all \
                              historical evaluations."
                    .to_string(),
            },
        ],
    }
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SendMessageParams {
    message: IncomingMessage,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    #[serde(default)]
    parts: Vec<IncomingPart>,
}

#[derive(Debug, Deserialize)]
struct IncomingPart {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    text: String,
}

impl SendMessageParams {
    fn text(&self) -> Option<&str> {
        self.message
            .parts
            .iter()
            .find(|part| part.kind == "text" || part.kind.is_empty())
            .map(|part| part.text.as_str())
    }
}

fn text_part(text: impl Into<String>) -> Value {
    json!({"kind": "text", "text": text.into()})
}

fn status_update(task_id: &str, state: &str, message: Option<Value>, last: bool) -> Value {
    let mut status = json!({"state": state});
    if let Some(message) = message {
        status["message"] = json!({"role": "agent", "parts": [message]});
    }
    json!({
        "kind": "status-update",
        "taskId": task_id,
        "status": status,
        "final": last,
    })
}

fn artifact_update(task_id: &str, verdict: &GovernanceVerdict) -> Value {
    json!({
        "kind": "artifact-update",
        "taskId": task_id,
        "artifact": {
            "name": "governance_verdict",
            "parts": [text_part(serde_json::to_string(verdict).unwrap_or_default())],
        },
    })
}

fn progress_messages(verdict: &GovernanceVerdict) -> Vec<String> {
    vec![
        "evaluating blast radius".to_string(),
        "checking policy compliance".to_string(),
        "querying historical incidents".to_string(),
        "calculating financial impact".to_string(),
        format!(
            "SRI Composite: {:.1} → {}",
            verdict.sri.composite,
            verdict.decision.as_str().to_uppercase()
        ),
    ]
}

fn governance_error_response(id: Value, error: GovernanceError) -> JsonRpcResponse {
    match error {
        GovernanceError::InvalidInput(message) => {
            JsonRpcResponse::failure(id, INVALID_PARAMS, message)
        }
        GovernanceError::RateLimited(inflight) => JsonRpcResponse::failure(
            id,
            RATE_LIMITED,
            format!("rate limited: {inflight} evaluations in flight"),
        ),
        other => JsonRpcResponse::failure(id, INTERNAL_ERROR, other.to_string()),
    }
}

// ── Router ────────────────────────────────────────────────────────────────

pub struct A2aState {
    pub facade: GovernanceFacade,
    pub card: AgentCard,
    pub limiter: Arc<Semaphore>,
    pub max_concurrent: usize,
}

/// Build the A2A router. Mounted at the server root.
pub fn router(facade: GovernanceFacade, server_url: &str, max_concurrent: usize) -> Router {
    let state = Arc::new(A2aState {
        facade,
        card: build_agent_card(server_url),
        limiter: Arc::new(Semaphore::new(max_concurrent)),
        max_concurrent,
    });

    Router::new()
        .route("/.well-known/agent-card.json", get(agent_card))
        .route("/.well-known/agent.json", get(agent_card))
        .route("/", post(rpc))
        .with_state(state)
}

async fn agent_card(State(state): State<Arc<A2aState>>) -> Json<AgentCard> {
    Json(state.card.clone())
}

async fn rpc(State(state): State<Arc<A2aState>>, body: String) -> Response {
    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            return Json(JsonRpcResponse::failure(
                Value::Null,
                crate::presentation::jsonrpc::PARSE_ERROR,
                format!("invalid JSON-RPC request: {e}"),
            ))
            .into_response();
        }
    };

    match request.method.as_str() {
        "tasks/sendMessage" => send_message(state, request).await.into_response(),
        "tasks/sendSubscribe" => send_subscribe(state, request).await,
        other => Json(JsonRpcResponse::failure(
            request.id,
            METHOD_NOT_FOUND,
            format!("unknown method '{other}'"),
        ))
        .into_response(),
    }
}

fn parse_action(params: &Value) -> Result<ProposedAction, String> {
    let params: SendMessageParams =
        serde_json::from_value(params.clone()).map_err(|e| format!("invalid params: {e}"))?;
    let text = params
        .text()
        .ok_or_else(|| "message carries no text part".to_string())?;
    serde_json::from_str(text).map_err(|e| format!("invalid ProposedAction JSON: {e}"))
}

/// `tasks/sendMessage` — evaluate and answer with one completed task.
async fn send_message(state: Arc<A2aState>, request: JsonRpcRequest) -> Json<JsonRpcResponse> {
    let action = match parse_action(&request.params) {
        Ok(action) => action,
        Err(message) => {
            return Json(JsonRpcResponse::failure(request.id, INVALID_PARAMS, message))
        }
    };

    let Ok(_permit) = state.limiter.clone().try_acquire_owned() else {
        warn!("A2A admission refused: all permits in use");
        return Json(governance_error_response(
            request.id,
            GovernanceError::RateLimited(state.max_concurrent),
        ));
    };

    if let Some(agent_id) = &action.agent_id {
        let _ = state.facade.register_agent(agent_id, None).await;
    }

    match state.facade.evaluate_action(&action).await {
        Ok(verdict) => {
            let task_id = verdict.action_id.to_string();
            let history: Vec<Value> = progress_messages(&verdict)
                .into_iter()
                .map(|text| json!({"role": "agent", "parts": [text_part(text)]}))
                .collect();
            let task = json!({
                "id": task_id,
                "status": {"state": "completed"},
                "history": history,
                "artifacts": [{
                    "name": "governance_verdict",
                    "parts": [text_part(serde_json::to_string(&verdict).unwrap_or_default())],
                }],
            });
            Json(JsonRpcResponse::success(request.id, task))
        }
        Err(error) => Json(governance_error_response(request.id, error)),
    }
}

/// `tasks/sendSubscribe` — evaluate and stream progress over SSE.
async fn send_subscribe(state: Arc<A2aState>, request: JsonRpcRequest) -> Response {
    let action = match parse_action(&request.params) {
        Ok(action) => action,
        Err(message) => {
            return Json(JsonRpcResponse::failure(request.id, INVALID_PARAMS, message))
                .into_response()
        }
    };

    let Ok(permit) = state.limiter.clone().try_acquire_owned() else {
        warn!("A2A admission refused: all permits in use");
        return Json(governance_error_response(
            request.id,
            GovernanceError::RateLimited(state.max_concurrent),
        ))
        .into_response();
    };

    let (tx, rx) = mpsc::channel::<Value>(16);
    let request_id = request.id.clone();
    let facade = state.facade.clone();

    tokio::spawn(async move {
        let _permit = permit;
        let task_id = action.action_id.to_string();

        if let Some(agent_id) = &action.agent_id {
            let _ = facade.register_agent(agent_id, None).await;
        }

        match facade.evaluate_action(&action).await {
            Ok(verdict) => {
                for text in progress_messages(&verdict) {
                    let event = status_update(&task_id, "working", Some(text_part(text)), false);
                    if tx.send(event).await.is_err() {
                        return; // client went away
                    }
                }
                let _ = tx.send(artifact_update(&task_id, &verdict)).await;
                let _ = tx
                    .send(status_update(&task_id, "completed", None, true))
                    .await;
                info!(%task_id, decision = %verdict.decision, "A2A task completed");
            }
            Err(error) => {
                let event = status_update(
                    &task_id,
                    "failed",
                    Some(text_part(format!("ERROR: {error}"))),
                    true,
                );
                let _ = tx.send(event).await;
            }
        }
    });

    let stream = ReceiverStream::new(rx).map(move |result| {
        let response = JsonRpcResponse::success(request_id.clone(), result);
        Ok::<_, axum::Error>(
            Event::default().data(serde_json::to_string(&response).unwrap_or_default()),
        )
    });

    Sse::new(stream)
        .keep_alive(axum::response::sse::KeepAlive::default())
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_card_shape() {
        let card = build_agent_card("http://localhost:8900");
        assert!(card.capabilities.streaming);
        assert_eq!(card.skills.len(), 3);
        let ids: Vec<&str> = card.skills.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "evaluate_action",
                "query_decision_history",
                "get_resource_risk_profile"
            ]
        );
        assert_eq!(card.url, "http://localhost:8900");
    }

    #[test]
    fn test_parse_action_from_message_text() {
        let params = json!({
            "message": {
                "role": "user",
                "parts": [{"kind": "text", "text": json!({
                    "action_type": "scale_up",
                    "target": {"resource_id": "vm-23", "resource_type": "x"}
                }).to_string()}]
            }
        });
        let action = parse_action(&params).unwrap();
        assert_eq!(action.target.resource_id, "vm-23");
    }

    #[test]
    fn test_parse_action_rejects_missing_text() {
        let params = json!({"message": {"parts": []}});
        assert!(parse_action(&params).is_err());

        let params = json!({"message": {"parts": [{"kind": "text", "text": "not json"}]}});
        assert!(parse_action(&params).is_err());
    }

    #[test]
    fn test_status_update_shapes() {
        let working = status_update("t-1", "working", Some(text_part("evaluating blast radius")), false);
        assert_eq!(working["kind"], "status-update");
        assert_eq!(working["final"], false);
        assert_eq!(
            working["status"]["message"]["parts"][0]["text"],
            "evaluating blast radius"
        );

        let done = status_update("t-1", "completed", None, true);
        assert_eq!(done["final"], true);
        assert!(done["status"].get("message").is_none());
    }
}
