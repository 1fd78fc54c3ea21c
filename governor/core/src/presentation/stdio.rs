// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Stdio Tool Surface
//!
//! Exposes three governance tools over newline-delimited JSON-RPC 2.0 on
//! stdin/stdout, so any tool-protocol client can call the engine without an
//! HTTP listener:
//!
//! - `evaluate_action` — run the full pipeline on a described action
//! - `get_recent_decisions` — query the audit trail
//! - `get_risk_profile` — aggregated risk summary for one resource
//!
//! `tools/list` advertises the catalogue; `tools/call` dispatches. No
//! streaming — each request produces exactly one response line.

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::application::facade::GovernanceFacade;
use crate::domain::action::{ActionTarget, ActionType, ProposedAction, Urgency};
use crate::domain::error::GovernanceError;
use crate::presentation::jsonrpc::{
    JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND,
    PARSE_ERROR,
};

/// Flat tool arguments for `evaluate_action` — mirrors what tool-protocol
/// clients can express without nested objects.
#[derive(Debug, Deserialize)]
struct EvaluateArgs {
    resource_id: String,
    resource_type: String,
    action_type: ActionType,
    #[serde(default)]
    agent_id: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    urgency: Option<Urgency>,
    #[serde(default)]
    current_monthly_cost: Option<f64>,
    #[serde(default)]
    current_sku: Option<String>,
    #[serde(default)]
    proposed_sku: Option<String>,
    #[serde(default)]
    projected_savings_monthly: Option<f64>,
}

impl EvaluateArgs {
    fn into_action(self) -> ProposedAction {
        let mut target = ActionTarget::new(self.resource_id, self.resource_type);
        target.current_monthly_cost = self.current_monthly_cost;
        target.current_sku = self.current_sku;
        target.proposed_sku = self.proposed_sku;

        let mut action = ProposedAction::new(self.action_type, target);
        action.agent_id = self.agent_id;
        action.reason = self.reason.unwrap_or_default();
        action.urgency = self.urgency.unwrap_or_default();
        action.projected_savings_monthly = self.projected_savings_monthly;
        action
    }
}

#[derive(Debug, Deserialize)]
struct HistoryArgs {
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    resource_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileArgs {
    resource_id: String,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

fn tool_catalogue() -> Value {
    json!({
        "tools": [
            {
                "name": "evaluate_action",
                "description": "Evaluate a proposed infrastructure action through the \
                                governance pipeline and return the SRI verdict.",
                "input_schema": {
                    "type": "object",
                    "required": ["resource_id", "resource_type", "action_type"],
                    "properties": {
                        "resource_id": {"type": "string"},
                        "resource_type": {"type": "string"},
                        "action_type": {"type": "string", "enum": [
                            "scale_up", "scale_down", "delete_resource", "restart_service",
                            "modify_nsg", "create_resource", "update_config"
                        ]},
                        "agent_id": {"type": "string"},
                        "reason": {"type": "string"},
                        "urgency": {"type": "string", "enum": ["low", "medium", "high", "critical"]},
                        "current_monthly_cost": {"type": "number"},
                        "current_sku": {"type": "string"},
                        "proposed_sku": {"type": "string"},
                        "projected_savings_monthly": {"type": "number"}
                    }
                }
            },
            {
                "name": "get_recent_decisions",
                "description": "Recent governance verdicts, newest first; optionally \
                                filtered by resource id substring.",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "limit": {"type": "integer", "minimum": 1, "maximum": 100},
                        "resource_id": {"type": "string"}
                    }
                }
            },
            {
                "name": "get_risk_profile",
                "description": "Aggregated risk summary for one resource.",
                "input_schema": {
                    "type": "object",
                    "required": ["resource_id"],
                    "properties": {"resource_id": {"type": "string"}}
                }
            }
        ]
    })
}

/// Handle one JSON-RPC request. Shared by the stdio loop and tests.
pub async fn handle_request(facade: &GovernanceFacade, request: JsonRpcRequest) -> JsonRpcResponse {
    match request.method.as_str() {
        "tools/list" => JsonRpcResponse::success(request.id, tool_catalogue()),
        "tools/call" => {
            let params: ToolCallParams = match serde_json::from_value(request.params) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::failure(
                        request.id,
                        INVALID_PARAMS,
                        format!("invalid tools/call params: {e}"),
                    )
                }
            };
            dispatch_tool(facade, request.id, params).await
        }
        other => JsonRpcResponse::failure(
            request.id,
            METHOD_NOT_FOUND,
            format!("unknown method '{other}'"),
        ),
    }
}

async fn dispatch_tool(
    facade: &GovernanceFacade,
    id: Value,
    params: ToolCallParams,
) -> JsonRpcResponse {
    match params.name.as_str() {
        "evaluate_action" => {
            let args: EvaluateArgs = match serde_json::from_value(params.arguments) {
                Ok(args) => args,
                Err(e) => {
                    return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("{e}"));
                }
            };
            let action = args.into_action();
            if let Some(agent_id) = &action.agent_id {
                let _ = facade.register_agent(agent_id, None).await;
            }
            match facade.evaluate_action(&action).await {
                Ok(verdict) => JsonRpcResponse::success(
                    id,
                    json!({
                        "action_id": verdict.action_id,
                        "decision": verdict.decision,
                        "reason": verdict.reason,
                        "sri": verdict.sri,
                        "thresholds": verdict.thresholds,
                        "violations": verdict.violations,
                    }),
                ),
                Err(GovernanceError::InvalidInput(message)) => {
                    JsonRpcResponse::failure(id, INVALID_PARAMS, message)
                }
                Err(error) => JsonRpcResponse::failure(id, INTERNAL_ERROR, error.to_string()),
            }
        }
        "get_recent_decisions" => {
            let args: HistoryArgs = match serde_json::from_value(params.arguments) {
                Ok(args) => args,
                Err(e) => {
                    return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("{e}"));
                }
            };
            match facade
                .recent_decisions(args.limit.unwrap_or(10), args.resource_id.as_deref())
                .await
            {
                Ok(decisions) => JsonRpcResponse::success(
                    id,
                    json!({"count": decisions.len(), "decisions": decisions}),
                ),
                Err(error) => JsonRpcResponse::failure(id, INTERNAL_ERROR, error.to_string()),
            }
        }
        "get_risk_profile" => {
            let args: ProfileArgs = match serde_json::from_value(params.arguments) {
                Ok(args) => args,
                Err(e) => {
                    return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("{e}"));
                }
            };
            match facade.risk_profile(&args.resource_id).await {
                Ok(profile) => JsonRpcResponse::success(
                    id,
                    serde_json::to_value(profile).unwrap_or_default(),
                ),
                Err(error) => JsonRpcResponse::failure(id, INTERNAL_ERROR, error.to_string()),
            }
        }
        other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("unknown tool '{other}'")),
    }
}

/// Serve the tool protocol over stdin/stdout until EOF.
pub async fn serve(facade: GovernanceFacade) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    info!("stdio tool server ready");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
            Ok(request) => handle_request(&facade, request).await,
            Err(e) => {
                warn!(error = %e, "unparsable request line");
                JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("parse error: {e}"))
            }
        };
        let mut payload = serde_json::to_string(&response)?;
        payload.push('\n');
        stdout.write_all(payload.as_bytes()).await?;
        stdout.flush().await?;
    }
    info!("stdin closed; stdio tool server exiting");
    Ok(())
}
