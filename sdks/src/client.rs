use anyhow::{anyhow, bail, Context, Result};
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};

use crate::types::{ActionRequest, AgentCard, DecisionSummary, RiskProfile, TaskOutcome, Verdict};

/// Client for the Sentinel governance engine.
pub struct SentinelClient {
    base_url: String,
    client: Client,
}

impl SentinelClient {
    /// Create a new client for the engine at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Fetch the engine's agent card.
    pub async fn fetch_card(&self) -> Result<AgentCard> {
        let url = format!("{}/.well-known/agent-card.json", self.base_url);
        let card = self.client.get(&url).send().await?.json().await?;
        Ok(card)
    }

    /// Submit an action for evaluation (`tasks/sendMessage`, no streaming).
    pub async fn evaluate(&self, action: &ActionRequest) -> Result<TaskOutcome> {
        let body = rpc_envelope("tasks/sendMessage", action)?;
        let response: Value = self
            .client
            .post(&self.base_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.get("error") {
            bail!("engine refused the task: {error}");
        }
        let task = response
            .get("result")
            .ok_or_else(|| anyhow!("response carries neither result nor error"))?;

        let progress = task["history"]
            .as_array()
            .map(|history| {
                history
                    .iter()
                    .filter_map(|m| m["parts"][0]["text"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let artifact_text = task["artifacts"][0]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow!("task completed without a verdict artifact"))?;
        let verdict: Verdict =
            serde_json::from_str(artifact_text).context("parsing verdict artifact")?;

        Ok(TaskOutcome { progress, verdict })
    }

    /// Submit an action and stream progress (`tasks/sendSubscribe`).
    ///
    /// `on_progress` is invoked for each textual progress update as it
    /// arrives; the final verdict is returned once the task completes.
    pub async fn evaluate_streaming(
        &self,
        action: &ActionRequest,
        mut on_progress: impl FnMut(&str),
    ) -> Result<TaskOutcome> {
        let body = rpc_envelope("tasks/sendSubscribe", action)?;
        let response = self
            .client
            .post(&self.base_url)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            bail!("engine answered {}", response.status());
        }

        let mut progress = Vec::new();
        let mut verdict: Option<Verdict> = None;
        let mut buffer = String::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            buffer.push_str(&String::from_utf8_lossy(&chunk?));
            // SSE frames are separated by a blank line; data lines carry
            // one JSON-RPC response each.
            while let Some(boundary) = buffer.find("\n\n") {
                let frame = buffer[..boundary].to_string();
                buffer.drain(..boundary + 2);
                for line in frame.lines() {
                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    let event: Value = match serde_json::from_str::<Value>(data) {
                        Ok(response) => response["result"].clone(),
                        Err(_) => continue,
                    };
                    match event["kind"].as_str() {
                        Some("status-update") => {
                            if let Some(text) =
                                event["status"]["message"]["parts"][0]["text"].as_str()
                            {
                                on_progress(text);
                                progress.push(text.to_string());
                            }
                        }
                        Some("artifact-update") => {
                            if let Some(text) = event["artifact"]["parts"][0]["text"].as_str() {
                                verdict = Some(
                                    serde_json::from_str(text)
                                        .context("parsing verdict artifact")?,
                                );
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        let verdict = verdict.ok_or_else(|| anyhow!("stream ended without a verdict artifact"))?;
        Ok(TaskOutcome { progress, verdict })
    }

    /// Recent verdicts from the dashboard API.
    pub async fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionSummary>> {
        let url = format!("{}/api/evaluations?limit={limit}", self.base_url);
        let body: Value = self.client.get(&url).send().await?.json().await?;
        let summaries = serde_json::from_value(body["evaluations"].clone())?;
        Ok(summaries)
    }

    /// Aggregated risk profile for one resource.
    pub async fn risk_profile(&self, resource_id: &str) -> Result<RiskProfile> {
        let url = format!("{}/api/resources/{resource_id}/risk", self.base_url);
        let profile = self.client.get(&url).send().await?.json().await?;
        Ok(profile)
    }
}

fn rpc_envelope(method: &str, action: &ActionRequest) -> Result<Value> {
    let text = serde_json::to_string(action)?;
    Ok(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": {
            "message": {
                "role": "user",
                "parts": [{"kind": "text", "text": text}]
            }
        }
    }))
}
