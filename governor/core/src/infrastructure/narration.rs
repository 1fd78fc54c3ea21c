// Narration Provider - Optional LLM Post-Processing
//
// Anti-Corruption Layer for the narration LLM. Rewrites deterministic
// reasoning text into operator-facing prose. Scores are computed before
// narration runs and are never touched by it; any failure degrades to the
// deterministic reasoning unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::verdict::GovernanceVerdict;

#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("narration request failed: {0}")]
    Request(String),

    #[error("narration response malformed: {0}")]
    Malformed(String),
}

/// Optional post-processor over verdict reasoning text.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Produce a narrated replacement for the verdict reason, or `None`
    /// when narration is unavailable.
    async fn narrate(&self, verdict: &GovernanceVerdict) -> Result<Option<String>, NarrationError>;
}

/// Default narrator: narration disabled.
pub struct NoopNarrator;

#[async_trait]
impl Narrator for NoopNarrator {
    async fn narrate(&self, _verdict: &GovernanceVerdict) -> Result<Option<String>, NarrationError> {
        Ok(None)
    }
}

/// Narrator backed by an OpenAI-compatible chat completion endpoint.
pub struct OpenAiNarrator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

const NARRATION_PROMPT: &str = "You are the narration layer of an infrastructure governance \
engine. Rewrite the following machine-generated risk assessment into two or three clear \
sentences for a human operator. Do not change any number, score, threshold, policy id, or \
the decision itself.";

impl OpenAiNarrator {
    pub fn new(endpoint: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Narrator for OpenAiNarrator {
    async fn narrate(&self, verdict: &GovernanceVerdict) -> Result<Option<String>, NarrationError> {
        let context = format!(
            "{NARRATION_PROMPT}\n\nDecision: {}\nComposite: {:.1}\nReason: {}\n\
             Blast radius: {}\nPolicy: {}\nHistorical: {}\nFinancial: {}",
            verdict.decision,
            verdict.sri.composite,
            verdict.reason,
            verdict.sub_results.blast_radius.reasoning,
            verdict.sub_results.policy.reasoning,
            verdict.sub_results.historical.reasoning,
            verdict.sub_results.financial.reasoning,
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: context,
            }],
            max_tokens: 300,
            temperature: 0.2,
        };

        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| NarrationError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NarrationError::Request(format!(
                "status {}",
                response.status()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| NarrationError::Malformed(e.to_string()))?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content))
    }
}

/// Apply narration to a verdict's reason, absorbing failures.
///
/// Called after the verdict is fully scored and persisted; only the `reason`
/// text can change.
pub async fn narrate_reason(narrator: &dyn Narrator, verdict: &mut GovernanceVerdict) {
    match narrator.narrate(verdict).await {
        Ok(Some(narrated)) => {
            verdict.reason = format!("{} Narrative: {narrated}", verdict.reason);
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "narration unavailable; keeping deterministic reasoning"),
    }
}
