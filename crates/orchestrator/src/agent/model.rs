use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Agent, AgentError, AgentReply, AgentVote};
use crate::openrouter::{ChatMessage, OpenRouterClient, ResponseFormat};
use crate::prompts::AgentPrompts;

/// Model settings shared by every model-backed participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAgentConfig {
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for ModelAgentConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o-mini".to_string(),
            temperature: Some(0.9),
            max_tokens: Some(400),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReplyPayload {
    response: String,
    #[serde(default)]
    thought: String,
}

#[derive(Debug, Deserialize)]
struct VotePayload {
    vote_target: String,
    #[serde(default)]
    thought: String,
}

/// Participant backed by a chat completion model with JSON output.
pub struct ModelAgent {
    name: String,
    system_prompt: String,
    client: OpenRouterClient,
    config: ModelAgentConfig,
}

impl ModelAgent {
    pub fn new(
        name: impl Into<String>,
        persona: &str,
        client: OpenRouterClient,
        config: ModelAgentConfig,
    ) -> Self {
        let name = name.into();
        Self {
            system_prompt: AgentPrompts::system(&name, persona),
            name,
            client,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn complete<T: DeserializeOwned>(&self, prompt: String) -> Result<T, AgentError> {
        let messages = vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(prompt),
        ];
        let content = self
            .client
            .chat_completion(
                messages,
                &self.config.model,
                self.config.temperature,
                self.config.max_tokens,
                Some(ResponseFormat::json_object()),
            )
            .await?;

        debug!(participant = %self.name, "Model replied with {} chars", content.len());
        parse_payload(&content)
    }
}

/// Parse a JSON object from model output, tolerating a markdown code fence.
fn parse_payload<T: DeserializeOwned>(content: &str) -> Result<T, AgentError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(body).map_err(|e| AgentError::InvalidResponse(format!("{e}: {body}")))
}

#[async_trait]
impl Agent for ModelAgent {
    async fn respond(&self, transcript: &[String]) -> Result<AgentReply, AgentError> {
        let payload: ReplyPayload = self.complete(AgentPrompts::respond(transcript)).await?;
        Ok(AgentReply::new(payload.response, payload.thought))
    }

    async fn vote(&self, transcript: &[String]) -> Result<AgentVote, AgentError> {
        let payload: VotePayload = self.complete(AgentPrompts::vote(transcript)).await?;
        Ok(AgentVote::new(payload.vote_target, payload.thought))
    }
}
