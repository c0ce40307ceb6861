//! Host takeaway on how the winners won, written once the game is over.

use async_trait::async_trait;

use crate::agent::{AgentError, ModelAgentConfig};
use crate::openrouter::{ChatMessage, OpenRouterClient};
use crate::prompts::AgentPrompts;

#[async_trait]
pub trait Recapper: Send + Sync {
    /// `transcript` is the full rendered transcript; `winners` the surviving names.
    async fn takeaway(&self, transcript: &[String], winners: &[String])
        -> Result<String, AgentError>;
}

/// Fixed host line; used with scripted agents.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRecapper;

#[async_trait]
impl Recapper for TemplateRecapper {
    async fn takeaway(
        &self,
        _transcript: &[String],
        winners: &[String],
    ) -> Result<String, AgentError> {
        Ok(match winners {
            [] => "Nobody outlasted the vote this time.".to_string(),
            [winner] => format!(
                "{winner} talked, schemed and survived every vote. Last one standing, no refunds."
            ),
            [init @ .., last] => format!(
                "{} and {} never let the votes land on them. Two survivors, one story.",
                init.join(", "),
                last
            ),
        })
    }
}

/// Takeaway written by a chat completion model from the whole transcript.
pub struct ModelRecapper {
    client: OpenRouterClient,
    config: ModelAgentConfig,
}

impl ModelRecapper {
    pub fn new(client: OpenRouterClient, config: ModelAgentConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Recapper for ModelRecapper {
    async fn takeaway(
        &self,
        transcript: &[String],
        winners: &[String],
    ) -> Result<String, AgentError> {
        let messages = vec![
            ChatMessage::system(AgentPrompts::takeaway_system()),
            ChatMessage::user(AgentPrompts::takeaway(transcript, winners)),
        ];
        let content = self
            .client
            .chat_completion(
                messages,
                &self.config.model,
                self.config.temperature,
                self.config.max_tokens,
                None,
            )
            .await?;

        let content = content.trim();
        if content.is_empty() {
            return Err(AgentError::InvalidResponse("empty takeaway".to_string()));
        }
        Ok(content.to_string())
    }
}
