//! Builds the agents that play a roster.

use std::sync::Arc;

use orchestrator::{
    Agent, ModelAgent, ModelAgentConfig, ModelRecapper, OpenRouterClient, Recapper, ScriptedAgent,
    Seat, TemplateRecapper,
};
use tracing::info;

use crate::config::{AgentBackend, ConfigError, API_KEY_ENV};

const PERSONA: &str = "You are a contestant on a live elimination show. You are witty, a little \
ruthless, and you care about one thing: not being voted out.";

#[derive(Clone)]
pub enum AgentFactory {
    Scripted,
    Model {
        client: OpenRouterClient,
        config: ModelAgentConfig,
    },
}

impl AgentFactory {
    /// Resolve the configured backend. A model backend needs an API key.
    pub fn from_backend(
        backend: &AgentBackend,
        api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        match backend {
            AgentBackend::Scripted => Ok(Self::Scripted),
            AgentBackend::OpenRouter { model, base_url } => {
                let api_key = api_key
                    .filter(|key| !key.trim().is_empty())
                    .ok_or(ConfigError::MissingApiKey(API_KEY_ENV))?;
                info!(model = %model, base_url = %base_url, "Using model-backed agents");
                Ok(Self::Model {
                    client: OpenRouterClient::new(api_key, base_url.clone()),
                    config: ModelAgentConfig {
                        model: model.clone(),
                        ..Default::default()
                    },
                })
            }
        }
    }

    /// Read the API key from the environment when the backend needs one.
    pub fn from_env(backend: &AgentBackend) -> Result<Self, ConfigError> {
        Self::from_backend(backend, std::env::var(API_KEY_ENV).ok())
    }

    /// One seat per name. A seed makes scripted agents deterministic.
    pub fn seats(&self, names: &[String], seed: Option<u64>) -> Vec<Seat> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let agent: Arc<dyn Agent> = match self {
                    Self::Scripted => {
                        let agent = ScriptedAgent::new(name.as_str())
                            .with_roster(names.iter().map(String::as_str));
                        match seed {
                            Some(seed) => Arc::new(agent.with_seed(seed.wrapping_add(i as u64))),
                            None => Arc::new(agent),
                        }
                    }
                    Self::Model { client, config } => Arc::new(ModelAgent::new(
                        name.as_str(),
                        PERSONA,
                        client.clone(),
                        config.clone(),
                    )),
                };
                Seat::new(name.as_str(), agent)
            })
            .collect()
    }

    /// Writes the host takeaway once a game is over.
    pub fn recapper(&self) -> Arc<dyn Recapper> {
        match self {
            Self::Scripted => Arc::new(TemplateRecapper),
            Self::Model { client, config } => {
                Arc::new(ModelRecapper::new(client.clone(), config.clone()))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scripted => "scripted",
            Self::Model { .. } => "openrouter",
        }
    }
}
