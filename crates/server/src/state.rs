use std::sync::Arc;

use events::Broadcaster;
use orchestrator::GameRegistry;

use crate::agents::AgentFactory;
use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub registry: GameRegistry,
    pub config: Arc<ServerConfig>,
    pub agents: AgentFactory,
}

impl AppState {
    pub fn new(config: ServerConfig, agents: AgentFactory) -> Self {
        Self {
            registry: GameRegistry::new(Broadcaster::new()),
            config: Arc::new(config),
            agents,
        }
    }

    /// State with scripted agents, for offline runs.
    pub fn scripted(config: ServerConfig) -> Self {
        Self::new(config, AgentFactory::Scripted)
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        self.registry.broadcaster()
    }
}
