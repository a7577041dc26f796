use std::sync::Arc;

use async_trait::async_trait;
use deployment::{Deployment, DeploymentError};
use services::services::{
    agent::{LazyAgent, LlmBrowseAgent, SharedAgent},
    broadcast::BroadcastChannel,
    config::Config,
    task_store::TaskStore,
};

/// Single-process deployment: everything lives in memory for the lifetime
/// of the process.
#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<Config>,
    tasks: Arc<TaskStore>,
    broadcast: Arc<BroadcastChannel>,
    agent: SharedAgent,
}

impl LocalDeployment {
    /// Build from an explicit config. The LLM agent is created on first use.
    pub fn from_config(config: Config) -> Self {
        let agent_config = config.agent.clone();
        let agent = LazyAgent::new(move || {
            LlmBrowseAgent::new(agent_config.clone()).map(|agent| Arc::new(agent) as SharedAgent)
        });
        Self::with_agent(config, Arc::new(agent))
    }

    /// Build around a caller-supplied agent.
    pub fn with_agent(config: Config, agent: SharedAgent) -> Self {
        Self {
            config: Arc::new(config),
            tasks: Arc::new(TaskStore::new()),
            broadcast: Arc::new(BroadcastChannel::new()),
            agent,
        }
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = Config::from_env()?;
        tracing::info!(
            "Using model {} via {}",
            config.agent.model,
            config.agent.endpoint
        );
        Ok(Self::from_config(config))
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn tasks(&self) -> &Arc<TaskStore> {
        &self.tasks
    }

    fn broadcast(&self) -> &Arc<BroadcastChannel> {
        &self.broadcast
    }

    fn agent(&self) -> &SharedAgent {
        &self.agent
    }
}
