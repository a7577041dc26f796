use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use services::services::{
    agent::{Agent, AgentError, AgentRequest, SharedAgent},
    config::{AgentConfig, Config},
};
use tokio::sync::Notify;

use crate::DeploymentImpl;

/// Agent double returning a fixed outcome, optionally after a signal.
pub struct ScriptedAgent {
    outcome: Result<String, AgentError>,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn run(&self, _request: &AgentRequest) -> Result<String, AgentError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.clone()
    }
}

pub fn agent(outcome: Result<String, AgentError>) -> SharedAgent {
    Arc::new(ScriptedAgent {
        outcome,
        gate: None,
    })
}

pub fn gated_agent(outcome: Result<String, AgentError>) -> (SharedAgent, Arc<Notify>) {
    let gate = Arc::new(Notify::new());
    let agent = Arc::new(ScriptedAgent {
        outcome,
        gate: Some(gate.clone()),
    });
    (agent, gate)
}

pub fn config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        agent: AgentConfig {
            api_key: "sk-test".to_string(),
            model: "gpt-4".to_string(),
            endpoint: "http://127.0.0.1:9/v1/chat/completions".to_string(),
        },
    }
}

pub fn deployment_with(agent: SharedAgent) -> DeploymentImpl {
    DeploymentImpl::with_agent(config(), agent)
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
