use std::sync::Arc;

use async_trait::async_trait;
use services::services::{
    agent::SharedAgent,
    broadcast::BroadcastChannel,
    config::{Config, ConfigError},
    task_executor::TaskExecutor,
    task_store::{Task, TaskContext, TaskStore},
};
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Process-wide context shared by every handler.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Config;

    fn tasks(&self) -> &Arc<TaskStore>;

    fn broadcast(&self) -> &Arc<BroadcastChannel>;

    fn agent(&self) -> &SharedAgent;

    fn executor(&self) -> TaskExecutor {
        TaskExecutor::new(
            self.tasks().clone(),
            self.broadcast().clone(),
            self.agent().clone(),
        )
    }

    /// Record a new task and start its executor. Returns the `pending`
    /// record together with the executor handle; HTTP callers drop the handle.
    async fn submit_task(&self, description: String, context: TaskContext) -> (Task, JoinHandle<()>) {
        let task = self.tasks().create(description, context).await;
        tracing::info!("Submitted task {} for {}", task.id, task.context.url);
        let handle = self.executor().spawn(task.id.clone());
        (task, handle)
    }
}
