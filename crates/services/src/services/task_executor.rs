//! Drives one task through its lifecycle.
//!
//! `pending -> processing -> completed | failed`, with a broadcast after every
//! transition. There is no retry and no cancellation: once spawned the
//! executor runs until the agent returns.

use std::sync::Arc;

use tokio::task::JoinHandle;

use super::{
    agent::{AgentRequest, SharedAgent},
    broadcast::{BroadcastChannel, ServerMessage},
    task_store::{Task, TaskStore, TaskStoreError},
};

#[derive(Clone)]
pub struct TaskExecutor {
    store: Arc<TaskStore>,
    broadcast: Arc<BroadcastChannel>,
    agent: SharedAgent,
}

impl TaskExecutor {
    pub fn new(store: Arc<TaskStore>, broadcast: Arc<BroadcastChannel>, agent: SharedAgent) -> Self {
        Self {
            store,
            broadcast,
            agent,
        }
    }

    /// Run the task in the background. The caller keeps only the id.
    pub fn spawn(self, task_id: String) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run(&task_id).await {
                tracing::error!("Executor for task {} aborted: {}", task_id, e);
            }
        })
    }

    /// Run the task to its terminal state and return the final record.
    ///
    /// Agent failures are recorded on the task, not returned. The only errors
    /// here are store errors (unknown id, or a task that already left
    /// `pending`).
    pub async fn run(&self, task_id: &str) -> Result<Task, TaskStoreError> {
        let task = self.store.mark_processing(task_id).await?;
        tracing::info!("Task {} processing: {}", task_id, task.task);
        self.broadcast.broadcast(&ServerMessage::processing(task_id));

        let request = AgentRequest::from(&task);
        match self.agent.run(&request).await {
            Ok(result) => {
                let task = self.store.complete(task_id, result).await?;
                tracing::info!("Task {} completed", task_id);
                let result = task.result.as_deref().unwrap_or_default();
                self.broadcast
                    .broadcast(&ServerMessage::completed(task_id, result));
                Ok(task)
            }
            Err(e) => {
                let error = e.to_string();
                tracing::warn!("Task {} failed: {}", task_id, error);
                let task = self.store.fail(task_id, error).await?;
                let error = task.error.as_deref().unwrap_or_default();
                self.broadcast.broadcast(&ServerMessage::failed(task_id, error));
                Ok(task)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::services::{
        agent::{Agent, AgentError},
        task_store::{TaskContext, TaskStatus},
    };

    /// Returns a canned outcome, optionally waiting for a signal first.
    struct Scripted {
        outcome: Result<String, AgentError>,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl Agent for Scripted {
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

    fn scripted(outcome: Result<String, AgentError>) -> SharedAgent {
        Arc::new(Scripted {
            outcome,
            gate: None,
        })
    }

    fn context() -> TaskContext {
        TaskContext {
            url: "https://example.com".to_string(),
            title: String::new(),
        }
    }

    fn setup(agent: SharedAgent) -> (Arc<TaskStore>, Arc<BroadcastChannel>, TaskExecutor) {
        let store = Arc::new(TaskStore::new());
        let broadcast = Arc::new(BroadcastChannel::new());
        let executor = TaskExecutor::new(store.clone(), broadcast.clone(), agent);
        (store, broadcast, executor)
    }

    #[tokio::test]
    async fn success_path_broadcasts_processing_then_result() {
        let (store, broadcast, executor) = setup(scripted(Ok("Example Domain".to_string())));
        let (_, mut rx) = broadcast.connect();
        assert_eq!(rx.recv().await.unwrap(), ServerMessage::connected());

        let task = store.create("go to example.com", context()).await;
        let done = executor.run(&task.id).await.unwrap();

        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.result.as_deref(), Some("Example Domain"));
        assert_eq!(done.error, None);
        assert_eq!(rx.recv().await.unwrap(), ServerMessage::processing("1"));
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerMessage::completed("1", "Example Domain")
        );
        assert_eq!(store.get("1").await.unwrap(), done);
    }

    #[tokio::test]
    async fn agent_failure_is_recorded_not_returned() {
        let (store, broadcast, executor) = setup(scripted(Err(AgentError::ApiError {
            status: 503,
            message: "overloaded".to_string(),
        })));
        let (_, mut rx) = broadcast.connect();
        rx.recv().await.unwrap();

        let task = store.create("go to example.com", context()).await;
        let failed = executor.run(&task.id).await.unwrap();

        assert_eq!(failed.status, TaskStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("LLM API error (503): overloaded"));
        assert_eq!(failed.result, None);
        assert_eq!(rx.recv().await.unwrap(), ServerMessage::processing("1"));
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerMessage::failed("1", "LLM API error (503): overloaded")
        );
    }

    #[tokio::test]
    async fn finished_task_cannot_run_again() {
        let (store, _broadcast, executor) = setup(scripted(Ok("done".to_string())));
        let task = store.create("go to example.com", context()).await;
        executor.run(&task.id).await.unwrap();

        assert!(matches!(
            executor.run(&task.id).await,
            Err(TaskStoreError::InvalidTransition { .. })
        ));
        assert_eq!(store.get(&task.id).await.unwrap().status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn unknown_task_is_an_error() {
        let (_store, _broadcast, executor) = setup(scripted(Ok("done".to_string())));
        assert_eq!(
            executor.run("9").await,
            Err(TaskStoreError::NotFound("9".to_string()))
        );
    }

    #[tokio::test]
    async fn processing_is_visible_while_agent_runs() {
        let gate = Arc::new(Notify::new());
        let agent: SharedAgent = Arc::new(Scripted {
            outcome: Ok("late".to_string()),
            gate: Some(gate.clone()),
        });
        let (store, broadcast, executor) = setup(agent);
        let (_, mut rx) = broadcast.connect();
        rx.recv().await.unwrap();

        let task = store.create("go to example.com", context()).await;
        let handle = executor.spawn(task.id.clone());

        assert_eq!(rx.recv().await.unwrap(), ServerMessage::processing("1"));
        assert_eq!(store.get("1").await.unwrap().status, TaskStatus::Processing);

        gate.notify_one();
        handle.await.unwrap();
        assert_eq!(store.get("1").await.unwrap().status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn dead_client_does_not_stop_the_task() {
        let (store, broadcast, executor) = setup(scripted(Ok("done".to_string())));
        let (dead, dead_rx) = broadcast.connect();
        drop(dead_rx);

        let task = store.create("go to example.com", context()).await;
        let done = executor.run(&task.id).await.unwrap();

        assert_eq!(done.status, TaskStatus::Completed);
        assert!(!broadcast.is_connected(dead));
    }
}
