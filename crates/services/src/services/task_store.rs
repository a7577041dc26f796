//! In-memory task records and their lifecycle.
//!
//! Records are append-only: ids are handed out as `count + 1` under the same
//! write guard that inserts the record, so concurrent creations never collide
//! and insertion order matches id order. Status only ever moves forward along
//! `pending -> processing -> completed | failed`.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// The only legal edges of the lifecycle.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Processing)
                | (TaskStatus::Processing, TaskStatus::Completed)
                | (TaskStatus::Processing, TaskStatus::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the agent should start and what the page is called.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
    pub url: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    pub task: String,
    pub context: TaskContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq)]
pub enum TaskStoreError {
    #[error("Task {0} not found")]
    NotFound(String),
    #[error("Task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: RwLock<IndexMap<String, Task>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id and insert a `pending` record.
    pub async fn create(&self, description: impl Into<String>, context: TaskContext) -> Task {
        let mut tasks = self.tasks.write().await;
        let id = (tasks.len() + 1).to_string();
        let now = Utc::now();
        let task = Task {
            id: id.clone(),
            status: TaskStatus::Pending,
            task: description.into(),
            context,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        tasks.insert(id, task.clone());
        tracing::debug!("Created task {}", task.id);
        task
    }

    pub async fn get(&self, id: &str) -> Result<Task, TaskStoreError> {
        self.tasks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| TaskStoreError::NotFound(id.to_string()))
    }

    /// All records in id order.
    pub async fn list(&self) -> Vec<Task> {
        self.tasks.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    pub(crate) async fn mark_processing(&self, id: &str) -> Result<Task, TaskStoreError> {
        self.transition(id, TaskStatus::Processing, |_| {}).await
    }

    pub(crate) async fn complete(&self, id: &str, result: String) -> Result<Task, TaskStoreError> {
        self.transition(id, TaskStatus::Completed, |task| task.result = Some(result))
            .await
    }

    pub(crate) async fn fail(&self, id: &str, error: String) -> Result<Task, TaskStoreError> {
        self.transition(id, TaskStatus::Failed, |task| task.error = Some(error))
            .await
    }

    async fn transition(
        &self,
        id: &str,
        to: TaskStatus,
        apply: impl FnOnce(&mut Task),
    ) -> Result<Task, TaskStoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| TaskStoreError::NotFound(id.to_string()))?;

        if !task.status.can_transition_to(to) {
            return Err(TaskStoreError::InvalidTransition {
                id: id.to_string(),
                from: task.status,
                to,
            });
        }

        task.status = to;
        task.updated_at = Utc::now();
        apply(task);
        Ok(task.clone())
    }
}
