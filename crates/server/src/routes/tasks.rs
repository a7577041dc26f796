use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::task_store::{Task, TaskContext};

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub task: String,
    pub context: TaskContext,
}

/// Record the task, start its executor and answer right away with the
/// `pending` record. Agent failures never reach this caller.
pub async fn create_task(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateTaskRequest>,
) -> (StatusCode, ResponseJson<Task>) {
    let (task, _executor) = deployment.submit_task(payload.task, payload.context).await;
    (StatusCode::CREATED, ResponseJson(task))
}

pub async fn get_task(
    Path(task_id): Path<String>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<Task>, ApiError> {
    let task = deployment.tasks().get(&task_id).await?;
    Ok(ResponseJson(task))
}

pub async fn get_tasks(State(deployment): State<DeploymentImpl>) -> ResponseJson<Vec<Task>> {
    ResponseJson(deployment.tasks().list().await)
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/tasks", get(get_tasks).post(create_task))
        .route("/tasks/{task_id}", get(get_task))
}
