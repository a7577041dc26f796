use axum::{
    Json, Router, extract::State, response::Json as ResponseJson, routing::post,
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::{agent::AgentRequest, task_store::TaskContext};

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseRequest {
    pub url: String,
    pub task: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseResponse {
    pub result: String,
}

/// Run the agent inline and wait for its answer. No task record is kept.
pub async fn browse(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<BrowseRequest>,
) -> Result<ResponseJson<BrowseResponse>, ApiError> {
    let request = AgentRequest {
        task: payload.task,
        initial_url: payload.url.clone(),
        context: TaskContext {
            url: payload.url,
            title: String::new(),
        },
    };

    tracing::info!("Browsing {} inline", request.initial_url);
    let result = deployment.agent().run(&request).await?;
    Ok(ResponseJson(BrowseResponse { result }))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/browse", post(browse))
}
