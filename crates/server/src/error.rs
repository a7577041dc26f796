use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{agent::AgentError, task_store::TaskStoreError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    TaskStore(#[from] TaskStoreError),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl ApiError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::TaskStore(TaskStoreError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "TaskNotFound")
            }
            ApiError::TaskStore(TaskStoreError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, "InvalidTransition")
            }
            ApiError::Agent(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AgentError"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = self.status_and_type();

        let error_message = match &self {
            ApiError::TaskStore(err) => err.to_string(),
            ApiError::Agent(err) => err.to_string(),
        };

        if status_code.is_server_error() {
            tracing::error!("{}: {}", error_type, error_message);
        }

        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use services::services::task_store::TaskStatus;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unknown_task_maps_to_404() {
        let response = ApiError::from(TaskStoreError::NotFound("3".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "success": false, "message": "Task 3 not found" })
        );
    }

    #[tokio::test]
    async fn agent_failure_maps_to_500_with_description() {
        let response =
            ApiError::from(AgentError::Other("browser crashed".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "browser crashed");
    }

    #[test]
    fn rejected_transition_is_conflict() {
        let err = ApiError::from(TaskStoreError::InvalidTransition {
            id: "1".to_string(),
            from: TaskStatus::Completed,
            to: TaskStatus::Processing,
        });
        assert_eq!(err.status_and_type(), (StatusCode::CONFLICT, "InvalidTransition"));
    }
}
