use axum::response::Json as ResponseJson;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use services::services::config::SERVICE_NAME;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

/// Liveness only. Never touches the agent, so a slow or down LLM cannot
/// fail the check.
pub async fn health_check() -> ResponseJson<HealthResponse> {
    ResponseJson(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        timestamp: Utc::now(),
    })
}
