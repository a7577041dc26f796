use axum::{
    Router, middleware,
    routing::{IntoMakeService, get},
};
use tower_http::cors::CorsLayer;

use crate::{DeploymentImpl, middleware::request_id_middleware};

pub mod browse;
pub mod health;
pub mod tasks;
pub mod ws;

/// The full application router, ready for `oneshot` in tests.
pub fn app(deployment: DeploymentImpl) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(tasks::router(&deployment))
        .merge(browse::router())
        .merge(ws::router())
        .with_state(deployment)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
}

pub fn router(deployment: DeploymentImpl) -> IntoMakeService<Router> {
    app(deployment).into_make_service()
}
