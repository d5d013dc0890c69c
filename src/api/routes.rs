use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::handlers::{
    create_notification, get_channels, get_notification, list_notifications,
    schedule_notification,
};
use super::health::{health, prometheus_metrics, stats};

/// Unauthenticated liveness and observability routes.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
}

/// Notification API, guarded by the bearer-token middleware.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest(
        "/api",
        Router::new()
            .route(
                "/notifications",
                post(create_notification).get(list_notifications),
            )
            .route("/notifications/channels", get(get_channels))
            .route("/notifications/{id}", get(get_notification))
            .route("/notifications/schedule/{id}", post(schedule_notification)),
    )
}
