//! Notification API handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::notification::{Channel, CreateNotificationRequest, Notification};
use crate::server::AppState;
use crate::store::Page;

use super::models::{MessageResponse, PageQuery, ScheduleResponse};

/// POST /api/notifications - create a pending record
#[tracing::instrument(name = "api.create_notification", skip(state, request))]
pub async fn create_notification(
    State(state): State<AppState>,
    Json(request): Json<CreateNotificationRequest>,
) -> Result<Json<MessageResponse<String>>> {
    let record = state.service.create(request).await?;

    Ok(Json(MessageResponse::ok(format!(
        "Notification created with id: {}",
        record.id
    ))))
}

/// GET /api/notifications - paginated list, newest first
#[tracing::instrument(name = "api.list_notifications", skip(state), fields(page = query.page, size = query.size))]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<MessageResponse<Page<Notification>>>> {
    let page = state.service.list(query.page, query.size).await?;
    Ok(Json(MessageResponse::ok(page)))
}

/// GET /api/notifications/{id} - fetch one record
#[tracing::instrument(name = "api.get_notification", skip(state))]
pub async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>> {
    let record = state.service.get(id).await?;
    Ok(Json(record))
}

/// POST /api/notifications/schedule/{id} - dispatch an existing record
#[tracing::instrument(name = "api.schedule_notification", skip(state))]
pub async fn schedule_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduleResponse>> {
    let summary = state.dispatcher.dispatch(id).await?;
    Ok(Json(summary.into()))
}

/// GET /api/notifications/channels - supported channel names
pub async fn get_channels(State(state): State<AppState>) -> Json<Vec<Channel>> {
    Json(state.service.channels())
}
