// libs/notification-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{ConnectionStatusResponse, NotificationListQuery};
use crate::services::hub::RealtimeHub;
use crate::services::notification::NotificationService;

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = NotificationService::new(&state);

    let page = service.list_notifications(&user.id, &query, token).await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({
        "notifications": page.items,
        "total": page.total,
        "page": page.page,
        "limit": page.limit,
        "total_pages": page.total_pages
    })))
}

#[axum::debug_handler]
pub async fn mark_notification_read(
    State(state): State<Arc<AppConfig>>,
    Path(notification_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = NotificationService::new(&state);

    let notification = service.mark_read(notification_id, &user.id, token).await
        .map_err(|e| {
            if e.to_string().contains("not found") {
                AppError::NotFound("Notification not found".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })?;

    Ok(Json(json!({
        "success": true,
        "notification": notification
    })))
}

#[axum::debug_handler]
pub async fn mark_all_notifications_read(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = NotificationService::new(&state);

    service.mark_all_read(&user.id, token).await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "All notifications marked as read"
    })))
}

/// The caller's mirrored notification feed, served from the hub without a
/// store round trip.
#[axum::debug_handler]
pub async fn get_live_notifications(
    Extension(user): Extension<User>,
    Extension(hub): Extension<Arc<RealtimeHub>>,
) -> Result<Json<Value>, AppError> {
    let user_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Invalid user id".to_string()))?;

    let notifications = hub.mirror_snapshot(user_id).await;

    Ok(Json(json!({ "notifications": notifications })))
}

/// Connection-status flag consumed by the status indicator.
#[axum::debug_handler]
pub async fn get_connection_status(
    Extension(hub): Extension<Arc<RealtimeHub>>,
) -> Result<Json<ConnectionStatusResponse>, AppError> {
    Ok(Json(ConnectionStatusResponse {
        status: hub.status().await,
        active_channels: hub.active_channels().await,
    }))
}
