// libs/notification-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware, Extension,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::hub::RealtimeHub;

pub fn notification_routes(state: Arc<AppConfig>, hub: Arc<RealtimeHub>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_notifications))
        .route("/{notification_id}/read", post(handlers::mark_notification_read))
        .route("/read-all", post(handlers::mark_all_notifications_read))
        .route("/live", get(handlers::get_live_notifications))
        .route("/status", get(handlers::get_connection_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(Extension(hub));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
