use std::sync::Arc;
use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn settings_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/profile", get(handlers::get_profile))
        .route("/profile", put(handlers::update_profile))
        .route("/privacy", get(handlers::get_privacy_settings))
        .route("/privacy", put(handlers::update_privacy_settings))
        .route("/clinic", get(handlers::get_clinic_settings))
        .route("/clinic", put(handlers::update_clinic_settings))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
