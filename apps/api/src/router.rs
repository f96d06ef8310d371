use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use assistant_cell::router::assistant_routes;
use auth_cell::router::auth_routes;
use billing_cell::router::billing_routes;
use exercise_cell::router::exercise_routes;
use notification_cell::router::notification_routes;
use notification_cell::services::hub::RealtimeHub;
use partnership_cell::router::partnership_routes;
use patient_cell::router::patient_routes;
use report_cell::router::report_routes;
use settings_cell::router::settings_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>, hub: Arc<RealtimeHub>) -> Router {
    Router::new()
        .route("/", get(|| async { "Physio Clinic API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone(), hub.clone()))
        .nest("/exercises", exercise_routes(state.clone()))
        .nest("/billing", billing_routes(state.clone()))
        .nest("/partnerships", partnership_routes(state.clone()))
        .nest("/notifications", notification_routes(state.clone(), hub))
        .nest("/reports", report_routes(state.clone()))
        .nest("/ai", assistant_routes(state.clone()))
        .nest("/settings", settings_routes(state))
}
