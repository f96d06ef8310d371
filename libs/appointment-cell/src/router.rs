// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put, patch},
    middleware, Extension,
    extract::Request,
    middleware::Next,
    response::Response,
    body::Body,
};

use shared_config::AppConfig;
use shared_models::auth::UserRole;
use shared_models::error::AppError;
use shared_utils::extractor::{auth_middleware, require_roles};

use notification_cell::services::hub::RealtimeHub;

use crate::handlers;

/// Partners have no business on the schedule; everyone else passes and is
/// narrowed further inside the handlers.
async fn clinic_members_only(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_roles(
        &request,
        &[
            UserRole::Administrator,
            UserRole::Physiotherapist,
            UserRole::Secretary,
            UserRole::Patient,
        ],
    )?;
    Ok(next.run(request).await)
}

pub fn appointment_routes(state: Arc<AppConfig>, hub: Arc<RealtimeHub>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/", get(handlers::list_appointments))
        .route("/recurring", post(handlers::book_recurring_appointments))

        // Scheduling utilities
        .route("/slots", get(handlers::get_available_slots))
        .route("/conflicts/check", get(handlers::check_appointment_conflicts))
        .route("/daily-limit", get(handlers::check_daily_limit))

        // Single-appointment operations
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", put(handlers::update_appointment))
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/can-cancel", get(handlers::check_cancellation))

        .layer(middleware::from_fn(clinic_members_only))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(Extension(hub));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
