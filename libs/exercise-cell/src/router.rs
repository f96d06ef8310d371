use std::sync::Arc;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
    extract::Request,
    middleware::Next,
    response::Response,
    body::Body,
};
use shared_config::AppConfig;
use shared_models::auth::UserRole;
use shared_models::error::AppError;
use shared_utils::extractor::{auth_middleware, require_roles};

use crate::handlers;

/// Library writes and prescriptions are narrowed to physiotherapists and
/// administrators inside the handlers.
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

pub fn exercise_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_exercise))
        .route("/", get(handlers::search_exercises))
        .route("/prescriptions", post(handlers::create_prescription))
        .route("/prescriptions/{prescription_id}", get(handlers::get_prescription))
        .route("/prescriptions/{prescription_id}", put(handlers::update_prescription))
        .route("/prescriptions/patients/{patient_id}", get(handlers::list_patient_prescriptions))
        .route("/{exercise_id}", get(handlers::get_exercise))
        .route("/{exercise_id}", put(handlers::update_exercise))
        .route("/{exercise_id}", delete(handlers::delete_exercise))
        .layer(middleware::from_fn(clinic_members_only))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
