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

/// Partners never see patient records. Staff-only operations are narrowed
/// further inside the handlers.
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

pub fn patient_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_patient))
        .route("/", get(handlers::search_patients))
        .route("/{patient_id}", get(handlers::get_patient))
        .route("/{patient_id}", put(handlers::update_patient))
        .route("/{patient_id}", delete(handlers::delete_patient))
        .route("/{patient_id}/documents", post(handlers::upload_document))
        .route("/{patient_id}/documents", get(handlers::list_documents))
        .layer(middleware::from_fn(clinic_members_only))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
