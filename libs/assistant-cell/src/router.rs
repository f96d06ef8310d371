use std::sync::Arc;
use axum::{
    middleware,
    routing::post,
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

pub fn assistant_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/chat", post(handlers::chat))
        .layer(middleware::from_fn(clinic_members_only))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
