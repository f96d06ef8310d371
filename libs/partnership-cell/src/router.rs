use std::sync::Arc;
use axum::{
    middleware,
    routing::{get, post, put},
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

/// Partners reach only their own record and commission summary; the
/// handlers enforce that ownership.
async fn partnership_members_only(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_roles(
        &request,
        &[UserRole::Administrator, UserRole::Secretary, UserRole::Partner],
    )?;
    Ok(next.run(request).await)
}

pub fn partnership_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_partner))
        .route("/", get(handlers::list_partners))
        .route("/{partner_id}", get(handlers::get_partner))
        .route("/{partner_id}", put(handlers::update_partner))
        .route("/{partner_id}/commission", get(handlers::get_commission))
        .layer(middleware::from_fn(partnership_members_only))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
