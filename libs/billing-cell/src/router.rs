use std::sync::Arc;
use axum::{
    middleware,
    routing::{get, post},
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

/// Billing writes are narrowed to secretary/administrator in the handlers;
/// patients may read their own invoices.
async fn billing_members_only(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_roles(
        &request,
        &[UserRole::Administrator, UserRole::Secretary, UserRole::Patient],
    )?;
    Ok(next.run(request).await)
}

pub fn billing_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/invoices", post(handlers::create_invoice))
        .route("/invoices", get(handlers::list_invoices))
        .route("/invoices/{invoice_id}", get(handlers::get_invoice))
        .route("/invoices/{invoice_id}/payments", post(handlers::record_payment))
        .route("/invoices/{invoice_id}/payments", get(handlers::list_payments))
        .route("/invoices/{invoice_id}/void", post(handlers::void_invoice))
        .route("/overdue", post(handlers::sweep_overdue))
        .layer(middleware::from_fn(billing_members_only))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
