use std::sync::Arc;
use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;

use crate::models::{CommissionQuery, CreatePartnerRequest, UpdatePartnerRequest};
use crate::services::partnership::PartnershipService;

fn require_partnership_staff(user: &User) -> Result<(), AppError> {
    match user.role {
        Some(UserRole::Administrator) | Some(UserRole::Secretary) => Ok(()),
        _ => Err(AppError::Forbidden(
            "Not authorized to manage partnerships".to_string(),
        )),
    }
}

fn map_service_error(e: anyhow::Error) -> AppError {
    let message = e.to_string();
    if message.contains("not found") {
        AppError::NotFound(message)
    } else if message.contains("must") || message.contains("No fields") {
        AppError::ValidationError(message)
    } else {
        AppError::Database(message)
    }
}

#[axum::debug_handler]
pub async fn create_partner(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePartnerRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_partnership_staff(&user)?;
    request.validate().map_err(AppError::ValidationError)?;

    let service = PartnershipService::new(&state);
    let partner = service.create_partner(request, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "partner": partner
    })))
}

#[axum::debug_handler]
pub async fn get_partner(
    State(state): State<Arc<AppConfig>>,
    Path(partner_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Partners see their own record; staff see all
    let is_self = user.role == Some(UserRole::Partner) && user.id == partner_id.to_string();
    if !is_self {
        require_partnership_staff(&user)?;
    }

    let service = PartnershipService::new(&state);
    let partner = service.get_partner(&partner_id.to_string(), token).await
        .map_err(map_service_error)?;

    Ok(Json(json!(partner)))
}

#[axum::debug_handler]
pub async fn list_partners(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_partnership_staff(&user)?;

    let service = PartnershipService::new(&state);
    let partners = service.list_partners(token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({ "partners": partners })))
}

#[axum::debug_handler]
pub async fn update_partner(
    State(state): State<Arc<AppConfig>>,
    Path(partner_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePartnerRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_partnership_staff(&user)?;

    let service = PartnershipService::new(&state);
    let partner = service.update_partner(&partner_id.to_string(), request, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "partner": partner
    })))
}

#[axum::debug_handler]
pub async fn get_commission(
    State(state): State<Arc<AppConfig>>,
    Path(partner_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<CommissionQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_self = user.role == Some(UserRole::Partner) && user.id == partner_id.to_string();
    if !is_self {
        require_partnership_staff(&user)?;
    }

    let service = PartnershipService::new(&state);
    let summary = service.commission_summary(partner_id, &query, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!(summary)))
}
