use std::sync::Arc;
use axum::{
    extract::{State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{UpdateClinicSettingsRequest, UpdatePrivacyRequest, UpdateProfileRequest};
use crate::services::settings::SettingsService;

fn map_service_error(e: anyhow::Error) -> AppError {
    let message = e.to_string();
    if message.contains("not found") {
        AppError::NotFound(message)
    } else if message.contains("No fields") || message.contains("cannot be") {
        AppError::ValidationError(message)
    } else {
        AppError::Database(message)
    }
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = SettingsService::new(&state);

    let profile = service.get_profile(&user.id, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!(profile)))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = SettingsService::new(&state);

    let profile = service.update_profile(&user.id, request, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "profile": profile
    })))
}

#[axum::debug_handler]
pub async fn get_privacy_settings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = SettingsService::new(&state);

    let settings = service.get_privacy_settings(&user.id, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!(settings)))
}

#[axum::debug_handler]
pub async fn update_privacy_settings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePrivacyRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = SettingsService::new(&state);

    let settings = service.update_privacy_settings(&user.id, request, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "privacy_settings": settings
    })))
}

#[axum::debug_handler]
pub async fn get_clinic_settings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = SettingsService::new(&state);

    let settings = service.get_clinic_settings(token).await
        .map_err(map_service_error)?;

    Ok(Json(json!(settings)))
}

/// Writing clinic-wide policy is administrator-only.
#[axum::debug_handler]
pub async fn update_clinic_settings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateClinicSettingsRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only administrators may change clinic settings".to_string(),
        ));
    }
    request.validate().map_err(AppError::ValidationError)?;

    let service = SettingsService::new(&state);
    let settings = service.update_clinic_settings(request, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "clinic_settings": settings
    })))
}
