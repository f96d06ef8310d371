use std::sync::Arc;
use axum::{
    extract::{Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;

use crate::models::ReportQuery;
use crate::services::reports::ReportService;

/// Financial numbers stay with the front desk and administrators.
fn require_financial_staff(user: &User) -> Result<(), AppError> {
    match user.role {
        Some(UserRole::Administrator) | Some(UserRole::Secretary) => Ok(()),
        _ => Err(AppError::Forbidden(
            "Not authorized to view financial reports".to_string(),
        )),
    }
}

fn require_staff(user: &User) -> Result<(), AppError> {
    if user.role.map(|r| r.is_staff()).unwrap_or(false) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized to view reports".to_string()))
    }
}

#[axum::debug_handler]
pub async fn financial_report(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_financial_staff(&user)?;
    query.validate().map_err(AppError::ValidationError)?;

    let service = ReportService::new(&state);
    let report = service.financial_report(&query, token).await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(report)))
}

#[axum::debug_handler]
pub async fn patients_report(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_staff(&user)?;
    query.validate().map_err(AppError::ValidationError)?;

    let service = ReportService::new(&state);
    let report = service.patients_report(&query, token).await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(report)))
}

#[axum::debug_handler]
pub async fn appointments_report(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_staff(&user)?;
    query.validate().map_err(AppError::ValidationError)?;

    let service = ReportService::new(&state);
    let report = service.appointments_report(&query, token).await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(report)))
}

#[axum::debug_handler]
pub async fn exercises_report(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_staff(&user)?;
    query.validate().map_err(AppError::ValidationError)?;

    let service = ReportService::new(&state);
    let report = service.exercises_report(&query, token).await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(report)))
}
