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
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CreateExerciseRequest, CreatePrescriptionRequest, ExerciseSearchQuery,
    UpdateExerciseRequest, UpdatePrescriptionRequest,
};
use crate::services::exercise::ExerciseService;
use crate::services::prescription::PrescriptionService;

/// Library writes and prescriptions belong to physiotherapists and
/// administrators.
fn require_prescriber(user: &User) -> Result<(), AppError> {
    use shared_models::auth::UserRole;
    match user.role {
        Some(UserRole::Administrator) | Some(UserRole::Physiotherapist) => Ok(()),
        _ => Err(AppError::Forbidden(
            "Not authorized to manage the exercise library".to_string(),
        )),
    }
}

fn map_service_error(e: anyhow::Error) -> AppError {
    let message = e.to_string();
    if message.contains("not found") {
        AppError::NotFound(message)
    } else if message.contains("No fields") || message.contains("must be") || message.contains("at least one") {
        AppError::ValidationError(message)
    } else {
        AppError::Database(message)
    }
}

// ==============================================================================
// EXERCISE LIBRARY
// ==============================================================================

#[axum::debug_handler]
pub async fn create_exercise(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateExerciseRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_prescriber(&user)?;
    request.validate().map_err(AppError::ValidationError)?;

    let service = ExerciseService::new(&state);
    let exercise = service.create_exercise(request, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "exercise": exercise
    })))
}

#[axum::debug_handler]
pub async fn get_exercise(
    State(state): State<Arc<AppConfig>>,
    Path(exercise_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = ExerciseService::new(&state);

    let exercise = service.get_exercise(&exercise_id.to_string(), token).await
        .map_err(map_service_error)?;

    Ok(Json(json!(exercise)))
}

#[axum::debug_handler]
pub async fn search_exercises(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<ExerciseSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = ExerciseService::new(&state);

    let page = service.search_exercises(&query, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "exercises": page.items,
        "total": page.total,
        "page": page.page,
        "limit": page.limit,
        "total_pages": page.total_pages
    })))
}

#[axum::debug_handler]
pub async fn update_exercise(
    State(state): State<Arc<AppConfig>>,
    Path(exercise_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateExerciseRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_prescriber(&user)?;
    let service = ExerciseService::new(&state);

    let exercise = service.update_exercise(&exercise_id.to_string(), request, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "exercise": exercise
    })))
}

#[axum::debug_handler]
pub async fn delete_exercise(
    State(state): State<Arc<AppConfig>>,
    Path(exercise_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_prescriber(&user)?;
    let service = ExerciseService::new(&state);

    service.delete_exercise(&exercise_id.to_string(), token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Exercise deleted"
    })))
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_prescription(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_prescriber(&user)?;
    request.validate().map_err(AppError::ValidationError)?;

    let physiotherapist_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Invalid user id".to_string()))?;

    let service = PrescriptionService::new(&state);
    let prescription = service
        .create_prescription(physiotherapist_id, request, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "prescription": prescription
    })))
}

#[axum::debug_handler]
pub async fn get_prescription(
    State(state): State<Arc<AppConfig>>,
    Path(prescription_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = PrescriptionService::new(&state);

    let prescription = service.get_prescription(&prescription_id.to_string(), token).await
        .map_err(map_service_error)?;

    if !user.can_access_records_of(&prescription.patient_id.to_string()) {
        return Err(AppError::Forbidden(
            "Not authorized to view this prescription".to_string(),
        ));
    }

    Ok(Json(json!(prescription)))
}

#[axum::debug_handler]
pub async fn list_patient_prescriptions(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.can_access_records_of(&patient_id.to_string()) {
        return Err(AppError::Forbidden(
            "Not authorized to view prescriptions for this patient".to_string(),
        ));
    }

    let service = PrescriptionService::new(&state);
    let prescriptions = service
        .list_patient_prescriptions(&patient_id.to_string(), token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({ "prescriptions": prescriptions })))
}

#[axum::debug_handler]
pub async fn update_prescription(
    State(state): State<Arc<AppConfig>>,
    Path(prescription_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePrescriptionRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_prescriber(&user)?;
    let service = PrescriptionService::new(&state);

    let prescription = service
        .update_prescription(&prescription_id.to_string(), request, token)
        .await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "prescription": prescription
    })))
}
