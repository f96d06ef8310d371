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
    CreatePatientRequest, PatientSearchQuery, UpdatePatientRequest, UploadDocumentRequest,
};
use crate::services::document::DocumentService;
use crate::services::patient::PatientService;

/// Record management is a staff concern.
fn require_staff(user: &User) -> Result<(), AppError> {
    if user.role.map(|r| r.is_staff()).unwrap_or(false) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Not authorized to manage patient records".to_string(),
        ))
    }
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_staff(&user)?;

    // Reject before any store round trip
    request.validate().map_err(AppError::ValidationError)?;

    let service = PatientService::new(&state);
    let patient = service.create_patient(request, token).await
        .map_err(|e| {
            if e.to_string().contains("already exists") {
                AppError::Conflict(e.to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
        "message": "Patient created successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.can_access_records_of(&patient_id.to_string()) {
        return Err(AppError::Forbidden(
            "Not authorized to view this patient".to_string(),
        ));
    }

    let service = PatientService::new(&state);
    let patient = service.get_patient(&patient_id.to_string(), token).await
        .map_err(|e| {
            if e.to_string().contains("not found") {
                AppError::NotFound("Patient not found".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_staff(&user)?;
    let service = PatientService::new(&state);

    let page = service.search_patients(&query, token).await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({
        "patients": page.items,
        "total": page.total,
        "page": page.page,
        "limit": page.limit,
        "total_pages": page.total_pages
    })))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_staff(&user)?;
    let service = PatientService::new(&state);

    let patient = service.update_patient(&patient_id.to_string(), request, token).await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("No fields") {
                AppError::ValidationError(message)
            } else {
                AppError::Database(message)
            }
        })?;

    Ok(Json(json!({
        "success": true,
        "patient": patient
    })))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_staff(&user)?;
    let service = PatientService::new(&state);

    service.delete_patient(&patient_id.to_string(), token).await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Patient deleted"
    })))
}

// ==============================================================================
// CLINICAL DOCUMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn upload_document(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UploadDocumentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.can_access_records_of(&patient_id.to_string()) {
        return Err(AppError::Forbidden(
            "Not authorized to manage this patient's documents".to_string(),
        ));
    }

    let service = DocumentService::new(&state);
    let document = service.upload_document(&patient_id.to_string(), request, token).await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("base64") || message.contains("empty") {
                AppError::ValidationError(message)
            } else {
                AppError::Database(message)
            }
        })?;

    Ok(Json(json!({
        "success": true,
        "document": document
    })))
}

#[axum::debug_handler]
pub async fn list_documents(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.can_access_records_of(&patient_id.to_string()) {
        return Err(AppError::Forbidden(
            "Not authorized to view this patient's documents".to_string(),
        ));
    }

    let service = DocumentService::new(&state);
    let documents = service.list_documents(&patient_id.to_string(), token).await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({ "documents": documents })))
}
