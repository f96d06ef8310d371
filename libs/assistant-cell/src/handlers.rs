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

use crate::models::ChatRequest;
use crate::services::ai::AssistantService;

#[axum::debug_handler]
pub async fn chat(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    request.validate().map_err(AppError::ValidationError)?;

    // Patient context is only attached for users allowed to see that patient
    if let Some(patient_id) = request.patient_id {
        if !user.can_access_records_of(&patient_id.to_string()) {
            return Err(AppError::Forbidden(
                "Not authorized to attach this patient's context".to_string(),
            ));
        }
    }

    let service = AssistantService::new(&state)
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    let response = service.chat(&user.id, &request, token).await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("not found") {
                AppError::NotFound(message)
            } else {
                AppError::ExternalService(message)
            }
        })?;

    Ok(Json(json!(response)))
}
