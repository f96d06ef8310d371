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

use crate::models::{CreateInvoiceRequest, InvoiceListQuery, RecordPaymentRequest};
use crate::services::billing::BillingService;

/// Billing writes belong to the front desk and administrators.
fn require_billing_staff(user: &User) -> Result<(), AppError> {
    match user.role {
        Some(UserRole::Administrator) | Some(UserRole::Secretary) => Ok(()),
        _ => Err(AppError::Forbidden(
            "Not authorized to manage billing".to_string(),
        )),
    }
}

fn map_service_error(e: anyhow::Error) -> AppError {
    let message = e.to_string();
    if message.contains("not found") {
        AppError::NotFound(message)
    } else if message.contains("cannot") {
        AppError::BadRequest(message)
    } else {
        AppError::Database(message)
    }
}

#[axum::debug_handler]
pub async fn create_invoice(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_billing_staff(&user)?;
    request.validate().map_err(AppError::ValidationError)?;

    let service = BillingService::new(&state);
    let invoice = service.create_invoice(request, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "invoice": invoice
    })))
}

#[axum::debug_handler]
pub async fn get_invoice(
    State(state): State<Arc<AppConfig>>,
    Path(invoice_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = BillingService::new(&state);

    let invoice = service.get_invoice(&invoice_id.to_string(), token).await
        .map_err(map_service_error)?;

    if !user.can_access_records_of(&invoice.patient_id.to_string()) {
        return Err(AppError::Forbidden(
            "Not authorized to view this invoice".to_string(),
        ));
    }

    Ok(Json(json!(invoice)))
}

#[axum::debug_handler]
pub async fn list_invoices(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(mut query): Query<InvoiceListQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Patients only see their own invoices
    if user.role == Some(UserRole::Patient) {
        let own_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::Auth("Invalid user id".to_string()))?;
        query.patient_id = Some(own_id);
    }

    let service = BillingService::new(&state);
    let page = service.list_invoices(&query, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "invoices": page.items,
        "total": page.total,
        "page": page.page,
        "limit": page.limit,
        "total_pages": page.total_pages
    })))
}

#[axum::debug_handler]
pub async fn record_payment(
    State(state): State<Arc<AppConfig>>,
    Path(invoice_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_billing_staff(&user)?;
    request.validate().map_err(AppError::ValidationError)?;

    let service = BillingService::new(&state);
    let (payment, invoice) = service.record_payment(invoice_id, request, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "payment": payment,
        "invoice": invoice
    })))
}

#[axum::debug_handler]
pub async fn list_payments(
    State(state): State<Arc<AppConfig>>,
    Path(invoice_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = BillingService::new(&state);

    let invoice = service.get_invoice(&invoice_id.to_string(), token).await
        .map_err(map_service_error)?;
    if !user.can_access_records_of(&invoice.patient_id.to_string()) {
        return Err(AppError::Forbidden(
            "Not authorized to view payments on this invoice".to_string(),
        ));
    }

    let payments = service.list_payments(invoice_id, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({ "payments": payments })))
}

#[axum::debug_handler]
pub async fn sweep_overdue(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_billing_staff(&user)?;

    let service = BillingService::new(&state);
    let overdue = service.sweep_overdue(token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "overdue": overdue
    })))
}

#[axum::debug_handler]
pub async fn void_invoice(
    State(state): State<Arc<AppConfig>>,
    Path(invoice_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    require_billing_staff(&user)?;

    let service = BillingService::new(&state);
    let invoice = service.void_invoice(invoice_id, token).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "success": true,
        "invoice": invoice
    })))
}
