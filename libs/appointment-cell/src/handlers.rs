// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;

use notification_cell::models::{ChangeEvent, ChangeEventKind, NotificationKind};
use notification_cell::services::hub::RealtimeHub;
use notification_cell::services::notification::NotificationService;

use crate::models::{
    AppointmentListQuery, BookAppointmentRequest, CancelAppointmentRequest,
    ConflictCheckQuery, RecurringBookingRequest, RescheduleAppointmentRequest,
    ScheduleError, SlotsQuery, UpdateAppointmentRequest,
};
use crate::services::availability::AvailabilityService;
use crate::services::booking::AppointmentBookingService;

fn map_schedule_error(e: ScheduleError) -> AppError {
    match e {
        ScheduleError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        ScheduleError::ConflictDetected => {
            AppError::Conflict("Appointment slot conflicts with existing booking".to_string())
        }
        ScheduleError::DailyLimitReached => {
            AppError::Conflict("Daily patient limit reached for this physiotherapist".to_string())
        }
        ScheduleError::InvalidTime(msg) => AppError::BadRequest(msg),
        ScheduleError::InvalidStatusTransition(status) => {
            AppError::BadRequest(format!("Appointment cannot be modified in status {}", status))
        }
        ScheduleError::CancellationWindowPassed => {
            AppError::BadRequest("Cancellation window has passed".to_string())
        }
        ScheduleError::ValidationError(msg) => AppError::ValidationError(msg),
        ScheduleError::DatabaseError(msg) => AppError::Database(msg),
    }
}

/// Write a notification row for the patient and push it through the hub.
/// A failure here never fails the booking itself.
async fn notify_patient(
    state: &Arc<AppConfig>,
    hub: &RealtimeHub,
    patient_id: Uuid,
    kind: NotificationKind,
    title: &str,
    appointment_id: Uuid,
    token: &str,
) {
    let service = NotificationService::new(state);
    match service
        .create_notification(patient_id, kind, title, None, Some(appointment_id), token)
        .await
    {
        Ok(notification) => {
            hub.publish(&ChangeEvent::new(
                "notifications",
                ChangeEventKind::Insert,
                json!(notification),
                Some(patient_id),
            )).await;
        }
        Err(e) => tracing::warn!("Failed to create notification for {}: {}", patient_id, e),
    }
}

/// Patients may only act on their own bookings; staff on any.
fn authorize_for_patient(user: &User, patient_id: Uuid) -> Result<(), AppError> {
    if user.can_access_records_of(&patient_id.to_string()) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Not authorized to manage appointments for this patient".to_string(),
        ))
    }
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(hub): Extension<Arc<RealtimeHub>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    authorize_for_patient(&user, request.patient_id)?;

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service
        .book_appointment(request, token)
        .await
        .map_err(map_schedule_error)?;

    hub.publish(&ChangeEvent::new(
        "appointments",
        ChangeEventKind::Insert,
        json!(appointment),
        Some(appointment.patient_id),
    )).await;
    notify_patient(
        &state,
        &hub,
        appointment.patient_id,
        NotificationKind::AppointmentBooked,
        "Your appointment has been booked",
        appointment.id,
        token,
    ).await;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn book_recurring_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(hub): Extension<Arc<RealtimeHub>>,
    Json(request): Json<RecurringBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    authorize_for_patient(&user, request.base.patient_id)?;

    let booking_service = AppointmentBookingService::new(&state);
    let response = booking_service
        .book_recurring(request, token)
        .await
        .map_err(map_schedule_error)?;

    for appointment in &response.created {
        hub.publish(&ChangeEvent::new(
            "appointments",
            ChangeEventKind::Insert,
            json!(appointment),
            Some(appointment.patient_id),
        )).await;
    }

    Ok(Json(json!({
        "success": true,
        "recurring": response
    })))
}

// ==============================================================================
// READ HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(mut query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Patients only ever see their own bookings
    if user.role == Some(UserRole::Patient) {
        let own_id = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::Auth("Invalid user id".to_string()))?;
        query.patient_id = Some(own_id);
    }

    let booking_service = AppointmentBookingService::new(&state);
    let page = booking_service
        .list_appointments(&query, token)
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "appointments": page.items,
        "total": page.total,
        "page": page.page,
        "limit": page.limit,
        "total_pages": page.total_pages
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let appointment = booking_service
        .get_appointment(appointment_id, token)
        .await
        .map_err(map_schedule_error)?;

    authorize_for_patient(&user, appointment.patient_id)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let supabase = Arc::new(shared_database::supabase::SupabaseClient::new(&state));
    let availability_service = AvailabilityService::new(supabase);

    let slots = availability_service
        .get_available_slots(
            query.physiotherapist_id,
            query.date,
            query.duration_minutes,
            token,
        )
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!({
        "physiotherapist_id": query.physiotherapist_id,
        "date": query.date,
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let response = booking_service
        .conflicts()
        .check_conflicts(
            query.physiotherapist_id,
            query.start_time,
            query.duration_minutes,
            query.exclude_appointment_id,
            token,
        )
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn check_daily_limit(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let check = booking_service
        .conflicts()
        .check_daily_patient_limit(query.physiotherapist_id, query.date, token)
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!(check)))
}

// ==============================================================================
// UPDATE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(hub): Extension<Arc<RealtimeHub>>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Status and notes changes are a staff concern
    if !user.role.map(|r| r.is_staff()).unwrap_or(false) {
        return Err(AppError::Forbidden(
            "Not authorized to update appointments".to_string(),
        ));
    }

    let booking_service = AppointmentBookingService::new(&state);
    let appointment = booking_service
        .update_appointment(appointment_id, request, token)
        .await
        .map_err(map_schedule_error)?;

    hub.publish(&ChangeEvent::new(
        "appointments",
        ChangeEventKind::Update,
        json!(appointment),
        Some(appointment.patient_id),
    )).await;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(hub): Extension<Arc<RealtimeHub>>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let current = booking_service
        .get_appointment(appointment_id, token)
        .await
        .map_err(map_schedule_error)?;
    authorize_for_patient(&user, current.patient_id)?;

    let appointment = booking_service
        .reschedule_appointment(appointment_id, request, token)
        .await
        .map_err(map_schedule_error)?;

    hub.publish(&ChangeEvent::new(
        "appointments",
        ChangeEventKind::Update,
        json!(appointment),
        Some(appointment.patient_id),
    )).await;
    notify_patient(
        &state,
        &hub,
        appointment.patient_id,
        NotificationKind::AppointmentRescheduled,
        "Your appointment has been rescheduled",
        appointment.id,
        token,
    ).await;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(hub): Extension<Arc<RealtimeHub>>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let current = booking_service
        .get_appointment(appointment_id, token)
        .await
        .map_err(map_schedule_error)?;
    authorize_for_patient(&user, current.patient_id)?;

    let appointment = booking_service
        .cancel_appointment(appointment_id, request, user.is_admin(), token)
        .await
        .map_err(map_schedule_error)?;

    hub.publish(&ChangeEvent::new(
        "appointments",
        ChangeEventKind::Update,
        json!(appointment),
        Some(appointment.patient_id),
    )).await;
    notify_patient(
        &state,
        &hub,
        appointment.patient_id,
        NotificationKind::AppointmentCancelled,
        "Your appointment has been cancelled",
        appointment.id,
        token,
    ).await;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn check_cancellation(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = AppointmentBookingService::new(&state);

    let current = booking_service
        .get_appointment(appointment_id, token)
        .await
        .map_err(map_schedule_error)?;
    authorize_for_patient(&user, current.patient_id)?;

    let check = booking_service
        .can_cancel(appointment_id, user.is_admin(), token)
        .await
        .map_err(map_schedule_error)?;

    Ok(Json(json!(check)))
}
