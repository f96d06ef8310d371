// libs/appointment-cell/src/services/booking.rs
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;
use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::pagination::{PageQuery, Paginated};

use crate::models::{
    Appointment, AppointmentListQuery, AppointmentStatus, BookAppointmentRequest,
    CancelAppointmentRequest, CancellationCheck, RecurringBookingRequest,
    RecurringBookingResponse, RescheduleAppointmentRequest, ScheduleError,
    SkippedOccurrence, UpdateAppointmentRequest,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::recurrence::expand_rule;
use crate::services::rules::load_scheduling_rules;

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    conflict_service: ConflictDetectionService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let conflict_service = ConflictDetectionService::new(Arc::clone(&supabase));

        Self {
            supabase,
            conflict_service,
        }
    }

    pub fn conflicts(&self) -> &ConflictDetectionService {
        &self.conflict_service
    }

    // ==============================================================================
    // BOOKING
    // ==============================================================================

    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, ScheduleError> {
        debug!("Booking appointment for patient {} with physiotherapist {}",
               request.patient_id, request.physiotherapist_id);

        let rules = load_scheduling_rules(&self.supabase, auth_token).await;
        validate_booking_request(&request, &rules, Utc::now())?;

        self.ensure_bookable(&request, None, auth_token).await?;
        self.insert_appointment(&request, None, auth_token).await
    }

    /// Expand a recurrence rule and book every occurrence that passes the
    /// conflict and capacity checks. Occurrences that do not fit are
    /// reported, not fatal.
    pub async fn book_recurring(
        &self,
        request: RecurringBookingRequest,
        auth_token: &str,
    ) -> Result<RecurringBookingResponse, ScheduleError> {
        let rules = load_scheduling_rules(&self.supabase, auth_token).await;
        validate_booking_request(&request.base, &rules, Utc::now())?;

        let occurrences = expand_rule(request.base.start_time, &request.rule)?;
        let recurrence_group_id = Uuid::new_v4();
        info!("Expanding recurring booking into {} occurrences (group {})",
              occurrences.len(), recurrence_group_id);

        let mut created = Vec::new();
        let mut skipped = Vec::new();

        for start_time in occurrences {
            let occurrence = BookAppointmentRequest {
                start_time,
                ..request.base.clone()
            };

            match self.ensure_bookable(&occurrence, None, auth_token).await {
                Ok(()) => {
                    let appointment = self
                        .insert_appointment(&occurrence, Some(recurrence_group_id), auth_token)
                        .await?;
                    created.push(appointment);
                }
                Err(ScheduleError::ConflictDetected) => {
                    skipped.push(SkippedOccurrence {
                        start_time,
                        reason: "conflicts with an existing booking".to_string(),
                    });
                }
                Err(ScheduleError::DailyLimitReached) => {
                    skipped.push(SkippedOccurrence {
                        start_time,
                        reason: "daily patient limit reached".to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(RecurringBookingResponse {
            recurrence_group_id,
            created,
            skipped,
        })
    }

    // ==============================================================================
    // READS
    // ==============================================================================

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, ScheduleError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ScheduleError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| ScheduleError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    pub async fn list_appointments(
        &self,
        query: &AppointmentListQuery,
        auth_token: &str,
    ) -> Result<Paginated<Appointment>, ScheduleError> {
        let page_query = PageQuery { page: query.page, limit: query.limit };
        let path = build_list_path(query, &page_query);

        let counted = self.supabase
            .get_with_count(&path, Some(auth_token))
            .await
            .map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = counted.rows.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| ScheduleError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        Ok(Paginated::new(appointments, counted.total, &page_query))
    }

    // ==============================================================================
    // UPDATES
    // ==============================================================================

    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, ScheduleError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        let mut update_data = serde_json::Map::new();

        if let Some(status) = request.status {
            if !current.status.can_transition_to(status) {
                return Err(ScheduleError::InvalidStatusTransition(current.status));
            }
            update_data.insert("status".to_string(), json!(status));
        }
        if let Some(room) = request.room {
            update_data.insert("room".to_string(), json!(room));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }

        if update_data.is_empty() {
            return Err(ScheduleError::ValidationError("No fields to update".to_string()));
        }

        self.patch_appointment(appointment_id, Value::Object(update_data), auth_token).await
    }

    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, ScheduleError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        if !matches!(current.status, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed) {
            return Err(ScheduleError::InvalidStatusTransition(current.status));
        }

        let rules = load_scheduling_rules(&self.supabase, auth_token).await;
        let duration = request.new_duration_minutes.unwrap_or(current.duration_minutes);

        let moved = BookAppointmentRequest {
            patient_id: current.patient_id,
            physiotherapist_id: current.physiotherapist_id,
            start_time: request.new_start_time,
            duration_minutes: duration,
            appointment_type: current.appointment_type,
            room: current.room.clone(),
            notes: None,
        };
        validate_booking_request(&moved, &rules, Utc::now())?;

        // The appointment being moved must not conflict with itself
        self.ensure_bookable(&moved, Some(appointment_id), auth_token).await?;

        let mut update_data = serde_json::Map::new();
        update_data.insert("start_time".to_string(), json!(request.new_start_time.to_rfc3339()));
        update_data.insert("duration_minutes".to_string(), json!(duration));
        if let Some(reason) = request.reason {
            update_data.insert("notes".to_string(), json!(reason));
        }

        info!("Rescheduling appointment {} to {}", appointment_id, request.new_start_time);
        self.patch_appointment(appointment_id, Value::Object(update_data), auth_token).await
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
        bypass_window: bool,
        auth_token: &str,
    ) -> Result<Appointment, ScheduleError> {
        if request.reason.trim().is_empty() {
            return Err(ScheduleError::ValidationError(
                "Cancellation reason is required".to_string(),
            ));
        }

        let check = self.can_cancel(appointment_id, bypass_window, auth_token).await?;
        if !check.can_cancel {
            let reason = check.reason.unwrap_or_default();
            warn!("Cancellation refused for appointment {}: {}", appointment_id, reason);
            return Err(ScheduleError::CancellationWindowPassed);
        }

        let update_data = json!({
            "status": AppointmentStatus::Cancelled,
            "cancellation_reason": request.reason,
        });

        self.patch_appointment(appointment_id, update_data, auth_token).await
    }

    /// Cancellation policy: only scheduled/confirmed bookings, and only up
    /// to the clinic's cancellation window before the start. Administrators
    /// bypass the window but not the status check.
    pub async fn can_cancel(
        &self,
        appointment_id: Uuid,
        bypass_window: bool,
        auth_token: &str,
    ) -> Result<CancellationCheck, ScheduleError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        let rules = load_scheduling_rules(&self.supabase, auth_token).await;

        Ok(evaluate_cancellation(&appointment, rules.cancellation_window_hours, bypass_window, Utc::now()))
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn ensure_bookable(
        &self,
        request: &BookAppointmentRequest,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), ScheduleError> {
        let conflict = self.conflict_service
            .check_conflicts(
                request.physiotherapist_id,
                request.start_time,
                request.duration_minutes,
                exclude_appointment_id,
                auth_token,
            )
            .await?;
        if conflict.has_conflict {
            return Err(ScheduleError::ConflictDetected);
        }

        let limit = self.conflict_service
            .check_daily_patient_limit(
                request.physiotherapist_id,
                request.start_time.date_naive(),
                auth_token,
            )
            .await?;
        if !limit.within_limit {
            return Err(ScheduleError::DailyLimitReached);
        }

        Ok(())
    }

    async fn insert_appointment(
        &self,
        request: &BookAppointmentRequest,
        recurrence_group_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Appointment, ScheduleError> {
        let appointment_data = json!({
            "patient_id": request.patient_id,
            "physiotherapist_id": request.physiotherapist_id,
            "start_time": request.start_time.to_rfc3339(),
            "duration_minutes": request.duration_minutes,
            "status": AppointmentStatus::Scheduled,
            "appointment_type": request.appointment_type,
            "room": request.room,
            "notes": request.notes,
            "recurrence_group_id": recurrence_group_id,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(appointment_data),
            Some(headers),
        ).await.map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ScheduleError::DatabaseError("Failed to create appointment".to_string()));
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| ScheduleError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;
        info!("Appointment {} booked for {}", appointment.id, appointment.start_time);

        Ok(appointment)
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        mut update_data: Value,
        auth_token: &str,
    ) -> Result<Appointment, ScheduleError> {
        if let Some(map) = update_data.as_object_mut() {
            map.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(headers),
        ).await.map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ScheduleError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| ScheduleError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }
}

/// Field-level validation. Runs before any call to the store.
pub fn validate_booking_request(
    request: &BookAppointmentRequest,
    rules: &crate::models::SchedulingRules,
    now: DateTime<Utc>,
) -> Result<(), ScheduleError> {
    if request.patient_id.is_nil() {
        return Err(ScheduleError::ValidationError("patient_id is required".to_string()));
    }
    if request.physiotherapist_id.is_nil() {
        return Err(ScheduleError::ValidationError("physiotherapist_id is required".to_string()));
    }
    if request.duration_minutes < rules.min_appointment_duration
        || request.duration_minutes > rules.max_appointment_duration
    {
        return Err(ScheduleError::ValidationError(format!(
            "Duration must be between {} and {} minutes",
            rules.min_appointment_duration, rules.max_appointment_duration
        )));
    }
    if request.start_time <= now {
        return Err(ScheduleError::InvalidTime("Appointment must be in the future".to_string()));
    }
    if request.start_time > now + Duration::days(rules.max_advance_booking_days) {
        return Err(ScheduleError::InvalidTime(format!(
            "Appointments can be booked at most {} days ahead",
            rules.max_advance_booking_days
        )));
    }

    Ok(())
}

fn evaluate_cancellation(
    appointment: &Appointment,
    cancellation_window_hours: i64,
    bypass_window: bool,
    now: DateTime<Utc>,
) -> CancellationCheck {
    if !matches!(
        appointment.status,
        AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
    ) {
        return CancellationCheck {
            can_cancel: false,
            reason: Some(format!(
                "Appointment in status {} cannot be cancelled",
                appointment.status
            )),
        };
    }

    if bypass_window {
        return CancellationCheck { can_cancel: true, reason: None };
    }

    let deadline = appointment.start_time - Duration::hours(cancellation_window_hours);
    if now > deadline {
        return CancellationCheck {
            can_cancel: false,
            reason: Some(format!(
                "Cancellations close {} hours before the appointment",
                cancellation_window_hours
            )),
        };
    }

    CancellationCheck { can_cancel: true, reason: None }
}

fn build_list_path(query: &AppointmentListQuery, page_query: &PageQuery) -> String {
    let mut query_parts = Vec::new();

    if let Some(patient_id) = query.patient_id {
        query_parts.push(format!("patient_id=eq.{}", patient_id));
    }
    if let Some(physiotherapist_id) = query.physiotherapist_id {
        query_parts.push(format!("physiotherapist_id=eq.{}", physiotherapist_id));
    }
    if let Some(status) = query.status {
        query_parts.push(format!("status=eq.{}", status));
    }
    if let Some(appointment_type) = query.appointment_type {
        query_parts.push(format!("appointment_type=eq.{}", appointment_type));
    }
    if let Some(from_date) = query.from_date {
        query_parts.push(format!("start_time=gte.{}", from_date.to_rfc3339()));
    }
    if let Some(to_date) = query.to_date {
        query_parts.push(format!("start_time=lte.{}", to_date.to_rfc3339()));
    }

    query_parts.push("order=start_time.asc".to_string());
    query_parts.push(page_query.to_range_params());

    format!("/rest/v1/appointments?{}", query_parts.join("&"))
}
