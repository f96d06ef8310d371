// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime, Weekday};
use std::fmt;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub physiotherapist_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub appointment_type: AppointmentType,
    pub room: Option<String>,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub recurrence_group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Scheduled end, exclusive: the appointment occupies [start, end).
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + chrono::Duration::minutes(self.duration_minutes as i64)
    }

    /// Whether this row blocks a slot for conflict purposes.
    pub fn is_active(&self) -> bool {
        self.status.blocks_slot()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Cancelled, no-show and completed rows never conflict with new bookings.
    pub fn blocks_slot(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled
                | AppointmentStatus::Confirmed
                | AppointmentStatus::InProgress
        )
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Scheduled, Confirmed)
                | (Scheduled, Cancelled)
                | (Scheduled, NoShow)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
                | (InProgress, Completed)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Evaluation,
    Session,
    Return,
    GroupSession,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Evaluation => write!(f, "evaluation"),
            AppointmentType::Session => write!(f, "session"),
            AppointmentType::Return => write!(f, "return"),
            AppointmentType::GroupSession => write!(f, "group_session"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub physiotherapist_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub appointment_type: AppointmentType,
    pub room: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: Option<AppointmentStatus>,
    pub room: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_start_time: DateTime<Utc>,
    pub new_duration_minutes: Option<i32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationCheck {
    pub can_cancel: bool,
    pub reason: Option<String>,
}

// ==============================================================================
// CONFLICT DETECTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictCheckQuery {
    pub physiotherapist_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointments: Vec<Appointment>,
    pub suggested_alternatives: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsQuery {
    pub physiotherapist_id: Uuid,
    pub date: NaiveDate,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyLimitCheck {
    pub physiotherapist_id: Uuid,
    pub date: NaiveDate,
    pub patients_seen: i64,
    pub limit: i32,
    pub within_limit: bool,
}

// ==============================================================================
// RECURRENCE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Biweekly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: RecurrenceFrequency,
    /// Number of occurrences, counting the first. Mutually exclusive with `until`.
    pub count: Option<u32>,
    /// Last calendar date an occurrence may fall on. Mutually exclusive with `count`.
    pub until: Option<NaiveDate>,
    /// For daily cadence: restrict occurrences to these weekdays.
    pub weekdays: Option<Vec<Weekday>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringBookingRequest {
    pub base: BookAppointmentRequest,
    pub rule: RecurrenceRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedOccurrence {
    pub start_time: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringBookingResponse {
    pub recurrence_group_id: Uuid,
    pub created: Vec<Appointment>,
    pub skipped: Vec<SkippedOccurrence>,
}

// ==============================================================================
// LIST QUERY
// ==============================================================================

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppointmentListQuery {
    pub patient_id: Option<Uuid>,
    pub physiotherapist_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub appointment_type: Option<AppointmentType>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// ==============================================================================
// SCHEDULING RULES
// ==============================================================================

/// Clinic-wide scheduling policy. Values come from the `clinic_settings`
/// row when present; these defaults apply otherwise.
#[derive(Debug, Clone)]
pub struct SchedulingRules {
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub working_days: Vec<Weekday>,
    pub slot_step_minutes: i32,
    pub default_duration_minutes: i32,
    pub min_appointment_duration: i32,
    pub max_appointment_duration: i32,
    pub max_advance_booking_days: i64,
    pub cancellation_window_hours: i64,
    pub daily_patient_limit: i32,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            opening_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            closing_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            slot_step_minutes: 30,
            default_duration_minutes: 45,
            min_appointment_duration: 15,
            max_appointment_duration: 180,
            max_advance_booking_days: 90,
            cancellation_window_hours: 24,
            daily_patient_limit: 12,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum ScheduleError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment conflicts with existing booking")]
    ConflictDetected,

    #[error("Daily patient limit reached for this physiotherapist")]
    DailyLimitReached,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Cancellation window has passed")]
    CancellationWindowPassed,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
