use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReportQuery {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

impl ReportQuery {
    pub fn validate(&self) -> Result<(), String> {
        if self.from_date > self.to_date {
            return Err("from_date must not be after to_date".to_string());
        }
        Ok(())
    }
}

// ==============================================================================
// FINANCIAL
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialReport {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub revenue_cents: i64,
    pub outstanding_cents: i64,
    pub overdue_cents: i64,
    pub payment_method_breakdown: Vec<MethodRevenue>,
    pub monthly_series: Vec<MonthlyRevenue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodRevenue {
    pub method: String,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub revenue_cents: i64,
}

// ==============================================================================
// PATIENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientsReport {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub total_patients: i64,
    pub new_in_period: i64,
    pub status_breakdown: Vec<StatusCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentsReport {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub total_appointments: i64,
    pub status_breakdown: Vec<StatusCount>,
    /// no-shows / (completed + no-shows)
    pub no_show_rate: f64,
    pub busiest_weekdays: Vec<WeekdayCount>,
    pub physiotherapist_load: Vec<PhysiotherapistLoad>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekdayCount {
    pub weekday: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysiotherapistLoad {
    pub physiotherapist_id: Uuid,
    pub appointments: i64,
    pub booked_minutes: i64,
}

// ==============================================================================
// EXERCISES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExercisesReport {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub total_prescriptions: i64,
    pub active_prescriptions: i64,
    pub completed_prescriptions: i64,
    /// completed / total
    pub completion_rate: f64,
    pub most_prescribed: Vec<ExerciseCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseCount {
    pub exercise_id: Uuid,
    pub times_prescribed: i64,
}
