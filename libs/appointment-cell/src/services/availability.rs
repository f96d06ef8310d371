// libs/appointment-cell/src/services/availability.rs
use chrono::{Datelike, Duration, NaiveDate};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use std::sync::Arc;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, SchedulingRules, ScheduleError, Slot};
use crate::services::interval_index::IntervalIndex;
use crate::services::rules::load_scheduling_rules;

pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
}

impl AvailabilityService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Free slots for one physiotherapist on one date.
    pub async fn get_available_slots(
        &self,
        physiotherapist_id: Uuid,
        date: NaiveDate,
        requested_duration: Option<i32>,
        auth_token: &str,
    ) -> Result<Vec<Slot>, ScheduleError> {
        debug!("Calculating available slots for physiotherapist {} on {}", physiotherapist_id, date);

        let rules = load_scheduling_rules(&self.supabase, auth_token).await;
        let duration = requested_duration.unwrap_or(rules.default_duration_minutes);

        if duration < rules.min_appointment_duration || duration > rules.max_appointment_duration {
            return Err(ScheduleError::ValidationError(format!(
                "Duration must be between {} and {} minutes",
                rules.min_appointment_duration, rules.max_appointment_duration
            )));
        }

        let appointments = self
            .get_appointments_for_date(physiotherapist_id, date, &rules, auth_token)
            .await?;
        let index = IntervalIndex::from_appointments(appointments.iter());

        let slots = compute_slots(date, duration, &rules, &index);
        debug!("Found {} available slots", slots.len());
        Ok(slots)
    }

    async fn get_appointments_for_date(
        &self,
        physiotherapist_id: Uuid,
        date: NaiveDate,
        rules: &SchedulingRules,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, ScheduleError> {
        let start_of_day = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end_of_day = start_of_day + Duration::days(1);
        // Look back far enough to catch a booking that started the previous
        // evening and runs past midnight.
        let lookback = start_of_day - Duration::minutes(rules.max_appointment_duration as i64);

        let path = format!(
            "/rest/v1/appointments?physiotherapist_id=eq.{}&start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            physiotherapist_id,
            lookback.to_rfc3339(),
            end_of_day.to_rfc3339()
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| ScheduleError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        Ok(appointments)
    }
}

/// Step through the working window and keep the starts that fit without
/// touching a booked interval. Produces a sorted, non-overlapping list.
pub fn compute_slots(
    date: NaiveDate,
    duration_minutes: i32,
    rules: &SchedulingRules,
    index: &IntervalIndex,
) -> Vec<Slot> {
    if !rules.working_days.contains(&date.weekday()) {
        return vec![];
    }

    let open = date.and_time(rules.opening_time).and_utc();
    let close = date.and_time(rules.closing_time).and_utc();
    let duration = Duration::minutes(duration_minutes as i64);
    let step = Duration::minutes(rules.slot_step_minutes.max(1) as i64);

    let mut slots = Vec::new();
    let mut last_end = open - Duration::minutes(1);
    let mut current = open;

    while current + duration <= close {
        let slot_end = current + duration;

        if index.is_free(current, slot_end, None) && current >= last_end {
            slots.push(Slot {
                start_time: current,
                end_time: slot_end,
                duration_minutes,
            });
            last_end = slot_end;
        }

        current += step;
    }

    slots
}
