// libs/appointment-cell/src/services/conflict.rs
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use std::collections::HashSet;
use std::sync::Arc;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, ConflictCheckResponse, DailyLimitCheck, ScheduleError, SchedulingRules, Slot,
};
use crate::services::availability::compute_slots;
use crate::services::interval_index::IntervalIndex;
use crate::services::rules::load_scheduling_rules;

pub struct ConflictDetectionService {
    supabase: Arc<SupabaseClient>,
}

impl ConflictDetectionService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Check a candidate interval against the physiotherapist's existing
    /// bookings. Suggests up to three alternatives when it conflicts.
    pub async fn check_conflicts(
        &self,
        physiotherapist_id: Uuid,
        start_time: DateTime<Utc>,
        duration_minutes: i32,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<ConflictCheckResponse, ScheduleError> {
        debug!("Checking conflicts for physiotherapist {} at {} for {} minutes",
               physiotherapist_id, start_time, duration_minutes);

        let rules = load_scheduling_rules(&self.supabase, auth_token).await;
        let end_time = start_time + Duration::minutes(duration_minutes as i64);

        let appointments = self
            .get_appointments_in_window(
                physiotherapist_id,
                start_time.date_naive(),
                &rules,
                auth_token,
            )
            .await?;

        let index = IntervalIndex::from_appointments(appointments.iter());
        let conflicting_ids: HashSet<Uuid> = index
            .conflicts_with(start_time, end_time, exclude_appointment_id)
            .into_iter()
            .map(|interval| interval.id)
            .collect();

        let conflicting_appointments: Vec<Appointment> = appointments
            .iter()
            .filter(|apt| conflicting_ids.contains(&apt.id))
            .cloned()
            .collect();

        let has_conflict = !conflicting_appointments.is_empty();

        let suggested_alternatives = if has_conflict {
            warn!("Conflict detected for physiotherapist {} - {} conflicting appointments",
                  physiotherapist_id, conflicting_appointments.len());
            self.suggest_alternatives(start_time, duration_minutes, &rules, &index)
        } else {
            vec![]
        };

        Ok(ConflictCheckResponse {
            has_conflict,
            conflicting_appointments,
            suggested_alternatives,
        })
    }

    /// Whether the physiotherapist can still take a new patient on `date`.
    pub async fn check_daily_patient_limit(
        &self,
        physiotherapist_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<DailyLimitCheck, ScheduleError> {
        debug!("Checking daily patient limit for physiotherapist {} on {}", physiotherapist_id, date);

        let rules = load_scheduling_rules(&self.supabase, auth_token).await;

        let start_of_day = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end_of_day = start_of_day + Duration::days(1);

        let path = format!(
            "/rest/v1/appointments?physiotherapist_id=eq.{}&start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            physiotherapist_id,
            start_of_day.to_rfc3339(),
            end_of_day.to_rfc3339()
        );

        let appointments = self.fetch_appointments(&path, auth_token).await?;

        let patients_seen = appointments
            .iter()
            .filter(|apt| apt.is_active())
            .map(|apt| apt.patient_id)
            .collect::<HashSet<_>>()
            .len() as i64;

        Ok(DailyLimitCheck {
            physiotherapist_id,
            date,
            patients_seen,
            limit: rules.daily_patient_limit,
            within_limit: patients_seen < rules.daily_patient_limit as i64,
        })
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    /// Bookings that could overlap anything on `date` or the week after it:
    /// a lookback covering the longest bookable appointment, plus the days
    /// the alternative-slot fallback may reach into.
    async fn get_appointments_in_window(
        &self,
        physiotherapist_id: Uuid,
        date: NaiveDate,
        rules: &SchedulingRules,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, ScheduleError> {
        let start_of_day = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let window_start = start_of_day - Duration::minutes(rules.max_appointment_duration as i64);
        let window_end = start_of_day + Duration::days(8);

        let path = format!(
            "/rest/v1/appointments?physiotherapist_id=eq.{}&start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            physiotherapist_id,
            window_start.to_rfc3339(),
            window_end.to_rfc3339()
        );

        self.fetch_appointments(&path, auth_token).await
    }

    async fn fetch_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, ScheduleError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ScheduleError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| ScheduleError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    /// Same-day gaps around the requested time, falling back to the next
    /// working days. At most three suggestions.
    fn suggest_alternatives(
        &self,
        requested_start: DateTime<Utc>,
        duration_minutes: i32,
        rules: &SchedulingRules,
        index: &IntervalIndex,
    ) -> Vec<Slot> {
        let duration = Duration::minutes(duration_minutes as i64);
        let date = requested_start.date_naive();
        let mut suggestions = Vec::new();

        let close = date.and_time(rules.closing_time).and_utc();
        let mut cursor = requested_start;
        while suggestions.len() < 3 {
            match index.next_gap_after(cursor, duration, close) {
                Some(start) if start != requested_start => {
                    suggestions.push(Slot {
                        start_time: start,
                        end_time: start + duration,
                        duration_minutes,
                    });
                    cursor = start + duration;
                }
                Some(start) => cursor = start + duration,
                None => break,
            }
        }

        // Fall back to the first slots of the following days
        let mut day_offset = 1;
        while suggestions.len() < 3 && day_offset <= 7 {
            let next_date = date + Duration::days(day_offset);
            if rules.working_days.contains(&next_date.weekday()) {
                // Other days of the window were already indexed; their
                // bookings appear in `index` and are respected here.
                if let Some(slot) = compute_slots(next_date, duration_minutes, rules, index)
                    .into_iter()
                    .next()
                {
                    suggestions.push(slot);
                }
            }
            day_offset += 1;
        }

        suggestions.truncate(3);
        suggestions
    }
}
