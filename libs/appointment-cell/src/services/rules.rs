// libs/appointment-cell/src/services/rules.rs
use chrono::{NaiveTime, Weekday};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use shared_database::supabase::SupabaseClient;

use crate::models::SchedulingRules;

/// Read the clinic_settings row and merge it over the built-in defaults.
/// A missing or unreadable row falls back to the defaults rather than
/// blocking scheduling.
pub async fn load_scheduling_rules(
    supabase: &SupabaseClient,
    auth_token: &str,
) -> SchedulingRules {
    let mut rules = SchedulingRules::default();

    let result: Result<Vec<Value>, _> = supabase.request(
        Method::GET,
        "/rest/v1/clinic_settings?limit=1",
        Some(auth_token),
        None,
    ).await;

    let row = match result {
        Ok(rows) if !rows.is_empty() => rows[0].clone(),
        Ok(_) => {
            debug!("No clinic_settings row, using scheduling defaults");
            return rules;
        }
        Err(e) => {
            warn!("Failed to load clinic settings, using defaults: {}", e);
            return rules;
        }
    };

    if let Some(time) = parse_time(&row, "opening_time") {
        rules.opening_time = time;
    }
    if let Some(time) = parse_time(&row, "closing_time") {
        rules.closing_time = time;
    }
    if let Some(days) = row["working_days"].as_array() {
        let parsed: Vec<Weekday> = days
            .iter()
            .filter_map(|d| d.as_str())
            .filter_map(parse_weekday)
            .collect();
        if !parsed.is_empty() {
            rules.working_days = parsed;
        }
    }
    if let Some(step) = row["slot_step_minutes"].as_i64() {
        if step > 0 {
            rules.slot_step_minutes = step as i32;
        }
    }
    if let Some(duration) = row["default_duration_minutes"].as_i64() {
        if duration > 0 {
            rules.default_duration_minutes = duration as i32;
        }
    }
    if let Some(limit) = row["daily_patient_limit"].as_i64() {
        if limit > 0 {
            rules.daily_patient_limit = limit as i32;
        }
    }
    if let Some(hours) = row["cancellation_window_hours"].as_i64() {
        if hours >= 0 {
            rules.cancellation_window_hours = hours;
        }
    }

    rules
}

fn parse_time(row: &Value, field: &str) -> Option<NaiveTime> {
    row[field]
        .as_str()
        .and_then(|raw| NaiveTime::parse_from_str(raw, "%H:%M:%S").ok())
}

fn parse_weekday(label: &str) -> Option<Weekday> {
    match label.to_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_labels_parse() {
        assert_eq!(parse_weekday("monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("Sat".to_lowercase().as_str()), Some(Weekday::Sat));
        assert_eq!(parse_weekday("someday"), None);
    }

    #[test]
    fn time_fields_parse() {
        let row = serde_json::json!({ "opening_time": "07:30:00" });
        assert_eq!(
            parse_time(&row, "opening_time"),
            Some(NaiveTime::from_hms_opt(7, 30, 0).unwrap())
        );
        assert_eq!(parse_time(&row, "closing_time"), None);
    }
}
