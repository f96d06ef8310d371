use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveTime, Utc};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    /// Physiotherapists carry their specialty and council registration.
    pub specialty: Option<String>,
    pub council_registration: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub specialty: Option<String>,
    pub council_registration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacySettings {
    pub user_id: Uuid,
    pub marketing_opt_in: bool,
    pub share_data_with_partners: bool,
    pub notification_channels: Vec<NotificationChannel>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    Push,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePrivacyRequest {
    pub marketing_opt_in: Option<bool>,
    pub share_data_with_partners: Option<bool>,
    pub notification_channels: Option<Vec<NotificationChannel>>,
}

/// Singleton row; scheduling reads its policy fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicSettings {
    pub id: Uuid,
    pub clinic_name: String,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub working_days: Vec<String>,
    pub slot_step_minutes: i32,
    pub default_duration_minutes: i32,
    pub daily_patient_limit: i32,
    pub cancellation_window_hours: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateClinicSettingsRequest {
    pub clinic_name: Option<String>,
    pub opening_time: Option<NaiveTime>,
    pub closing_time: Option<NaiveTime>,
    pub working_days: Option<Vec<String>>,
    pub slot_step_minutes: Option<i32>,
    pub default_duration_minutes: Option<i32>,
    pub daily_patient_limit: Option<i32>,
    pub cancellation_window_hours: Option<i64>,
}

impl UpdateClinicSettingsRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(open), Some(close)) = (self.opening_time, self.closing_time) {
            if open >= close {
                return Err("Opening time must be before closing time".to_string());
            }
        }
        if let Some(step) = self.slot_step_minutes {
            if step <= 0 {
                return Err("Slot step must be positive".to_string());
            }
        }
        if let Some(limit) = self.daily_patient_limit {
            if limit <= 0 {
                return Err("Daily patient limit must be positive".to_string());
            }
        }
        if let Some(hours) = self.cancellation_window_hours {
            if hours < 0 {
                return Err("Cancellation window cannot be negative".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clinic_settings_validation_bounds() {
        let mut request = UpdateClinicSettingsRequest {
            clinic_name: None,
            opening_time: Some(NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
            closing_time: Some(NaiveTime::from_hms_opt(19, 0, 0).unwrap()),
            working_days: None,
            slot_step_minutes: Some(30),
            default_duration_minutes: None,
            daily_patient_limit: Some(10),
            cancellation_window_hours: Some(24),
        };
        assert!(request.validate().is_ok());

        request.opening_time = Some(NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        assert!(request.validate().is_err());

        request.opening_time = Some(NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        request.slot_step_minutes = Some(0);
        assert!(request.validate().is_err());
    }
}
