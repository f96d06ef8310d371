use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    ClinicSettings, PrivacySettings, UpdateClinicSettingsRequest, UpdatePrivacyRequest,
    UpdateProfileRequest, UserProfile,
};

pub struct SettingsService {
    supabase: SupabaseClient,
}

impl SettingsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    // ==============================================================================
    // USER PROFILE
    // ==============================================================================

    pub async fn get_profile(&self, user_id: &str, auth_token: &str) -> Result<UserProfile> {
        debug!("Fetching profile for user {}", user_id);

        let path = format!("/rest/v1/user_profiles?user_id=eq.{}", user_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Profile not found"));
        }

        let profile: UserProfile = serde_json::from_value(result[0].clone())?;
        Ok(profile)
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
        auth_token: &str,
    ) -> Result<UserProfile> {
        debug!("Updating profile for user {}", user_id);

        let mut update_data = serde_json::Map::new();
        if let Some(full_name) = request.full_name {
            if full_name.trim().is_empty() {
                return Err(anyhow!("Full name cannot be empty"));
            }
            update_data.insert("full_name".to_string(), json!(full_name));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(avatar_url) = request.avatar_url {
            update_data.insert("avatar_url".to_string(), json!(avatar_url));
        }
        if let Some(specialty) = request.specialty {
            update_data.insert("specialty".to_string(), json!(specialty));
        }
        if let Some(registration) = request.council_registration {
            update_data.insert("council_registration".to_string(), json!(registration));
        }

        if update_data.is_empty() {
            return Err(anyhow!("No fields to update"));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/user_profiles?user_id=eq.{}", user_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Profile not found"));
        }

        let profile: UserProfile = serde_json::from_value(result[0].clone())?;
        Ok(profile)
    }

    // ==============================================================================
    // PRIVACY SETTINGS
    // ==============================================================================

    pub async fn get_privacy_settings(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<PrivacySettings> {
        let path = format!("/rest/v1/privacy_settings?user_id=eq.{}", user_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Privacy settings not found"));
        }

        let settings: PrivacySettings = serde_json::from_value(result[0].clone())?;
        Ok(settings)
    }

    pub async fn update_privacy_settings(
        &self,
        user_id: &str,
        request: UpdatePrivacyRequest,
        auth_token: &str,
    ) -> Result<PrivacySettings> {
        debug!("Updating privacy settings for user {}", user_id);

        let mut update_data = serde_json::Map::new();
        if let Some(marketing) = request.marketing_opt_in {
            update_data.insert("marketing_opt_in".to_string(), json!(marketing));
        }
        if let Some(share) = request.share_data_with_partners {
            update_data.insert("share_data_with_partners".to_string(), json!(share));
        }
        if let Some(channels) = request.notification_channels {
            update_data.insert("notification_channels".to_string(), json!(channels));
        }

        if update_data.is_empty() {
            return Err(anyhow!("No fields to update"));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/privacy_settings?user_id=eq.{}", user_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Privacy settings not found"));
        }

        let settings: PrivacySettings = serde_json::from_value(result[0].clone())?;
        Ok(settings)
    }

    // ==============================================================================
    // CLINIC SETTINGS
    // ==============================================================================

    pub async fn get_clinic_settings(&self, auth_token: &str) -> Result<ClinicSettings> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            "/rest/v1/clinic_settings?limit=1",
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Clinic settings not found"));
        }

        let settings: ClinicSettings = serde_json::from_value(result[0].clone())?;
        Ok(settings)
    }

    pub async fn update_clinic_settings(
        &self,
        request: UpdateClinicSettingsRequest,
        auth_token: &str,
    ) -> Result<ClinicSettings> {
        debug!("Updating clinic settings");

        let current = self.get_clinic_settings(auth_token).await?;

        let mut update_data = serde_json::Map::new();
        if let Some(clinic_name) = request.clinic_name {
            update_data.insert("clinic_name".to_string(), json!(clinic_name));
        }
        if let Some(opening_time) = request.opening_time {
            update_data.insert(
                "opening_time".to_string(),
                json!(opening_time.format("%H:%M:%S").to_string()),
            );
        }
        if let Some(closing_time) = request.closing_time {
            update_data.insert(
                "closing_time".to_string(),
                json!(closing_time.format("%H:%M:%S").to_string()),
            );
        }
        if let Some(working_days) = request.working_days {
            update_data.insert("working_days".to_string(), json!(working_days));
        }
        if let Some(step) = request.slot_step_minutes {
            update_data.insert("slot_step_minutes".to_string(), json!(step));
        }
        if let Some(duration) = request.default_duration_minutes {
            update_data.insert("default_duration_minutes".to_string(), json!(duration));
        }
        if let Some(limit) = request.daily_patient_limit {
            update_data.insert("daily_patient_limit".to_string(), json!(limit));
        }
        if let Some(hours) = request.cancellation_window_hours {
            update_data.insert("cancellation_window_hours".to_string(), json!(hours));
        }

        if update_data.is_empty() {
            return Err(anyhow!("No fields to update"));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/clinic_settings?id=eq.{}", current.id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to update clinic settings"));
        }

        let settings: ClinicSettings = serde_json::from_value(result[0].clone())?;
        Ok(settings)
    }
}
