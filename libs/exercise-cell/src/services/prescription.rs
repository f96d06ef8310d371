use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CreatePrescriptionRequest, ExercisePrescription, UpdatePrescriptionRequest,
};

pub struct PrescriptionService {
    supabase: SupabaseClient,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_prescription(
        &self,
        physiotherapist_id: Uuid,
        request: CreatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<ExercisePrescription> {
        debug!("Creating prescription for patient {}", request.patient_id);

        let prescription_data = json!({
            "patient_id": request.patient_id,
            "physiotherapist_id": physiotherapist_id,
            "items": request.items,
            "status": "active",
            "notes": request.notes,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/exercise_prescriptions",
            Some(auth_token),
            Some(prescription_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create prescription"));
        }

        let prescription: ExercisePrescription = serde_json::from_value(result[0].clone())?;
        Ok(prescription)
    }

    pub async fn get_prescription(
        &self,
        prescription_id: &str,
        auth_token: &str,
    ) -> Result<ExercisePrescription> {
        let path = format!("/rest/v1/exercise_prescriptions?id=eq.{}", prescription_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Prescription not found"));
        }

        let prescription: ExercisePrescription = serde_json::from_value(result[0].clone())?;
        Ok(prescription)
    }

    pub async fn list_patient_prescriptions(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<ExercisePrescription>> {
        debug!("Listing prescriptions for patient {}", patient_id);

        let path = format!(
            "/rest/v1/exercise_prescriptions?patient_id=eq.{}&order=created_at.desc",
            patient_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let prescriptions: Vec<ExercisePrescription> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<ExercisePrescription>, _>>()?;

        Ok(prescriptions)
    }

    pub async fn update_prescription(
        &self,
        prescription_id: &str,
        request: UpdatePrescriptionRequest,
        auth_token: &str,
    ) -> Result<ExercisePrescription> {
        debug!("Updating prescription {}", prescription_id);

        let mut update_data = serde_json::Map::new();
        if let Some(status) = request.status {
            update_data.insert("status".to_string(), json!(status));
        }
        if let Some(items) = request.items {
            if items.is_empty() {
                return Err(anyhow!("A prescription needs at least one exercise"));
            }
            update_data.insert("items".to_string(), json!(items));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }

        if update_data.is_empty() {
            return Err(anyhow!("No fields to update"));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/exercise_prescriptions?id=eq.{}", prescription_id);
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
            return Err(anyhow!("Failed to update prescription"));
        }

        let prescription: ExercisePrescription = serde_json::from_value(result[0].clone())?;
        Ok(prescription)
    }
}
