use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::pagination::{PageQuery, Paginated};

use crate::models::{Patient, CreatePatientRequest, UpdatePatientRequest, PatientSearchQuery};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient> {
        debug!("Creating new patient record for: {}", request.email);

        // Check if patient with email already exists
        let existing_check_path = format!(
            "/rest/v1/patients?email=eq.{}",
            urlencoding::encode(&request.email)
        );
        let existing: Vec<Value> = self.supabase.request(
            Method::GET,
            &existing_check_path,
            Some(auth_token),
            None,
        ).await?;

        if !existing.is_empty() {
            return Err(anyhow!("Patient with email {} already exists", request.email));
        }

        let patient_data = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "phone_number": request.phone_number,
            "date_of_birth": request.date_of_birth.format("%Y-%m-%d").to_string(),
            "gender": request.gender,
            "document_number": request.document_number,
            "address": request.address,
            "emergency_contact_name": request.emergency_contact_name,
            "emergency_contact_phone": request.emergency_contact_phone,
            "clinical_observations": request.clinical_observations,
            "status": "active",
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patients",
            Some(auth_token),
            Some(patient_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create patient record"));
        }

        let patient: Patient = serde_json::from_value(result[0].clone())?;
        debug!("Patient record created successfully with ID: {}", patient.id);

        Ok(patient)
    }

    pub async fn get_patient(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Patient> {
        debug!("Fetching patient record: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Patient not found"));
        }

        let patient: Patient = serde_json::from_value(result[0].clone())?;
        Ok(patient)
    }

    /// Filtered, paginated listing. `search` matches name and email.
    pub async fn search_patients(
        &self,
        query: &PatientSearchQuery,
        auth_token: &str,
    ) -> Result<Paginated<Patient>> {
        let page_query = PageQuery { page: query.page, limit: query.limit };
        let path = build_search_path(query, &page_query);
        debug!("Searching patients: {}", path);

        let counted = self.supabase.get_with_count(&path, Some(auth_token)).await?;

        let patients: Vec<Patient> = counted.rows.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Patient>, _>>()?;

        Ok(Paginated::new(patients, counted.total, &page_query))
    }

    pub async fn update_patient(
        &self,
        patient_id: &str,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient> {
        debug!("Updating patient record: {}", patient_id);

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(phone_number) = request.phone_number {
            update_data.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(gender) = request.gender {
            update_data.insert("gender".to_string(), json!(gender));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(name) = request.emergency_contact_name {
            update_data.insert("emergency_contact_name".to_string(), json!(name));
        }
        if let Some(phone) = request.emergency_contact_phone {
            update_data.insert("emergency_contact_phone".to_string(), json!(phone));
        }
        if let Some(observations) = request.clinical_observations {
            update_data.insert("clinical_observations".to_string(), json!(observations));
        }
        if let Some(status) = request.status {
            update_data.insert("status".to_string(), json!(status));
        }

        if update_data.is_empty() {
            return Err(anyhow!("No fields to update"));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
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
            return Err(anyhow!("Failed to update patient record"));
        }

        let patient: Patient = serde_json::from_value(result[0].clone())?;
        Ok(patient)
    }

    pub async fn delete_patient(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<()> {
        debug!("Deleting patient record: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let _: Vec<Value> = self.supabase.request(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(())
    }
}

fn build_search_path(query: &PatientSearchQuery, page_query: &PageQuery) -> String {
    let mut query_parts = Vec::new();

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = urlencoding::encode(search).into_owned();
        query_parts.push(format!(
            "or=(first_name.ilike.*{pattern}*,last_name.ilike.*{pattern}*,email.ilike.*{pattern}*)"
        ));
    }
    if let Some(status) = query.status {
        query_parts.push(format!("status=eq.{}", status));
    }

    query_parts.push("order=last_name.asc,first_name.asc".to_string());
    query_parts.push(page_query.to_range_params());

    format!("/rest/v1/patients?{}", query_parts.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientStatus;

    #[test]
    fn search_path_carries_filters_and_pagination() {
        let query = PatientSearchQuery {
            search: Some("Silva".to_string()),
            status: Some(PatientStatus::Active),
            page: Some(1),
            limit: Some(20),
        };
        let page_query = PageQuery { page: query.page, limit: query.limit };

        let path = build_search_path(&query, &page_query);
        assert!(path.starts_with("/rest/v1/patients?"));
        assert!(path.contains("first_name.ilike.*Silva*"));
        assert!(path.contains("status=eq.active"));
        assert!(path.contains("limit=20&offset=0"));
    }

    #[test]
    fn blank_search_is_dropped() {
        let query = PatientSearchQuery {
            search: Some("   ".to_string()),
            status: None,
            page: None,
            limit: None,
        };
        let page_query = PageQuery { page: None, limit: None };

        let path = build_search_path(&query, &page_query);
        assert!(!path.contains("ilike"));
        assert!(path.contains("limit=20&offset=0"));
    }
}
