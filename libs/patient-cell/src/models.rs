use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: Option<String>,
    pub document_number: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub clinical_observations: Option<String>,
    pub status: PatientStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    Active,
    Inactive,
    Discharged,
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatientStatus::Active => write!(f, "active"),
            PatientStatus::Inactive => write!(f, "inactive"),
            PatientStatus::Discharged => write!(f, "discharged"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: Option<String>,
    pub document_number: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub clinical_observations: Option<String>,
}

impl CreatePatientRequest {
    /// Field-level checks; nothing is sent to the store when these fail.
    pub fn validate(&self) -> Result<(), String> {
        if self.first_name.trim().is_empty() {
            return Err("First name is required".to_string());
        }
        if self.last_name.trim().is_empty() {
            return Err("Last name is required".to_string());
        }
        if self.email.trim().is_empty() {
            return Err("Email is required".to_string());
        }
        if !self.email.contains('@') {
            return Err("Email is not valid".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub clinical_observations: Option<String>,
    pub status: Option<PatientStatus>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PatientSearchQuery {
    pub search: Option<String>,
    pub status: Option<PatientStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// ==============================================================================
// CLINICAL DOCUMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDocument {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub file_url: String,
    pub file_type: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadDocumentRequest {
    pub title: String,
    /// Base64 payload, optionally carrying a data-URL prefix.
    pub file: String,
    pub file_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreatePatientRequest {
        CreatePatientRequest {
            first_name: "Maria".to_string(),
            last_name: "Silva".to_string(),
            email: "maria.silva@example.com".to_string(),
            phone_number: None,
            date_of_birth: NaiveDate::from_ymd_opt(1985, 4, 12).unwrap(),
            gender: None,
            document_number: None,
            address: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            clinical_observations: None,
        }
    }

    #[test]
    fn complete_request_validates() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn required_fields_block_validation() {
        let mut missing_name = request();
        missing_name.first_name = "  ".to_string();
        assert!(missing_name.validate().is_err());

        let mut missing_email = request();
        missing_email.email = String::new();
        assert!(missing_email.validate().is_err());

        let mut bad_email = request();
        bad_email.email = "not-an-email".to_string();
        assert!(bad_email.validate().is_err());
    }
}
