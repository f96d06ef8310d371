use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{PatientDocument, UploadDocumentRequest};

pub struct DocumentService {
    supabase: SupabaseClient,
    bucket: String,
}

impl DocumentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            bucket: config.documents_bucket.clone(),
        }
    }

    pub async fn upload_document(
        &self,
        patient_id: &str,
        request: UploadDocumentRequest,
        auth_token: &str,
    ) -> Result<PatientDocument> {
        debug!("Uploading document for patient: {}", patient_id);

        if request.title.trim().is_empty() {
            return Err(anyhow!("Document title cannot be empty"));
        }

        // Strip an optional data-URL prefix before decoding
        let base64_data = if request.file.contains(";base64,") {
            request.file.split(";base64,").nth(1).unwrap_or(&request.file)
        } else {
            request.file.as_str()
        };

        let file_data = BASE64
            .decode(base64_data)
            .map_err(|e| anyhow!("Failed to decode base64 data: {}", e))?;

        let file_id = Uuid::new_v4();
        let file_ext = if request.file_type.contains('/') {
            request.file_type.split('/').next_back().unwrap_or("bin")
        } else {
            request.file_type.as_str()
        };
        let object_path = format!("{}/{}.{}", patient_id, file_id, file_ext);

        let storage_path = self.supabase.upload_object(
            &self.bucket,
            &object_path,
            &request.file_type,
            file_data,
            auth_token,
        ).await?;

        let file_url = self.supabase.get_public_url(&storage_path);
        debug!("Document stored at {}", file_url);

        let doc_data = json!({
            "patient_id": patient_id,
            "title": request.title,
            "file_url": file_url,
            "file_type": request.file_type,
            "uploaded_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let doc_result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patient_documents",
            Some(auth_token),
            Some(doc_data),
            Some(headers),
        ).await?;

        if doc_result.is_empty() {
            return Err(anyhow!("Failed to create document record"));
        }

        let document: PatientDocument = serde_json::from_value(doc_result[0].clone())?;
        Ok(document)
    }

    pub async fn list_documents(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<PatientDocument>> {
        debug!("Listing documents for patient: {}", patient_id);

        let path = format!(
            "/rest/v1/patient_documents?patient_id=eq.{}&order=uploaded_at.desc",
            patient_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let documents: Vec<PatientDocument> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<PatientDocument>, _>>()?;

        Ok(documents)
    }
}
