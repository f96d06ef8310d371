use anyhow::{Result, anyhow};
use reqwest::{Client, header};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ChatRequest, ChatResponse};

const SYSTEM_PROMPT: &str = "You are a clinical assistant for a physiotherapy \
clinic. Answer questions about treatment planning, exercise selection and \
clinic operations. You support, never replace, the physiotherapist's \
judgement; recommend an in-person assessment for anything diagnostic.";

pub struct AssistantService {
    api_base_url: String,
    api_key: String,
    supabase: SupabaseClient,
    http_client: Client,
}

impl AssistantService {
    pub fn new(config: &AppConfig) -> Result<Self> {
        if !config.is_assistant_configured() {
            return Err(anyhow!("Assistant provider is not configured"));
        }

        Ok(Self {
            api_base_url: config.assistant_api_base_url.clone(),
            api_key: config.assistant_api_key.clone(),
            supabase: SupabaseClient::new(config),
            http_client: Client::new(),
        })
    }

    pub async fn chat(
        &self,
        user_id: &str,
        request: &ChatRequest,
        auth_token: &str,
    ) -> Result<ChatResponse> {
        debug!("Assistant chat for user {} ({} messages)", user_id, request.messages.len());

        let mut system_prompt = SYSTEM_PROMPT.to_string();
        if let Some(patient_id) = request.patient_id {
            let patient_data = self.get_patient_context(&patient_id.to_string(), auth_token).await?;
            system_prompt.push_str(&format!("\n\nPatient context: {}", patient_data));
        }

        let mut messages = vec![json!({ "role": "system", "content": system_prompt })];
        for message in &request.messages {
            messages.push(json!({ "role": message.role, "content": message.content }));
        }

        let prompt = json!({
            "model": "gpt-4o",
            "messages": messages,
            "temperature": 0.5
        });

        let response = self.http_client
            .post(format!("{}/chat/completions", self.api_base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&prompt)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Assistant API error: {}", error_text));
        }

        let ai_response: Value = response.json().await?;
        let reply = ai_response["choices"][0]["message"]["content"].as_str()
            .ok_or_else(|| anyhow!("Invalid assistant response format"))?
            .to_string();

        // Persist the exchange for the user's history
        let chat_data = json!({
            "user_id": user_id,
            "patient_id": request.patient_id,
            "messages": request.messages,
            "reply": reply,
            "created_at": chrono::Utc::now().to_rfc3339()
        });

        let _: Vec<Value> = self.supabase.request(
            reqwest::Method::POST,
            "/rest/v1/assistant_chats",
            Some(auth_token),
            Some(chat_data),
        ).await?;

        Ok(ChatResponse { reply })
    }

    async fn get_patient_context(&self, patient_id: &str, auth_token: &str) -> Result<Value> {
        let patient_path = format!("/rest/v1/patients?id=eq.{}", patient_id);

        let patient_result: Vec<Value> = self.supabase.request(
            reqwest::Method::GET,
            &patient_path,
            Some(auth_token),
            None,
        ).await?;

        if patient_result.is_empty() {
            return Err(anyhow!("Patient not found"));
        }

        let mut context = patient_result[0].clone();

        // Attach active prescriptions so the assistant sees the current plan
        let prescriptions_path = format!(
            "/rest/v1/exercise_prescriptions?patient_id=eq.{}&status=eq.active",
            patient_id
        );
        let prescriptions: Vec<Value> = self.supabase.request(
            reqwest::Method::GET,
            &prescriptions_path,
            Some(auth_token),
            None,
        ).await?;

        if let Some(obj) = context.as_object_mut() {
            obj.insert("active_prescriptions".to_string(), json!(prescriptions));
            // The assistant has no business seeing identity documents
            obj.remove("document_number");
        }

        Ok(context)
    }
}
