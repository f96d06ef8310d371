use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    commission_cents, CommissionQuery, CommissionSummary, CreatePartnerRequest, Partner,
    UpdatePartnerRequest,
};

pub struct PartnershipService {
    supabase: SupabaseClient,
}

impl PartnershipService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_partner(
        &self,
        request: CreatePartnerRequest,
        auth_token: &str,
    ) -> Result<Partner> {
        debug!("Creating partner: {}", request.company_name);

        let partner_data = json!({
            "company_name": request.company_name,
            "contact_name": request.contact_name,
            "email": request.email,
            "phone": request.phone,
            "commission_percent": request.commission_percent,
            "active": true,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/partners",
            Some(auth_token),
            Some(partner_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create partner"));
        }

        let partner: Partner = serde_json::from_value(result[0].clone())?;
        Ok(partner)
    }

    pub async fn get_partner(&self, partner_id: &str, auth_token: &str) -> Result<Partner> {
        let path = format!("/rest/v1/partners?id=eq.{}", partner_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Partner not found"));
        }

        let partner: Partner = serde_json::from_value(result[0].clone())?;
        Ok(partner)
    }

    pub async fn list_partners(&self, auth_token: &str) -> Result<Vec<Partner>> {
        let path = "/rest/v1/partners?order=company_name.asc";
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await?;

        let partners: Vec<Partner> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Partner>, _>>()?;

        Ok(partners)
    }

    pub async fn update_partner(
        &self,
        partner_id: &str,
        request: UpdatePartnerRequest,
        auth_token: &str,
    ) -> Result<Partner> {
        debug!("Updating partner: {}", partner_id);

        let mut update_data = serde_json::Map::new();
        if let Some(company_name) = request.company_name {
            update_data.insert("company_name".to_string(), json!(company_name));
        }
        if let Some(contact_name) = request.contact_name {
            update_data.insert("contact_name".to_string(), json!(contact_name));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(commission_percent) = request.commission_percent {
            if !(0.0..=100.0).contains(&commission_percent) {
                return Err(anyhow!("Commission percent must be between 0 and 100"));
            }
            update_data.insert("commission_percent".to_string(), json!(commission_percent));
        }
        if let Some(active) = request.active {
            update_data.insert("active".to_string(), json!(active));
        }

        if update_data.is_empty() {
            return Err(anyhow!("No fields to update"));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/partners?id=eq.{}", partner_id);
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
            return Err(anyhow!("Failed to update partner"));
        }

        let partner: Partner = serde_json::from_value(result[0].clone())?;
        Ok(partner)
    }

    /// Commission owed for a period: paid invoices carrying the partner's
    /// referral, weighted by their commission percentage.
    pub async fn commission_summary(
        &self,
        partner_id: Uuid,
        query: &CommissionQuery,
        auth_token: &str,
    ) -> Result<CommissionSummary> {
        debug!("Computing commission for partner {} between {} and {}",
               partner_id, query.from_date, query.to_date);

        if query.from_date > query.to_date {
            return Err(anyhow!("from_date must not be after to_date"));
        }

        let partner = self.get_partner(&partner_id.to_string(), auth_token).await?;

        let path = format!(
            "/rest/v1/invoices?partner_id=eq.{}&status=eq.paid&due_date=gte.{}&due_date=lte.{}",
            partner_id, query.from_date, query.to_date
        );
        let invoices: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let gross_cents: i64 = invoices.iter()
            .filter_map(|invoice| invoice["amount_cents"].as_i64())
            .sum();

        Ok(CommissionSummary {
            partner_id,
            from_date: query.from_date,
            to_date: query.to_date,
            invoices_count: invoices.len() as i64,
            gross_cents,
            commission_cents: commission_cents(gross_cents, partner.commission_percent),
        })
    }
}
