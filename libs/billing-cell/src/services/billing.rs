use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::pagination::{PageQuery, Paginated};

use crate::models::{
    CreateInvoiceRequest, Invoice, InvoiceListQuery, InvoiceStatus, Payment,
    RecordPaymentRequest,
};

pub struct BillingService {
    supabase: SupabaseClient,
}

impl BillingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_invoice(
        &self,
        request: CreateInvoiceRequest,
        auth_token: &str,
    ) -> Result<Invoice> {
        debug!("Creating invoice for patient {}", request.patient_id);

        let invoice_data = json!({
            "patient_id": request.patient_id,
            "partner_id": request.partner_id,
            "items": request.items,
            "amount_cents": request.total_cents(),
            "due_date": request.due_date.format("%Y-%m-%d").to_string(),
            "status": InvoiceStatus::Issued,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/invoices",
            Some(auth_token),
            Some(invoice_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create invoice"));
        }

        let invoice: Invoice = serde_json::from_value(result[0].clone())?;
        Ok(invoice)
    }

    pub async fn get_invoice(&self, invoice_id: &str, auth_token: &str) -> Result<Invoice> {
        let path = format!("/rest/v1/invoices?id=eq.{}", invoice_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Invoice not found"));
        }

        let invoice: Invoice = serde_json::from_value(result[0].clone())?;
        Ok(invoice)
    }

    pub async fn list_invoices(
        &self,
        query: &InvoiceListQuery,
        auth_token: &str,
    ) -> Result<Paginated<Invoice>> {
        let page_query = PageQuery { page: query.page, limit: query.limit };

        let mut query_parts = Vec::new();
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from_date) = query.from_date {
            query_parts.push(format!("due_date=gte.{}", from_date));
        }
        if let Some(to_date) = query.to_date {
            query_parts.push(format!("due_date=lte.{}", to_date));
        }
        query_parts.push("order=due_date.asc".to_string());
        query_parts.push(page_query.to_range_params());

        let path = format!("/rest/v1/invoices?{}", query_parts.join("&"));
        let counted = self.supabase.get_with_count(&path, Some(auth_token)).await?;

        let invoices: Vec<Invoice> = counted.rows.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Invoice>, _>>()?;

        Ok(Paginated::new(invoices, counted.total, &page_query))
    }

    /// Record a payment against an invoice; the invoice flips to paid once
    /// payments cover its amount.
    pub async fn record_payment(
        &self,
        invoice_id: Uuid,
        request: RecordPaymentRequest,
        auth_token: &str,
    ) -> Result<(Payment, Invoice)> {
        let invoice = self.get_invoice(&invoice_id.to_string(), auth_token).await?;

        if matches!(invoice.status, InvoiceStatus::Paid | InvoiceStatus::Void) {
            return Err(anyhow!("Invoice in status {} cannot take payments", invoice.status));
        }

        let payment_data = json!({
            "invoice_id": invoice_id,
            "amount_cents": request.amount_cents,
            "method": request.method,
            "paid_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/payments",
            Some(auth_token),
            Some(payment_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to record payment"));
        }
        let payment: Payment = serde_json::from_value(result[0].clone())?;

        // Sum everything paid so far
        let payments_path = format!("/rest/v1/payments?invoice_id=eq.{}", invoice_id);
        let payments: Vec<Value> = self.supabase.request(
            Method::GET,
            &payments_path,
            Some(auth_token),
            None,
        ).await?;
        let paid_cents: i64 = payments.iter()
            .filter_map(|p| p["amount_cents"].as_i64())
            .sum();

        let invoice = if paid_cents >= invoice.amount_cents {
            info!("Invoice {} fully paid ({} cents)", invoice_id, paid_cents);
            self.set_invoice_status(invoice_id, InvoiceStatus::Paid, auth_token).await?
        } else {
            invoice
        };

        Ok((payment, invoice))
    }

    pub async fn list_payments(&self, invoice_id: Uuid, auth_token: &str) -> Result<Vec<Payment>> {
        let path = format!(
            "/rest/v1/payments?invoice_id=eq.{}&order=paid_at.asc",
            invoice_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let payments: Vec<Payment> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Payment>, _>>()?;

        Ok(payments)
    }

    /// Issued invoices past their due date. Flips each to overdue.
    pub async fn sweep_overdue(&self, auth_token: &str) -> Result<Vec<Invoice>> {
        let today = Utc::now().date_naive();
        let path = format!(
            "/rest/v1/invoices?status=eq.issued&due_date=lt.{}&order=due_date.asc",
            today
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let overdue: Vec<Invoice> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Invoice>, _>>()?;

        let mut flipped = Vec::with_capacity(overdue.len());
        for invoice in overdue {
            let updated = self
                .set_invoice_status(invoice.id, InvoiceStatus::Overdue, auth_token)
                .await?;
            flipped.push(updated);
        }

        Ok(flipped)
    }

    pub async fn void_invoice(&self, invoice_id: Uuid, auth_token: &str) -> Result<Invoice> {
        let invoice = self.get_invoice(&invoice_id.to_string(), auth_token).await?;
        if invoice.status == InvoiceStatus::Paid {
            return Err(anyhow!("A paid invoice cannot be voided"));
        }
        self.set_invoice_status(invoice_id, InvoiceStatus::Void, auth_token).await
    }

    async fn set_invoice_status(
        &self,
        invoice_id: Uuid,
        status: InvoiceStatus,
        auth_token: &str,
    ) -> Result<Invoice> {
        let path = format!("/rest/v1/invoices?id=eq.{}", invoice_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({
                "status": status,
                "updated_at": Utc::now().to_rfc3339()
            })),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Invoice not found"));
        }

        let invoice: Invoice = serde_json::from_value(result[0].clone())?;
        Ok(invoice)
    }
}
