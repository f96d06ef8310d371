use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

/// Money is carried as integer cents end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub partner_id: Option<Uuid>,
    pub items: Vec<InvoiceItem>,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

impl InvoiceItem {
    pub fn total_cents(&self) -> i64 {
        self.quantity as i64 * self.unit_price_cents
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Overdue,
    Void,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Draft => write!(f, "draft"),
            InvoiceStatus::Issued => write!(f, "issued"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Overdue => write!(f, "overdue"),
            InvoiceStatus::Void => write!(f, "void"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Pix,
    Insurance,
    PartnerVoucher,
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvoiceRequest {
    pub patient_id: Uuid,
    pub partner_id: Option<Uuid>,
    pub items: Vec<InvoiceItem>,
    pub due_date: NaiveDate,
}

impl CreateInvoiceRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.patient_id.is_nil() {
            return Err("patient_id is required".to_string());
        }
        if self.items.is_empty() {
            return Err("An invoice needs at least one line item".to_string());
        }
        for item in &self.items {
            if item.description.trim().is_empty() {
                return Err("Line item description is required".to_string());
            }
            if item.quantity <= 0 {
                return Err("Line item quantity must be positive".to_string());
            }
            if item.unit_price_cents < 0 {
                return Err("Line item price cannot be negative".to_string());
            }
        }
        Ok(())
    }

    pub fn total_cents(&self) -> i64 {
        self.items.iter().map(InvoiceItem::total_cents).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount_cents: i64,
    pub method: PaymentMethod,
}

impl RecordPaymentRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.amount_cents <= 0 {
            return Err("Payment amount must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct InvoiceListQuery {
    pub patient_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
