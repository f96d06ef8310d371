use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    pub id: Uuid,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    /// Share of referred-session revenue owed to the partner, 0-100.
    pub commission_percent: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePartnerRequest {
    pub company_name: String,
    pub contact_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub commission_percent: f64,
}

impl CreatePartnerRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.company_name.trim().is_empty() {
            return Err("Company name is required".to_string());
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err("A valid email is required".to_string());
        }
        if !(0.0..=100.0).contains(&self.commission_percent) {
            return Err("Commission percent must be between 0 and 100".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePartnerRequest {
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub commission_percent: Option<f64>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommissionQuery {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

/// Commission owed to a partner over a period, computed from the paid
/// invoices that carry their referral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionSummary {
    pub partner_id: Uuid,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub invoices_count: i64,
    pub gross_cents: i64,
    pub commission_cents: i64,
}

pub fn commission_cents(gross_cents: i64, commission_percent: f64) -> i64 {
    // Round down: the clinic keeps the fraction of a cent
    ((gross_cents as f64) * commission_percent / 100.0).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commission_rounds_down() {
        assert_eq!(commission_cents(10_000, 15.0), 1_500);
        assert_eq!(commission_cents(9_999, 15.0), 1_499);
        assert_eq!(commission_cents(0, 15.0), 0);
        assert_eq!(commission_cents(10_000, 0.0), 0);
    }

    #[test]
    fn partner_request_bounds() {
        let mut request = CreatePartnerRequest {
            company_name: "Corrida Club".to_string(),
            contact_name: None,
            email: "contact@corridaclub.example".to_string(),
            phone: None,
            commission_percent: 12.5,
        };
        assert!(request.validate().is_ok());

        request.commission_percent = 120.0;
        assert!(request.validate().is_err());

        request.commission_percent = 12.5;
        request.email = "not-an-email".to_string();
        assert!(request.validate().is_err());
    }
}
