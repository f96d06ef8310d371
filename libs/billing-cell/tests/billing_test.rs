// libs/billing-cell/tests/billing_test.rs
use serde_json::json;
use uuid::Uuid;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers::{method, path}};

use billing_cell::models::{InvoiceStatus, PaymentMethod, RecordPaymentRequest};
use billing_cell::services::billing::BillingService;
use shared_utils::test_utils::TestConfig;

const TOKEN: &str = "test-token";

fn invoice_row(invoice_id: Uuid, amount_cents: i64, status: &str) -> serde_json::Value {
    json!({
        "id": invoice_id,
        "patient_id": Uuid::new_v4(),
        "partner_id": null,
        "items": [
            { "description": "Physiotherapy session", "quantity": 1, "unit_price_cents": amount_cents }
        ],
        "amount_cents": amount_cents,
        "due_date": "2026-10-01",
        "status": status,
        "created_at": "2026-08-01T00:00:00Z",
        "updated_at": "2026-08-01T00:00:00Z"
    })
}

fn payment_row(invoice_id: Uuid, amount_cents: i64) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "invoice_id": invoice_id,
        "amount_cents": amount_cents,
        "method": "card",
        "paid_at": "2026-08-07T12:00:00Z"
    })
}

#[tokio::test]
async fn covering_payment_marks_the_invoice_paid() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let invoice_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/invoices"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(vec![invoice_row(invoice_id, 12_000, "issued")]))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(201)
            .set_body_json(vec![payment_row(invoice_id, 12_000)]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(vec![payment_row(invoice_id, 12_000)]))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/invoices"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(vec![invoice_row(invoice_id, 12_000, "paid")]))
        .mount(&mock_server)
        .await;

    let service = BillingService::new(&config);
    let request = RecordPaymentRequest {
        amount_cents: 12_000,
        method: PaymentMethod::Card,
    };

    let (payment, invoice) = service.record_payment(invoice_id, request, TOKEN).await.unwrap();

    assert_eq!(payment.amount_cents, 12_000);
    assert_eq!(invoice.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn partial_payment_leaves_the_invoice_open() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let invoice_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/invoices"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(vec![invoice_row(invoice_id, 12_000, "issued")]))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(201)
            .set_body_json(vec![payment_row(invoice_id, 5_000)]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(vec![payment_row(invoice_id, 5_000)]))
        .mount(&mock_server)
        .await;

    let service = BillingService::new(&config);
    let request = RecordPaymentRequest {
        amount_cents: 5_000,
        method: PaymentMethod::Pix,
    };

    let (payment, invoice) = service.record_payment(invoice_id, request, TOKEN).await.unwrap();

    assert_eq!(payment.amount_cents, 5_000);
    assert_eq!(invoice.status, InvoiceStatus::Issued);
}

#[tokio::test]
async fn paid_invoice_rejects_further_payments() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let invoice_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/invoices"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(vec![invoice_row(invoice_id, 12_000, "paid")]))
        .mount(&mock_server)
        .await;

    let service = BillingService::new(&config);
    let request = RecordPaymentRequest {
        amount_cents: 1_000,
        method: PaymentMethod::Cash,
    };

    let result = service.record_payment(invoice_id, request, TOKEN).await;
    assert!(result.is_err());
}
