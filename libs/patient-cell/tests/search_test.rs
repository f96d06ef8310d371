// libs/patient-cell/tests/search_test.rs
//
// The filtered listing must forward the filters to PostgREST and return an
// envelope whose item count and total agree with the backing response.

use serde_json::json;
use uuid::Uuid;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers::{method, path, query_param_contains}};

use patient_cell::models::{PatientSearchQuery, PatientStatus};
use patient_cell::services::patient::PatientService;
use shared_utils::test_utils::TestConfig;

const TOKEN: &str = "test-token";

fn patient_row(first_name: &str, last_name: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "first_name": first_name,
        "last_name": last_name,
        "email": format!("{}.{}@example.com", first_name.to_lowercase(), last_name.to_lowercase()),
        "phone_number": null,
        "date_of_birth": "1985-04-12",
        "gender": null,
        "document_number": null,
        "address": null,
        "emergency_contact_name": null,
        "emergency_contact_phone": null,
        "clinical_observations": null,
        "status": "active",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn filtered_search_renders_exactly_the_returned_rows() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();

    let rows = vec![
        patient_row("Maria", "Silva"),
        patient_row("Carlos", "Silva"),
    ];

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param_contains("status", "eq.active"))
        .and(query_param_contains("limit", "20"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&rows)
                .insert_header("Content-Range", "0-1/2"),
        )
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config);
    let query = PatientSearchQuery {
        search: Some("Silva".to_string()),
        status: Some(PatientStatus::Active),
        page: Some(1),
        limit: Some(20),
    };

    let page = service.search_patients(&query, TOKEN).await.unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 2);
    assert_eq!(page.page, 1);
    assert_eq!(page.limit, 20);
    assert!(page.items.iter().all(|p| p.last_name == "Silva"));
}

#[tokio::test]
async fn total_comes_from_the_count_header_not_the_page() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![patient_row("Maria", "Silva")])
                .insert_header("Content-Range", "0-0/57"),
        )
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config);
    let query = PatientSearchQuery {
        search: None,
        status: None,
        page: Some(1),
        limit: Some(1),
    };

    let page = service.search_patients(&query, TOKEN).await.unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total, 57);
    assert_eq!(page.total_pages, 57);
}
