// libs/appointment-cell/tests/scheduling_test.rs
//
// Integration tests for conflict detection and slot computation against a
// mocked PostgREST backend.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers::{method, path}};

use appointment_cell::services::availability::AvailabilityService;
use appointment_cell::services::conflict::ConflictDetectionService;
use shared_database::supabase::SupabaseClient;
use shared_utils::test_utils::TestConfig;

const TOKEN: &str = "test-token";

struct TestSetup {
    supabase: Arc<SupabaseClient>,
    mock_server: MockServer,
    physiotherapist_id: Uuid,
}

impl TestSetup {
    async fn new() -> Self {
        let mock_server = MockServer::start().await;
        let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
        let supabase = Arc::new(SupabaseClient::new(&config));

        Self {
            supabase,
            mock_server,
            physiotherapist_id: Uuid::new_v4(),
        }
    }

    /// No clinic_settings row: scheduling defaults apply (08:00-19:00, Mon-Fri).
    async fn mount_default_settings(&self) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/clinic_settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
            .mount(&self.mock_server)
            .await;
    }

    async fn mount_appointments(&self, rows: Vec<serde_json::Value>) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&self.mock_server)
            .await;
    }

    fn appointment_row(
        &self,
        patient_id: Uuid,
        start_time: &str,
        duration_minutes: i32,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "physiotherapist_id": self.physiotherapist_id,
            "start_time": start_time,
            "duration_minutes": duration_minutes,
            "status": status,
            "appointment_type": "session",
            "room": "Room 1",
            "notes": null,
            "cancellation_reason": null,
            "recurrence_group_id": null,
            "created_at": "2026-08-01T00:00:00Z",
            "updated_at": "2026-08-01T00:00:00Z"
        })
    }
}

#[tokio::test]
async fn overlapping_booking_is_reported_with_alternatives() {
    let setup = TestSetup::new().await;
    setup.mount_default_settings().await;
    setup
        .mount_appointments(vec![setup.appointment_row(
            Uuid::new_v4(),
            "2026-09-07T10:00:00Z",
            60,
            "confirmed",
        )])
        .await;

    let service = ConflictDetectionService::new(Arc::clone(&setup.supabase));
    let response = service
        .check_conflicts(
            setup.physiotherapist_id,
            Utc.with_ymd_and_hms(2026, 9, 7, 10, 30, 0).unwrap(),
            45,
            None,
            TOKEN,
        )
        .await
        .unwrap();

    assert!(response.has_conflict);
    assert_eq!(response.conflicting_appointments.len(), 1);
    assert!(!response.suggested_alternatives.is_empty());
    // Every suggestion clears the booked interval
    let booked_end = Utc.with_ymd_and_hms(2026, 9, 7, 11, 0, 0).unwrap();
    let booked_start = Utc.with_ymd_and_hms(2026, 9, 7, 10, 0, 0).unwrap();
    for slot in &response.suggested_alternatives {
        assert!(slot.end_time <= booked_start || slot.start_time >= booked_end);
    }
}

#[tokio::test]
async fn back_to_back_booking_does_not_conflict() {
    let setup = TestSetup::new().await;
    setup.mount_default_settings().await;
    setup
        .mount_appointments(vec![setup.appointment_row(
            Uuid::new_v4(),
            "2026-09-07T10:00:00Z",
            60,
            "confirmed",
        )])
        .await;

    let service = ConflictDetectionService::new(Arc::clone(&setup.supabase));
    let response = service
        .check_conflicts(
            setup.physiotherapist_id,
            Utc.with_ymd_and_hms(2026, 9, 7, 11, 0, 0).unwrap(),
            45,
            None,
            TOKEN,
        )
        .await
        .unwrap();

    assert!(!response.has_conflict);
    assert!(response.conflicting_appointments.is_empty());
    assert!(response.suggested_alternatives.is_empty());
}

#[tokio::test]
async fn cancelled_booking_never_conflicts() {
    let setup = TestSetup::new().await;
    setup.mount_default_settings().await;
    setup
        .mount_appointments(vec![setup.appointment_row(
            Uuid::new_v4(),
            "2026-09-07T10:00:00Z",
            60,
            "cancelled",
        )])
        .await;

    let service = ConflictDetectionService::new(Arc::clone(&setup.supabase));
    let response = service
        .check_conflicts(
            setup.physiotherapist_id,
            Utc.with_ymd_and_hms(2026, 9, 7, 10, 0, 0).unwrap(),
            60,
            None,
            TOKEN,
        )
        .await
        .unwrap();

    assert!(!response.has_conflict);
}

#[tokio::test]
async fn daily_limit_counts_distinct_patients() {
    let setup = TestSetup::new().await;
    setup.mount_default_settings().await;

    let repeat_patient = Uuid::new_v4();
    setup
        .mount_appointments(vec![
            setup.appointment_row(repeat_patient, "2026-09-07T08:00:00Z", 45, "confirmed"),
            // Same patient twice counts once
            setup.appointment_row(repeat_patient, "2026-09-07T15:00:00Z", 45, "scheduled"),
            setup.appointment_row(Uuid::new_v4(), "2026-09-07T09:00:00Z", 45, "confirmed"),
            // Cancelled bookings do not count
            setup.appointment_row(Uuid::new_v4(), "2026-09-07T10:00:00Z", 45, "cancelled"),
        ])
        .await;

    let service = ConflictDetectionService::new(Arc::clone(&setup.supabase));
    let check = service
        .check_daily_patient_limit(
            setup.physiotherapist_id,
            NaiveDate::from_ymd_opt(2026, 9, 7).unwrap(),
            TOKEN,
        )
        .await
        .unwrap();

    assert_eq!(check.patients_seen, 2);
    assert!(check.within_limit);
}

#[tokio::test]
async fn slots_respect_existing_bookings_and_working_hours() {
    let setup = TestSetup::new().await;
    setup.mount_default_settings().await;
    setup
        .mount_appointments(vec![setup.appointment_row(
            Uuid::new_v4(),
            "2026-09-07T08:30:00Z",
            90,
            "confirmed",
        )])
        .await;

    let service = AvailabilityService::new(Arc::clone(&setup.supabase));
    let slots = service
        .get_available_slots(
            setup.physiotherapist_id,
            NaiveDate::from_ymd_opt(2026, 9, 7).unwrap(),
            Some(45),
            TOKEN,
        )
        .await
        .unwrap();

    assert!(!slots.is_empty());
    let booked_start = Utc.with_ymd_and_hms(2026, 9, 7, 8, 30, 0).unwrap();
    let booked_end = Utc.with_ymd_and_hms(2026, 9, 7, 10, 0, 0).unwrap();
    let open = Utc.with_ymd_and_hms(2026, 9, 7, 8, 0, 0).unwrap();
    let close = Utc.with_ymd_and_hms(2026, 9, 7, 19, 0, 0).unwrap();

    for slot in &slots {
        assert!(slot.start_time >= open && slot.end_time <= close);
        assert!(slot.end_time <= booked_start || slot.start_time >= booked_end);
    }
}

#[tokio::test]
async fn slots_on_a_closed_day_are_empty() {
    let setup = TestSetup::new().await;
    setup.mount_default_settings().await;
    setup.mount_appointments(vec![]).await;

    let service = AvailabilityService::new(Arc::clone(&setup.supabase));
    let slots = service
        .get_available_slots(
            setup.physiotherapist_id,
            // 2026-09-06 is a Sunday
            NaiveDate::from_ymd_opt(2026, 9, 6).unwrap(),
            None,
            TOKEN,
        )
        .await
        .unwrap();

    assert!(slots.is_empty());
}
