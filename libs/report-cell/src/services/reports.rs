use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AppointmentsReport, ExerciseCount, ExercisesReport, FinancialReport, MethodRevenue,
    MonthlyRevenue, PatientsReport, PhysiotherapistLoad, ReportQuery, StatusCount,
    WeekdayCount,
};

pub struct ReportService {
    supabase: SupabaseClient,
}

impl ReportService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn financial_report(
        &self,
        query: &ReportQuery,
        auth_token: &str,
    ) -> Result<FinancialReport> {
        debug!("Building financial report {} - {}", query.from_date, query.to_date);

        let payments = self.fetch(
            &format!(
                "/rest/v1/payments?paid_at=gte.{}&paid_at=lte.{}",
                query.from_date,
                end_of_day(query.to_date)
            ),
            auth_token,
        ).await?;

        let invoices = self.fetch(
            &format!(
                "/rest/v1/invoices?due_date=gte.{}&due_date=lte.{}",
                query.from_date, query.to_date
            ),
            auth_token,
        ).await?;

        Ok(compute_financial_report(query, &payments, &invoices))
    }

    pub async fn patients_report(
        &self,
        query: &ReportQuery,
        auth_token: &str,
    ) -> Result<PatientsReport> {
        debug!("Building patients report {} - {}", query.from_date, query.to_date);

        let patients = self.fetch("/rest/v1/patients?select=id,status,created_at", auth_token).await?;
        Ok(compute_patients_report(query, &patients))
    }

    pub async fn appointments_report(
        &self,
        query: &ReportQuery,
        auth_token: &str,
    ) -> Result<AppointmentsReport> {
        debug!("Building appointments report {} - {}", query.from_date, query.to_date);

        let appointments = self.fetch(
            &format!(
                "/rest/v1/appointments?start_time=gte.{}&start_time=lte.{}",
                query.from_date,
                end_of_day(query.to_date)
            ),
            auth_token,
        ).await?;

        Ok(compute_appointments_report(query, &appointments))
    }

    pub async fn exercises_report(
        &self,
        query: &ReportQuery,
        auth_token: &str,
    ) -> Result<ExercisesReport> {
        debug!("Building exercises report {} - {}", query.from_date, query.to_date);

        let prescriptions = self.fetch(
            &format!(
                "/rest/v1/exercise_prescriptions?created_at=gte.{}&created_at=lte.{}",
                query.from_date,
                end_of_day(query.to_date)
            ),
            auth_token,
        ).await?;

        Ok(compute_exercises_report(query, &prescriptions))
    }

    async fn fetch(&self, path: &str, auth_token: &str) -> Result<Vec<Value>> {
        self.supabase.request(Method::GET, path, Some(auth_token), None).await
    }
}

fn end_of_day(date: NaiveDate) -> String {
    date.and_hms_opt(23, 59, 59).unwrap().and_utc().to_rfc3339()
}

// ==============================================================================
// PURE AGGREGATIONS
// ==============================================================================

pub fn compute_financial_report(
    query: &ReportQuery,
    payments: &[Value],
    invoices: &[Value],
) -> FinancialReport {
    let revenue_cents: i64 = payments.iter()
        .filter_map(|p| p["amount_cents"].as_i64())
        .sum();

    let mut by_method: HashMap<String, i64> = HashMap::new();
    let mut by_month: HashMap<String, i64> = HashMap::new();
    for payment in payments {
        let amount = payment["amount_cents"].as_i64().unwrap_or(0);
        if let Some(method) = payment["method"].as_str() {
            *by_method.entry(method.to_string()).or_insert(0) += amount;
        }
        if let Some(paid_at) = payment["paid_at"].as_str()
            .and_then(|raw| raw.parse::<DateTime<Utc>>().ok())
        {
            let month = format!("{:04}-{:02}", paid_at.year(), paid_at.month());
            *by_month.entry(month).or_insert(0) += amount;
        }
    }

    let sum_where_status = |status: &str| -> i64 {
        invoices.iter()
            .filter(|invoice| invoice["status"].as_str() == Some(status))
            .filter_map(|invoice| invoice["amount_cents"].as_i64())
            .sum()
    };

    let mut payment_method_breakdown: Vec<MethodRevenue> = by_method.into_iter()
        .map(|(method, revenue_cents)| MethodRevenue { method, revenue_cents })
        .collect();
    payment_method_breakdown.sort_by(|a, b| b.revenue_cents.cmp(&a.revenue_cents));

    let mut monthly_series: Vec<MonthlyRevenue> = by_month.into_iter()
        .map(|(month, revenue_cents)| MonthlyRevenue { month, revenue_cents })
        .collect();
    monthly_series.sort_by(|a, b| a.month.cmp(&b.month));

    FinancialReport {
        from_date: query.from_date,
        to_date: query.to_date,
        revenue_cents,
        outstanding_cents: sum_where_status("issued"),
        overdue_cents: sum_where_status("overdue"),
        payment_method_breakdown,
        monthly_series,
    }
}

pub fn compute_patients_report(query: &ReportQuery, patients: &[Value]) -> PatientsReport {
    let mut by_status: HashMap<String, i64> = HashMap::new();
    let mut new_in_period = 0i64;

    for patient in patients {
        if let Some(status) = patient["status"].as_str() {
            *by_status.entry(status.to_string()).or_insert(0) += 1;
        }
        if let Some(created_at) = patient["created_at"].as_str()
            .and_then(|raw| raw.parse::<DateTime<Utc>>().ok())
        {
            let date = created_at.date_naive();
            if date >= query.from_date && date <= query.to_date {
                new_in_period += 1;
            }
        }
    }

    PatientsReport {
        from_date: query.from_date,
        to_date: query.to_date,
        total_patients: patients.len() as i64,
        new_in_period,
        status_breakdown: sorted_status_counts(by_status),
    }
}

pub fn compute_appointments_report(query: &ReportQuery, appointments: &[Value]) -> AppointmentsReport {
    let mut by_status: HashMap<String, i64> = HashMap::new();
    let mut by_weekday: HashMap<Weekday, i64> = HashMap::new();
    let mut by_physio: HashMap<Uuid, (i64, i64)> = HashMap::new();
    let mut completed = 0i64;
    let mut no_shows = 0i64;

    for appointment in appointments {
        let status = appointment["status"].as_str().unwrap_or("unknown");
        *by_status.entry(status.to_string()).or_insert(0) += 1;
        match status {
            "completed" => completed += 1,
            "no_show" => no_shows += 1,
            _ => {}
        }

        if let Some(start_time) = appointment["start_time"].as_str()
            .and_then(|raw| raw.parse::<DateTime<Utc>>().ok())
        {
            *by_weekday.entry(start_time.weekday()).or_insert(0) += 1;
        }

        if let Some(physio_id) = appointment["physiotherapist_id"].as_str()
            .and_then(|raw| Uuid::parse_str(raw).ok())
        {
            let duration = appointment["duration_minutes"].as_i64().unwrap_or(0);
            let entry = by_physio.entry(physio_id).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += duration;
        }
    }

    let attended_or_missed = completed + no_shows;
    let no_show_rate = if attended_or_missed == 0 {
        0.0
    } else {
        no_shows as f64 / attended_or_missed as f64
    };

    let mut busiest_weekdays: Vec<WeekdayCount> = by_weekday.into_iter()
        .map(|(weekday, count)| WeekdayCount { weekday: weekday.to_string(), count })
        .collect();
    busiest_weekdays.sort_by(|a, b| b.count.cmp(&a.count));

    let mut physiotherapist_load: Vec<PhysiotherapistLoad> = by_physio.into_iter()
        .map(|(physiotherapist_id, (appointments, booked_minutes))| PhysiotherapistLoad {
            physiotherapist_id,
            appointments,
            booked_minutes,
        })
        .collect();
    physiotherapist_load.sort_by(|a, b| b.booked_minutes.cmp(&a.booked_minutes));

    AppointmentsReport {
        from_date: query.from_date,
        to_date: query.to_date,
        total_appointments: appointments.len() as i64,
        status_breakdown: sorted_status_counts(by_status),
        no_show_rate,
        busiest_weekdays,
        physiotherapist_load,
    }
}

pub fn compute_exercises_report(query: &ReportQuery, prescriptions: &[Value]) -> ExercisesReport {
    let mut active = 0i64;
    let mut completed = 0i64;
    let mut by_exercise: HashMap<Uuid, i64> = HashMap::new();

    for prescription in prescriptions {
        match prescription["status"].as_str() {
            Some("active") => active += 1,
            Some("completed") => completed += 1,
            _ => {}
        }

        if let Some(items) = prescription["items"].as_array() {
            for item in items {
                if let Some(exercise_id) = item["exercise_id"].as_str()
                    .and_then(|raw| Uuid::parse_str(raw).ok())
                {
                    *by_exercise.entry(exercise_id).or_insert(0) += 1;
                }
            }
        }
    }

    let total = prescriptions.len() as i64;
    let completion_rate = if total == 0 { 0.0 } else { completed as f64 / total as f64 };

    let mut most_prescribed: Vec<ExerciseCount> = by_exercise.into_iter()
        .map(|(exercise_id, times_prescribed)| ExerciseCount { exercise_id, times_prescribed })
        .collect();
    most_prescribed.sort_by(|a, b| b.times_prescribed.cmp(&a.times_prescribed));
    most_prescribed.truncate(10);

    ExercisesReport {
        from_date: query.from_date,
        to_date: query.to_date,
        total_prescriptions: total,
        active_prescriptions: active,
        completed_prescriptions: completed,
        completion_rate,
        most_prescribed,
    }
}

fn sorted_status_counts(by_status: HashMap<String, i64>) -> Vec<StatusCount> {
    let mut counts: Vec<StatusCount> = by_status.into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query() -> ReportQuery {
        ReportQuery {
            from_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            to_date: NaiveDate::from_ymd_opt(2026, 8, 31).unwrap(),
        }
    }

    #[test]
    fn financial_report_splits_by_method_and_month() {
        let payments = vec![
            json!({ "amount_cents": 10_000, "method": "card", "paid_at": "2026-08-05T10:00:00Z" }),
            json!({ "amount_cents": 5_000, "method": "pix", "paid_at": "2026-08-20T10:00:00Z" }),
            json!({ "amount_cents": 2_500, "method": "card", "paid_at": "2026-08-21T10:00:00Z" }),
        ];
        let invoices = vec![
            json!({ "status": "issued", "amount_cents": 7_000 }),
            json!({ "status": "overdue", "amount_cents": 3_000 }),
            json!({ "status": "paid", "amount_cents": 17_500 }),
        ];

        let report = compute_financial_report(&query(), &payments, &invoices);

        assert_eq!(report.revenue_cents, 17_500);
        assert_eq!(report.outstanding_cents, 7_000);
        assert_eq!(report.overdue_cents, 3_000);
        assert_eq!(report.payment_method_breakdown[0].method, "card");
        assert_eq!(report.payment_method_breakdown[0].revenue_cents, 12_500);
        assert_eq!(report.monthly_series.len(), 1);
        assert_eq!(report.monthly_series[0].month, "2026-08");
    }

    #[test]
    fn patients_report_counts_new_and_by_status() {
        let patients = vec![
            json!({ "status": "active", "created_at": "2026-08-10T00:00:00Z" }),
            json!({ "status": "active", "created_at": "2025-01-01T00:00:00Z" }),
            json!({ "status": "discharged", "created_at": "2026-08-15T00:00:00Z" }),
        ];

        let report = compute_patients_report(&query(), &patients);

        assert_eq!(report.total_patients, 3);
        assert_eq!(report.new_in_period, 2);
        assert_eq!(report.status_breakdown[0].status, "active");
        assert_eq!(report.status_breakdown[0].count, 2);
    }

    #[test]
    fn no_show_rate_ignores_future_bookings() {
        let appointments = vec![
            json!({ "status": "completed", "start_time": "2026-08-03T10:00:00Z",
                    "physiotherapist_id": Uuid::new_v4(), "duration_minutes": 45 }),
            json!({ "status": "completed", "start_time": "2026-08-04T10:00:00Z",
                    "physiotherapist_id": Uuid::new_v4(), "duration_minutes": 45 }),
            json!({ "status": "no_show", "start_time": "2026-08-05T10:00:00Z",
                    "physiotherapist_id": Uuid::new_v4(), "duration_minutes": 45 }),
            json!({ "status": "scheduled", "start_time": "2026-08-28T10:00:00Z",
                    "physiotherapist_id": Uuid::new_v4(), "duration_minutes": 45 }),
        ];

        let report = compute_appointments_report(&query(), &appointments);

        assert_eq!(report.total_appointments, 4);
        assert!((report.no_show_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn physiotherapist_load_sums_booked_minutes() {
        let physio = Uuid::new_v4();
        let appointments = vec![
            json!({ "status": "completed", "start_time": "2026-08-03T10:00:00Z",
                    "physiotherapist_id": physio, "duration_minutes": 45 }),
            json!({ "status": "completed", "start_time": "2026-08-04T10:00:00Z",
                    "physiotherapist_id": physio, "duration_minutes": 60 }),
        ];

        let report = compute_appointments_report(&query(), &appointments);

        assert_eq!(report.physiotherapist_load.len(), 1);
        assert_eq!(report.physiotherapist_load[0].appointments, 2);
        assert_eq!(report.physiotherapist_load[0].booked_minutes, 105);
    }

    #[test]
    fn exercises_report_ranks_most_prescribed() {
        let popular = Uuid::new_v4();
        let rare = Uuid::new_v4();
        let prescriptions = vec![
            json!({ "status": "active", "items": [
                { "exercise_id": popular }, { "exercise_id": rare }
            ]}),
            json!({ "status": "completed", "items": [{ "exercise_id": popular }] }),
            json!({ "status": "completed", "items": [{ "exercise_id": popular }] }),
            json!({ "status": "suspended", "items": [] }),
        ];

        let report = compute_exercises_report(&query(), &prescriptions);

        assert_eq!(report.total_prescriptions, 4);
        assert_eq!(report.active_prescriptions, 1);
        assert_eq!(report.completed_prescriptions, 2);
        assert!((report.completion_rate - 0.5).abs() < 1e-9);
        assert_eq!(report.most_prescribed[0].exercise_id, popular);
        assert_eq!(report.most_prescribed[0].times_prescribed, 3);
    }
}
