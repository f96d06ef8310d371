// libs/notification-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub read: bool,
    pub appointment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AppointmentBooked,
    AppointmentRescheduled,
    AppointmentCancelled,
    AppointmentReminder,
    InvoiceIssued,
    PaymentReceived,
    PrescriptionAssigned,
    System,
}

// ==============================================================================
// CHANGE FEED MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEventKind {
    Insert,
    Update,
    Delete,
}

/// A row-level change fanned out to subscribed clients. `user_id` routes
/// the event to one user's channel; `None` goes only to the global feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeEventKind,
    pub row: Value,
    pub user_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: &str, kind: ChangeEventKind, row: Value, user_id: Option<Uuid>) -> Self {
        Self {
            table: table.to_string(),
            kind,
            row,
            user_id,
            occurred_at: Utc::now(),
        }
    }

    /// The `id` field of the changed row, when present.
    pub fn row_id(&self) -> Option<Uuid> {
        self.row
            .get("id")
            .and_then(|id| id.as_str())
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Degraded,
    Disconnected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatusResponse {
    pub status: ConnectionStatus,
    pub active_channels: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotificationListQuery {
    pub unread_only: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
