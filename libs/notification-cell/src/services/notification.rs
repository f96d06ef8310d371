// libs/notification-cell/src/services/notification.rs
use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::pagination::{PageQuery, Paginated};

use crate::models::{Notification, NotificationKind, NotificationListQuery};

pub struct NotificationService {
    supabase: SupabaseClient,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
        query: &NotificationListQuery,
        auth_token: &str,
    ) -> Result<Paginated<Notification>> {
        debug!("Listing notifications for user {}", user_id);

        let page_query = PageQuery { page: query.page, limit: query.limit };
        let mut query_parts = vec![format!("user_id=eq.{}", user_id)];
        if query.unread_only.unwrap_or(false) {
            query_parts.push("read=eq.false".to_string());
        }
        query_parts.push("order=created_at.desc".to_string());
        query_parts.push(page_query.to_range_params());

        let path = format!("/rest/v1/notifications?{}", query_parts.join("&"));
        let counted = self.supabase.get_with_count(&path, Some(auth_token)).await?;

        let notifications: Vec<Notification> = counted.rows.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Notification>, _>>()?;

        Ok(Paginated::new(notifications, counted.total, &page_query))
    }

    pub async fn create_notification(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        body: Option<&str>,
        appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Notification> {
        let notification_data = json!({
            "user_id": user_id,
            "kind": kind,
            "title": title,
            "body": body,
            "read": false,
            "appointment_id": appointment_id,
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/notifications",
            Some(auth_token),
            Some(notification_data),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create notification"));
        }

        let notification: Notification = serde_json::from_value(result[0].clone())?;
        Ok(notification)
    }

    pub async fn mark_read(
        &self,
        notification_id: Uuid,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Notification> {
        debug!("Marking notification {} read", notification_id);

        let path = format!(
            "/rest/v1/notifications?id=eq.{}&user_id=eq.{}",
            notification_id, user_id
        );
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({ "read": true })),
            Some(headers),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Notification not found"));
        }

        let notification: Notification = serde_json::from_value(result[0].clone())?;
        Ok(notification)
    }

    pub async fn mark_all_read(&self, user_id: &str, auth_token: &str) -> Result<()> {
        debug!("Marking all notifications read for user {}", user_id);

        let path = format!("/rest/v1/notifications?user_id=eq.{}&read=eq.false", user_id);
        let _: Vec<Value> = self.supabase.request(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({ "read": true })),
        ).await?;

        Ok(())
    }
}
