// libs/notification-cell/src/services/hub.rs
use std::sync::Arc;
use std::collections::HashMap;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{ChangeEvent, ConnectionStatus};
use crate::services::mirror::NotificationMirror;

pub type ChannelSender = broadcast::Sender<String>;
pub type ChannelReceiver = broadcast::Receiver<String>;

const USER_CHANNEL_CAPACITY: usize = 100;
const GLOBAL_CHANNEL_CAPACITY: usize = 1000;

/// Fan-out point for row-level change events: one channel per signed-in
/// user plus a global channel for the appointments table. Notification
/// events are additionally folded into a per-user mirror that the feed
/// endpoint serves without a store round trip.
pub struct RealtimeHub {
    user_channels: Arc<RwLock<HashMap<Uuid, ChannelSender>>>,
    mirrors: Arc<RwLock<HashMap<Uuid, NotificationMirror>>>,
    appointments_channel: ChannelSender,
    status: Arc<RwLock<ConnectionStatus>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        let (appointments_channel, _) = broadcast::channel(GLOBAL_CHANNEL_CAPACITY);

        Self {
            user_channels: Arc::new(RwLock::new(HashMap::new())),
            mirrors: Arc::new(RwLock::new(HashMap::new())),
            appointments_channel,
            status: Arc::new(RwLock::new(ConnectionStatus::Connected)),
        }
    }

    /// Subscribe to one user's change feed, creating the channel on first use.
    pub async fn subscribe_user(&self, user_id: Uuid) -> ChannelReceiver {
        let mut channels = self.user_channels.write().await;
        let sender = channels.entry(user_id).or_insert_with(|| {
            debug!("Creating realtime channel for user {}", user_id);
            broadcast::channel(USER_CHANNEL_CAPACITY).0
        });
        sender.subscribe()
    }

    /// Tear down a user's channel and mirror on logout.
    pub async fn remove_user_channel(&self, user_id: Uuid) {
        let mut channels = self.user_channels.write().await;
        channels.remove(&user_id);
        self.mirrors.write().await.remove(&user_id);
        debug!("Removed realtime channel for user {}", user_id);
    }

    /// The user's mirrored notification rows, newest last.
    pub async fn mirror_snapshot(&self, user_id: Uuid) -> Vec<serde_json::Value> {
        let mirrors = self.mirrors.read().await;
        mirrors
            .get(&user_id)
            .map(|mirror| mirror.rows().cloned().collect())
            .unwrap_or_default()
    }

    pub fn subscribe_appointments(&self) -> ChannelReceiver {
        self.appointments_channel.subscribe()
    }

    /// Publish a change event: to the owning user's channel when routed,
    /// and to the global feed when it touches the appointments table.
    pub async fn publish(&self, event: &ChangeEvent) {
        let message = match serde_json::to_string(event) {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to serialize change event: {}", e);
                self.set_status(ConnectionStatus::Degraded).await;
                return;
            }
        };

        if let Some(user_id) = event.user_id {
            if event.table == "notifications" {
                let mut mirrors = self.mirrors.write().await;
                mirrors.entry(user_id).or_default().apply(event);
            }

            let channels = self.user_channels.read().await;
            if let Some(sender) = channels.get(&user_id) {
                if let Err(e) = sender.send(message.clone()) {
                    // All receivers gone; channel stays for the next subscriber
                    debug!("No listeners on channel for user {}: {}", user_id, e);
                }
            }
        }

        if event.table == "appointments" {
            if self.appointments_channel.send(message).is_err() {
                debug!("No listeners on the appointments feed");
            }
        }
    }

    pub async fn active_channels(&self) -> usize {
        self.user_channels.read().await.len()
    }

    pub async fn status(&self) -> ConnectionStatus {
        *self.status.read().await
    }

    pub async fn set_status(&self, status: ConnectionStatus) {
        let mut current = self.status.write().await;
        if *current != status {
            warn!("Realtime hub status changed to {:?}", status);
            *current = status;
        }
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeEventKind;
    use serde_json::json;

    fn event_for(user_id: Uuid, table: &str) -> ChangeEvent {
        ChangeEvent::new(
            table,
            ChangeEventKind::Insert,
            json!({ "id": Uuid::new_v4().to_string() }),
            Some(user_id),
        )
    }

    #[tokio::test]
    async fn subscriber_receives_their_own_events() {
        let hub = RealtimeHub::new();
        let user_id = Uuid::new_v4();
        let mut receiver = hub.subscribe_user(user_id).await;

        hub.publish(&event_for(user_id, "notifications")).await;

        let message = receiver.recv().await.unwrap();
        let event: ChangeEvent = serde_json::from_str(&message).unwrap();
        assert_eq!(event.user_id, Some(user_id));
        assert_eq!(event.table, "notifications");
    }

    #[tokio::test]
    async fn events_are_not_delivered_across_users() {
        let hub = RealtimeHub::new();
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();
        let mut receiver_b = hub.subscribe_user(user_b).await;

        hub.publish(&event_for(user_a, "notifications")).await;
        hub.publish(&event_for(user_b, "notifications")).await;

        let message = receiver_b.recv().await.unwrap();
        let event: ChangeEvent = serde_json::from_str(&message).unwrap();
        assert_eq!(event.user_id, Some(user_b));
        assert!(receiver_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn appointment_changes_reach_the_global_feed() {
        let hub = RealtimeHub::new();
        let mut feed = hub.subscribe_appointments();

        hub.publish(&event_for(Uuid::new_v4(), "appointments")).await;

        let message = feed.recv().await.unwrap();
        let event: ChangeEvent = serde_json::from_str(&message).unwrap();
        assert_eq!(event.table, "appointments");
    }

    #[tokio::test]
    async fn channel_teardown_drops_the_entry() {
        let hub = RealtimeHub::new();
        let user_id = Uuid::new_v4();
        let _receiver = hub.subscribe_user(user_id).await;
        assert_eq!(hub.active_channels().await, 1);

        hub.remove_user_channel(user_id).await;
        assert_eq!(hub.active_channels().await, 0);
    }

    #[tokio::test]
    async fn notification_events_fold_into_the_user_mirror() {
        let hub = RealtimeHub::new();
        let user_id = Uuid::new_v4();
        let row_id = Uuid::new_v4();

        hub.publish(&ChangeEvent::new(
            "notifications",
            ChangeEventKind::Insert,
            json!({ "id": row_id.to_string(), "title": "created" }),
            Some(user_id),
        )).await;
        hub.publish(&event_for(user_id, "notifications")).await;
        hub.publish(&ChangeEvent::new(
            "notifications",
            ChangeEventKind::Delete,
            json!({ "id": row_id.to_string() }),
            Some(user_id),
        )).await;

        // Two inserts, one delete
        assert_eq!(hub.mirror_snapshot(user_id).await.len(), 1);
        // Appointment events never land in the mirror
        hub.publish(&event_for(user_id, "appointments")).await;
        assert_eq!(hub.mirror_snapshot(user_id).await.len(), 1);
    }

    #[tokio::test]
    async fn status_flag_transitions() {
        let hub = RealtimeHub::new();
        assert_eq!(hub.status().await, ConnectionStatus::Connected);

        hub.set_status(ConnectionStatus::Degraded).await;
        assert_eq!(hub.status().await, ConnectionStatus::Degraded);
    }
}
