// libs/notification-cell/src/services/mirror.rs
//
// In-memory mirror of one user's notification rows, fed by the change
// stream. The mirror never computes state of its own: last event wins.

use serde_json::Value;
use uuid::Uuid;

use crate::models::{ChangeEvent, ChangeEventKind};

#[derive(Debug, Default)]
pub struct NotificationMirror {
    rows: Vec<(Uuid, Value)>,
}

impl NotificationMirror {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(|(_, row)| row)
    }

    pub fn get(&self, id: Uuid) -> Option<&Value> {
        self.rows
            .iter()
            .find(|(row_id, _)| *row_id == id)
            .map(|(_, row)| row)
    }

    /// Apply one change event. Inserts of an id already present replace it
    /// (the stream may redeliver); updates of unknown ids insert; deletes of
    /// unknown ids are ignored.
    pub fn apply(&mut self, event: &ChangeEvent) {
        let Some(id) = event.row_id() else {
            return;
        };

        match event.kind {
            ChangeEventKind::Insert | ChangeEventKind::Update => {
                match self.rows.iter_mut().find(|(row_id, _)| *row_id == id) {
                    Some((_, existing)) => *existing = event.row.clone(),
                    None => self.rows.push((id, event.row.clone())),
                }
            }
            ChangeEventKind::Delete => {
                self.rows.retain(|(row_id, _)| *row_id != id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn insert(id: Uuid) -> ChangeEvent {
        ChangeEvent::new(
            "notifications",
            ChangeEventKind::Insert,
            json!({ "id": id.to_string(), "title": "created" }),
            None,
        )
    }

    fn update(id: Uuid, title: &str) -> ChangeEvent {
        ChangeEvent::new(
            "notifications",
            ChangeEventKind::Update,
            json!({ "id": id.to_string(), "title": title }),
            None,
        )
    }

    fn delete(id: Uuid) -> ChangeEvent {
        ChangeEvent::new(
            "notifications",
            ChangeEventKind::Delete,
            json!({ "id": id.to_string() }),
            None,
        )
    }

    #[test]
    fn length_equals_inserts_minus_deletes() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let mut mirror = NotificationMirror::new();

        // Interleave inserts, updates and deletes in an arbitrary order
        mirror.apply(&insert(ids[0]));
        mirror.apply(&insert(ids[1]));
        mirror.apply(&update(ids[0], "changed"));
        mirror.apply(&insert(ids[2]));
        mirror.apply(&delete(ids[1]));
        mirror.apply(&insert(ids[3]));
        mirror.apply(&update(ids[3], "changed"));
        mirror.apply(&insert(ids[4]));
        mirror.apply(&delete(ids[4]));

        // 5 inserts, 2 deletes
        assert_eq!(mirror.len(), 3);
    }

    #[test]
    fn update_replaces_in_place_without_changing_length() {
        let id = Uuid::new_v4();
        let mut mirror = NotificationMirror::new();
        mirror.apply(&insert(id));
        mirror.apply(&update(id, "rewritten"));

        assert_eq!(mirror.len(), 1);
        assert_eq!(mirror.get(id).unwrap()["title"], "rewritten");
    }

    #[test]
    fn delete_of_unknown_id_is_ignored() {
        let mut mirror = NotificationMirror::new();
        mirror.apply(&insert(Uuid::new_v4()));
        mirror.apply(&delete(Uuid::new_v4()));

        assert_eq!(mirror.len(), 1);
    }

    #[test]
    fn redelivered_insert_does_not_duplicate() {
        let id = Uuid::new_v4();
        let mut mirror = NotificationMirror::new();
        mirror.apply(&insert(id));
        mirror.apply(&insert(id));

        assert_eq!(mirror.len(), 1);
    }

    #[test]
    fn event_without_row_id_is_ignored() {
        let mut mirror = NotificationMirror::new();
        let event = ChangeEvent::new(
            "notifications",
            ChangeEventKind::Insert,
            json!({ "title": "no id" }),
            None,
        );
        mirror.apply(&event);
        assert!(mirror.is_empty());
    }
}
