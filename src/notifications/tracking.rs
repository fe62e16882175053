//! Optimistic and confirmed read tracking, and the merge of a server
//! snapshot against it.

use super::model::{Notification, NotificationId, ReadState};
use std::collections::{HashMap, HashSet};

/// Ids read locally ahead of the server (`optimistic`, with the number of
/// mark-as-read calls still in flight for each) and ids whose mark-as-read
/// is known to have succeeded (`confirmed`).
///
/// An id sits in at most one of the two. `confirmed` only shrinks on
/// deletion or [`ReadTracking::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadTracking {
    optimistic: HashMap<NotificationId, usize>,
    confirmed: HashSet<NotificationId>,
}

impl ReadTracking {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `id` given the read flag the server last reported for it.
    pub fn state_of(&self, id: &NotificationId, server_read: bool) -> ReadState {
        if self.confirmed.contains(id) || server_read {
            ReadState::ConfirmedRead
        } else if self.optimistic.contains_key(id) {
            ReadState::OptimisticRead
        } else {
            ReadState::Unread
        }
    }

    pub fn is_confirmed(&self, id: &NotificationId) -> bool {
        self.confirmed.contains(id)
    }

    pub fn is_optimistic(&self, id: &NotificationId) -> bool {
        self.optimistic.contains_key(id)
    }

    /// Record one more in-flight local read. No-op for confirmed ids.
    pub fn begin(&mut self, id: &NotificationId) {
        if !self.confirmed.contains(id) {
            *self.optimistic.entry(id.clone()).or_insert(0) += 1;
        }
    }

    /// Promote `id` to confirmed.
    pub fn confirm(&mut self, id: &NotificationId) {
        self.optimistic.remove(id);
        self.confirmed.insert(id.clone());
    }

    /// Drop one failed in-flight read of `id`.
    ///
    /// Returns true only when that was the last pending call, i.e. the local
    /// read should now be undone.
    pub fn rollback(&mut self, id: &NotificationId) -> bool {
        let Some(pending) = self.optimistic.get_mut(id) else {
            return false;
        };
        *pending -= 1;
        if *pending > 0 {
            return false;
        }
        self.optimistic.remove(id);
        true
    }

    /// Forget `id` entirely, used when the entity is deleted.
    pub fn remove(&mut self, id: &NotificationId) {
        self.optimistic.remove(id);
        self.confirmed.remove(id);
    }

    pub fn clear(&mut self) {
        self.optimistic.clear();
        self.confirmed.clear();
    }

    pub fn optimistic_len(&self) -> usize {
        self.optimistic.len()
    }

    pub fn confirmed_len(&self) -> usize {
        self.confirmed.len()
    }

    /// Merge a fresh server snapshot into the local view.
    ///
    /// Confirmed ids are always read. Server-reported reads promote the id to
    /// confirmed. Pending optimistic reads stay read until the server catches
    /// up or the mark-as-read call fails. Applying the same snapshot twice
    /// yields the same result.
    pub fn merge(&mut self, snapshot: Vec<Notification>) -> Vec<Notification> {
        snapshot
            .into_iter()
            .map(|mut notification| {
                let state = self.state_of(&notification.id, notification.read);
                if state == ReadState::ConfirmedRead && !self.confirmed.contains(&notification.id) {
                    self.confirm(&notification.id);
                }
                notification.read = state.is_read();
                notification
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn notification(id: &str, read: bool) -> Notification {
        Notification {
            id: NotificationId::from(id),
            title: format!("Title {}", id),
            message: String::new(),
            category: "loan".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            data: serde_json::Value::Null,
            read,
        }
    }

    fn id(s: &str) -> NotificationId {
        NotificationId::from(s)
    }

    #[test]
    fn test_confirmed_is_sticky() {
        let mut tracking = ReadTracking::new();
        tracking.confirm(&id("9"));

        let merged = tracking.merge(vec![notification("9", false)]);
        assert!(merged[0].read);
        assert_eq!(tracking.state_of(&id("9"), false), ReadState::ConfirmedRead);
    }

    #[test]
    fn test_optimistic_survives_stale_snapshot() {
        let mut tracking = ReadTracking::new();
        tracking.begin(&id("1"));

        let merged = tracking.merge(vec![notification("1", false)]);
        assert!(merged[0].read);
        assert!(tracking.is_optimistic(&id("1")));
        assert!(!tracking.is_confirmed(&id("1")));
    }

    #[test]
    fn test_server_read_promotes() {
        let mut tracking = ReadTracking::new();
        tracking.begin(&id("1"));

        let merged = tracking.merge(vec![notification("1", true), notification("2", true)]);
        assert!(merged.iter().all(|n| n.read));
        assert!(tracking.is_confirmed(&id("1")));
        assert!(tracking.is_confirmed(&id("2")));
        assert_eq!(tracking.optimistic_len(), 0);
    }

    #[test]
    fn test_unread_passes_through() {
        let mut tracking = ReadTracking::new();
        let merged = tracking.merge(vec![notification("3", false)]);
        assert!(!merged[0].read);
        assert_eq!(tracking, ReadTracking::new());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let snapshot = vec![
            notification("1", false),
            notification("2", true),
            notification("3", false),
            notification("4", false),
        ];
        let mut tracking = ReadTracking::new();
        tracking.begin(&id("1"));
        tracking.confirm(&id("4"));

        let first = tracking.merge(snapshot.clone());
        let tracking_after_first = tracking.clone();
        let second = tracking.merge(snapshot);

        assert_eq!(first, second);
        assert_eq!(tracking, tracking_after_first);
    }

    #[test]
    fn test_rollback_waits_for_last_pending_call() {
        let mut tracking = ReadTracking::new();
        tracking.begin(&id("7"));
        tracking.begin(&id("7"));

        assert!(!tracking.rollback(&id("7")));
        assert!(tracking.is_optimistic(&id("7")));
        assert!(tracking.rollback(&id("7")));
        assert!(!tracking.is_optimistic(&id("7")));
        assert!(!tracking.rollback(&id("7")));
    }

    #[test]
    fn test_sets_are_disjoint() {
        let mut tracking = ReadTracking::new();
        tracking.begin(&id("5"));
        tracking.confirm(&id("5"));
        tracking.begin(&id("5"));
        assert!(!tracking.is_optimistic(&id("5")));
        assert!(tracking.is_confirmed(&id("5")));

        assert!(!tracking.rollback(&id("5")));
        tracking.remove(&id("5"));
        assert_eq!(tracking.confirmed_len(), 0);
    }
}
