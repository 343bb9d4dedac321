//! Connection liveness, system health and notifications.

use crate::feed::BoundedFeed;
use chrono::Utc;
use parking_lot::RwLock;
use robot_core::{Notification, NotificationLevel, SystemHealth};
use std::sync::Arc;
use uuid::Uuid;

/// Notifications kept.
pub const NOTIFICATION_CAP: usize = 50;

#[derive(Debug)]
struct SystemState {
    connected: bool,
    health: Option<SystemHealth>,
    notifications: BoundedFeed<Notification>,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            connected: false,
            health: None,
            notifications: BoundedFeed::new(NOTIFICATION_CAP),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemStore {
    state: Arc<RwLock<SystemState>>,
}

impl SystemStore {
    pub fn set_connected(&self, connected: bool) {
        self.state.write().connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().connected
    }

    pub fn set_health(&self, health: SystemHealth) {
        self.state.write().health = Some(health);
    }

    pub fn health(&self) -> Option<SystemHealth> {
        self.state.read().health.clone()
    }

    /// Build and push an unread notification stamped now.
    pub fn notify(
        &self,
        level: NotificationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            level,
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
            read: false,
        };
        self.push_notification(notification.clone());
        notification
    }

    pub fn push_notification(&self, notification: Notification) {
        self.state.write().notifications.push(notification);
    }

    /// Newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.read().notifications.to_vec()
    }

    pub fn unread_count(&self) -> usize {
        self.state
            .read()
            .notifications
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    /// Returns false when no notification has this id.
    pub fn mark_read(&self, id: &str) -> bool {
        let mut state = self.state.write();
        match state.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&self) {
        for notification in self.state.write().notifications.iter_mut() {
            notification.read = true;
        }
    }

    pub fn clear_notifications(&self) {
        self.state.write().notifications.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_capped_newest_first() {
        let store = SystemStore::default();
        for i in 0..(NOTIFICATION_CAP + 3) {
            store.notify(NotificationLevel::Info, format!("t{i}"), "body");
        }
        let all = store.notifications();
        assert_eq!(all.len(), NOTIFICATION_CAP);
        assert_eq!(all[0].title, format!("t{}", NOTIFICATION_CAP + 2));
        assert_eq!(store.unread_count(), NOTIFICATION_CAP);
    }

    #[test]
    fn test_mark_read_and_clear() {
        let store = SystemStore::default();
        let first = store.notify(NotificationLevel::Warning, "a", "x");
        store.notify(NotificationLevel::Error, "b", "y");

        assert!(store.mark_read(&first.id));
        assert!(!store.mark_read("missing"));
        assert_eq!(store.unread_count(), 1);

        store.mark_all_read();
        assert_eq!(store.unread_count(), 0);

        store.clear_notifications();
        assert!(store.notifications().is_empty());
    }

    #[test]
    fn test_connection_and_health() {
        let store = SystemStore::default();
        assert!(!store.is_connected());
        assert!(store.health().is_none());

        store.set_connected(true);
        store.set_health(SystemHealth::default());
        assert!(store.is_connected());
        assert!(store.health().is_some());
    }
}
