//! User-visible notifications
//!
//! The recorder reports outcomes the user should see (saved, deleted, failed
//! to start) through a [`Notifier`]. How they are shown is up to the
//! presentation layer.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error => tracing::warn!("{}", notification.message),
            _ => tracing::info!("{}", notification.message),
        }
    }
}

/// Keeps every notification, for inspection in tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    pub received: parking_lot::Mutex<Vec<Notification>>,
}

#[cfg(test)]
impl CollectingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.received.lock().iter().map(|n| n.message.clone()).collect()
    }

    pub fn last(&self) -> Option<Notification> {
        self.received.lock().last().cloned()
    }
}

#[cfg(test)]
impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        self.received.lock().push(notification);
    }
}
