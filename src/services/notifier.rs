use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::{Notification, NotificationLevel};

/// Notifications kept per session before the oldest are dropped
pub const MAX_PENDING_NOTIFICATIONS: usize = 100;

/// Channel through which user-facing notifications are presented
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Writes notifications to the log only
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Warning | NotificationLevel::Error => warn!(
                kind = ?notification.kind,
                presentation = ?notification.presentation,
                "{}",
                notification.title
            ),
            _ => info!(
                kind = ?notification.kind,
                presentation = ?notification.presentation,
                "{}",
                notification.title
            ),
        }
    }
}

/// Per-session queue drained by the front-end
#[derive(Debug, Default)]
pub struct NotificationOutbox {
    pending: Mutex<VecDeque<Notification>>,
}

impl NotificationOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every pending notification, oldest first
    pub async fn drain(&self) -> Vec<Notification> {
        self.pending.lock().await.drain(..).collect()
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }
}

#[async_trait]
impl Notifier for NotificationOutbox {
    async fn notify(&self, notification: Notification) {
        debug!(kind = ?notification.kind, "Queueing notification");

        let mut pending = self.pending.lock().await;
        if pending.len() >= MAX_PENDING_NOTIFICATIONS {
            pending.pop_front();
        }
        pending.push_back(notification);
    }
}
