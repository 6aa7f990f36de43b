//! Notification presenter that renders to the log

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    notification::{Notification, NotificationChannelSpec, NotificationPresenter},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Desktop notification presenter
///
/// Desktop builds have no system tray integration; notifications are emitted
/// as `info` events on the `notification` target and the last notification
/// per id is retained for inspection. Showing a notification with an id that
/// is already displayed replaces it, as a system tray would.
#[derive(Clone, Default)]
pub struct TracingNotificationPresenter {
    channels: Arc<RwLock<HashMap<String, NotificationChannelSpec>>>,
    displayed: Arc<RwLock<HashMap<i32, Notification>>>,
}

impl TracingNotificationPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently displayed notifications, ordered by id
    pub async fn shown(&self) -> Vec<Notification> {
        let mut shown: Vec<_> = self.displayed.read().await.values().cloned().collect();
        shown.sort_by_key(|n| n.id);
        shown
    }

    /// The notification displayed under `id`, if any
    pub async fn displayed(&self, id: i32) -> Option<Notification> {
        self.displayed.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl NotificationPresenter for TracingNotificationPresenter {
    async fn create_channel(&self, channel: &NotificationChannelSpec) -> Result<()> {
        self.channels
            .write()
            .await
            .insert(channel.id.clone(), channel.clone());
        Ok(())
    }

    async fn show(&self, notification: Notification) -> Result<()> {
        if !self.channels.read().await.contains_key(&notification.channel_id) {
            return Err(BridgeError::OperationFailed(format!(
                "Notification channel {} was never created",
                notification.channel_id
            )));
        }

        info!(
            target: "notification",
            id = notification.id,
            channel = %notification.channel_id,
            title = %notification.title,
            "{}",
            notification.body
        );

        self.displayed
            .write()
            .await
            .insert(notification.id, notification);
        Ok(())
    }
}
