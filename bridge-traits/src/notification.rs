//! User-visible notification surface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Channel importance (maps to Android `NotificationManager.IMPORTANCE_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NotificationImportance {
    Min,
    Low,
    Default,
    High,
}

/// Notification channel/category definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannelSpec {
    pub id: String,
    pub name: String,
    pub description: String,
    pub importance: NotificationImportance,
}

impl NotificationChannelSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            importance: NotificationImportance::Low,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_importance(mut self, importance: NotificationImportance) -> Self {
        self.importance = importance;
        self
    }
}

/// A single status notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Platform notification id; reusing an id replaces the previous notification
    pub id: i32,
    pub channel_id: String,
    pub title: String,
    pub body: String,
    /// Dismiss when tapped
    pub auto_cancel: bool,
}

/// Notification presenter trait
///
/// - **Android**: `NotificationManager` + `NotificationCompat.Builder`
/// - **iOS**: `UNUserNotificationCenter`
/// - **Desktop**: structured log line (no system tray integration)
#[async_trait]
pub trait NotificationPresenter: Send + Sync {
    /// Create (or update) a notification channel.
    ///
    /// Creating an existing channel again must be harmless.
    async fn create_channel(&self, channel: &NotificationChannelSpec) -> Result<()>;

    /// Post a notification on a previously created channel
    async fn show(&self, notification: Notification) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_builder() {
        let channel = NotificationChannelSpec::new("auto_photo_saver_channel", "Auto Photo Saver")
            .with_description("Background photo processing notifications")
            .with_importance(NotificationImportance::Low);

        assert_eq!(channel.id, "auto_photo_saver_channel");
        assert_eq!(channel.name, "Auto Photo Saver");
        assert_eq!(channel.importance, NotificationImportance::Low);
        assert!(!channel.description.is_empty());
    }
}
