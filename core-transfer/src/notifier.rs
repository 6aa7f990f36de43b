//! Best-effort status notifications.

use bridge_traits::notification::{Notification, NotificationChannelSpec, NotificationPresenter};
use core_runtime::config::BridgeConfig;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Title and body of one user-visible status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Fire-and-forget notification surface.
///
/// The channel is registered lazily on first use and at most once for the
/// lifetime of the sink. A failed registration is retried on the next
/// notification. Presenter failures are logged and dropped.
pub struct NotificationSink {
    presenter: Arc<dyn NotificationPresenter>,
    channel: NotificationChannelSpec,
    notification_id: i32,
    channel_ready: OnceCell<()>,
}

impl NotificationSink {
    pub fn new(
        presenter: Arc<dyn NotificationPresenter>,
        channel: NotificationChannelSpec,
        notification_id: i32,
    ) -> Self {
        Self {
            presenter,
            channel,
            notification_id,
            channel_ready: OnceCell::new(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            config.notification_presenter.clone(),
            config.notification_channel.clone(),
            config.notification_id,
        )
    }

    /// Show a notice, swallowing every failure.
    pub async fn notify(&self, notice: Notice) {
        let registered = self
            .channel_ready
            .get_or_try_init(|| async {
                self.presenter.create_channel(&self.channel).await?;
                debug!(channel = %self.channel.id, "Registered notification channel");
                Ok::<_, bridge_traits::BridgeError>(())
            })
            .await;

        if let Err(e) = registered {
            warn!(channel = %self.channel.id, error = %e, "Notification channel unavailable");
            return;
        }

        let notification = Notification {
            id: self.notification_id,
            channel_id: self.channel.id.clone(),
            title: notice.title,
            body: notice.body,
            auto_cancel: true,
        };

        if let Err(e) = self.presenter.show(notification).await {
            warn!(error = %e, "Failed to show notification");
        }
    }

    /// Show a notice on a background task.
    ///
    /// The caller never waits on the presenter. The handle is only useful to
    /// observe delivery.
    pub fn dispatch(self: &Arc<Self>, notice: Notice) -> JoinHandle<()> {
        let sink = Arc::clone(self);
        tokio::spawn(async move { sink.notify(notice).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use mockall::mock;
    use mockall::predicate::*;

    mock! {
        Presenter {}

        #[async_trait]
        impl NotificationPresenter for Presenter {
            async fn create_channel(&self, channel: &NotificationChannelSpec) -> BridgeResult<()>;
            async fn show(&self, notification: Notification) -> BridgeResult<()>;
        }
    }

    fn channel() -> NotificationChannelSpec {
        NotificationChannelSpec::new("auto_photo_saver_channel", "Auto Photo Saver")
    }

    #[tokio::test]
    async fn test_channel_registered_once() {
        let mut presenter = MockPresenter::new();
        presenter
            .expect_create_channel()
            .with(eq(channel()))
            .times(1)
            .returning(|_| Ok(()));
        presenter
            .expect_show()
            .withf(|n| n.id == 1001 && n.channel_id == "auto_photo_saver_channel")
            .times(2)
            .returning(|_| Ok(()));

        let sink = NotificationSink::new(Arc::new(presenter), channel(), 1001);
        sink.notify(Notice::new("Image Saved", "one")).await;
        sink.notify(Notice::new("Image Saved", "two")).await;
    }

    #[tokio::test]
    async fn test_failed_registration_is_retried() {
        let mut presenter = MockPresenter::new();
        let mut seq = mockall::Sequence::new();
        presenter
            .expect_create_channel()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(BridgeError::NotAvailable("no service".into())));
        presenter
            .expect_create_channel()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        presenter.expect_show().times(1).returning(|_| Ok(()));

        let sink = NotificationSink::new(Arc::new(presenter), channel(), 1001);
        sink.notify(Notice::new("Save Failed", "first")).await;
        sink.notify(Notice::new("Save Failed", "second")).await;
    }

    #[tokio::test]
    async fn test_show_failure_is_swallowed() {
        let mut presenter = MockPresenter::new();
        presenter.expect_create_channel().returning(|_| Ok(()));
        presenter
            .expect_show()
            .returning(|_| Err(BridgeError::OperationFailed("blocked".into())));

        let sink = Arc::new(NotificationSink::new(Arc::new(presenter), channel(), 1001));
        sink.dispatch(Notice::new("Image Saved", "cat.png"))
            .await
            .unwrap();
    }
}
