//! End-to-end coordinator behaviour with stubbed downloads and real stores.

use async_trait::async_trait;
use bridge_desktop::{LocalMediaStore, TokioFileSystem};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::notification::{Notification, NotificationChannelSpec, NotificationPresenter};
use bridge_traits::platform::{PermissionGate, PermissionStatus};
use bridge_traits::storage::{FileSystemAccess, MediaStore};
use bytes::Bytes;
use core_runtime::events::{CoreEvent, EventBus, TransferEvent};
use core_transfer::{
    DecodedImage, DirectPersister, FetchError, HttpMediaFetcher, InvalidRequest, MediaFetcher,
    MediaPersister, MediatedPersister, NotificationSink, PersistError, PersistedLocation,
    TransferCoordinator, TransferOutcome,
};
use image::{DynamicImage, ImageFormat};
use mockall::mock;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

mock! {
    Fetcher {}

    #[async_trait]
    impl MediaFetcher for Fetcher {
        async fn fetch(&self, url: &str, timeout: Duration) -> Result<DecodedImage, FetchError>;
    }
}

mock! {
    Persister {}

    #[async_trait]
    impl MediaPersister for Persister {
        async fn persist(
            &self,
            image: &DecodedImage,
            display_name: &str,
        ) -> Result<PersistedLocation, PersistError>;
        fn strategy(&self) -> core_transfer::PersistStrategy;
    }
}

mock! {
    Http {}

    #[async_trait]
    impl HttpClient for Http {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

/// Connects, then never delivers a byte; gives up once the read bound elapses.
struct StallingHttp;

#[async_trait]
impl HttpClient for StallingHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        match request.read_timeout {
            Some(bound) => {
                tokio::time::sleep(bound).await;
                Err(BridgeError::Timeout("no data within read bound".into()))
            }
            None => std::future::pending().await,
        }
    }
}

struct RecordingPresenter {
    shown: mpsc::UnboundedSender<Notification>,
    fail_show: bool,
}

#[async_trait]
impl NotificationPresenter for RecordingPresenter {
    async fn create_channel(&self, _channel: &NotificationChannelSpec) -> BridgeResult<()> {
        Ok(())
    }

    async fn show(&self, notification: Notification) -> BridgeResult<()> {
        let _ = self.shown.send(notification);
        if self.fail_show {
            return Err(BridgeError::OperationFailed("notifications blocked".into()));
        }
        Ok(())
    }
}

struct FixedGate(PermissionStatus);

#[async_trait]
impl PermissionGate for FixedGate {
    async fn storage_write_status(&self) -> PermissionStatus {
        self.0
    }

    async fn request_storage_write(&self) {}
}

fn png_10x10() -> Bytes {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::new_rgba8(10, 10)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    Bytes::from(out.into_inner())
}

fn notifier() -> (Arc<NotificationSink>, mpsc::UnboundedReceiver<Notification>) {
    notifier_with(false)
}

fn notifier_with(fail_show: bool) -> (Arc<NotificationSink>, mpsc::UnboundedReceiver<Notification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = NotificationSink::new(
        Arc::new(RecordingPresenter {
            shown: tx,
            fail_show,
        }),
        core_runtime::config::default_notification_channel(),
        1001,
    );
    (Arc::new(sink), rx)
}

async fn single_notification(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Notification {
    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("notification not delivered")
        .expect("presenter dropped");
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(rx.try_recv().is_err(), "more than one notification");
    first
}

#[tokio::test]
async fn test_empty_url_never_touches_io() {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().times(0);
    let mut persister = MockPersister::new();
    persister.expect_persist().times(0);
    let (sink, mut shown) = notifier();

    let coordinator = TransferCoordinator::new(Arc::new(fetcher), Arc::new(persister), sink);
    let outcome = coordinator.run("", "x").await;

    assert_eq!(outcome, TransferOutcome::InvalidRequest(InvalidRequest::MissingUrl));
    assert!(!outcome.is_retryable());
    let notification = single_notification(&mut shown).await;
    assert_eq!(notification.title, "Invalid Request");
    assert_eq!(notification.body, "Missing URL or fileName");
}

#[tokio::test(start_paused = true)]
async fn test_stalled_download_times_out_after_bound() {
    let mut persister = MockPersister::new();
    persister.expect_persist().times(0);
    let (sink, mut shown) = notifier();

    let coordinator = TransferCoordinator::new(
        Arc::new(HttpMediaFetcher::new(Arc::new(StallingHttp))),
        Arc::new(persister),
        sink,
    )
    .with_fetch_timeout(Duration::from_secs(30));

    let started = tokio::time::Instant::now();
    let outcome = coordinator
        .run("https://example.test/slow.png", "slow.png")
        .await;
    let elapsed = started.elapsed();

    assert!(matches!(
        outcome,
        TransferOutcome::DownloadFailed(FetchError::Timeout(_))
    ));
    assert!(outcome.is_retryable());
    assert!(elapsed >= Duration::from_secs(30), "gave up after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(31), "took {:?}", elapsed);
    assert_eq!(single_notification(&mut shown).await.title, "Download Failed");
}

#[tokio::test]
async fn test_non_image_payload_creates_no_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalMediaStore::with_root(dir.path().to_path_buf()));

    let mut http = MockHttp::new();
    http.expect_execute().times(1).returning(|_| {
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::from([("content-type".to_string(), "text/html".to_string())]),
            body: Bytes::from_static(b"<html><body>not a picture</body></html>"),
        })
    });
    let (sink, mut shown) = notifier();

    let coordinator = TransferCoordinator::new(
        Arc::new(HttpMediaFetcher::new(Arc::new(http))),
        Arc::new(MediatedPersister::new(store.clone())),
        sink,
    );
    let outcome = coordinator
        .run("https://example.test/cat.png", "cat.png")
        .await;

    assert!(matches!(
        outcome,
        TransferOutcome::DownloadFailed(FetchError::DecodeFailed(_))
    ));
    assert!(store.find_by_display_name("cat.png").await.unwrap().is_empty());
    assert!(!dir.path().join("Pictures").exists());
    assert_eq!(single_notification(&mut shown).await.title, "Download Failed");
}

#[tokio::test]
async fn test_saves_png_through_media_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalMediaStore::with_root(dir.path().to_path_buf()));
    let payload = png_10x10();

    let mut fetcher = MockFetcher::new();
    let image = DecodedImage::from_bytes(payload.clone()).unwrap();
    fetcher
        .expect_fetch()
        .withf(|url, timeout| {
            url == "https://example.test/cat.png" && *timeout == Duration::from_secs(30)
        })
        .times(1)
        .returning(move |_, _| Ok(image.clone()));
    let (sink, mut shown) = notifier();

    let coordinator = TransferCoordinator::new(
        Arc::new(fetcher),
        Arc::new(MediatedPersister::new(store.clone())),
        sink,
    );
    let outcome = coordinator
        .run("https://example.test/cat.png", "cat.png")
        .await;

    assert!(outcome.is_success(), "{}", outcome);
    let entries = store.find_by_display_name("cat.png").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(store.read(&entries[0]).await.unwrap(), payload);
    assert_eq!(outcome, TransferOutcome::Success(PersistedLocation::Media(entries[0].clone())));

    let notification = single_notification(&mut shown).await;
    assert_eq!(notification.id, 1001);
    assert_eq!(notification.channel_id, "auto_photo_saver_channel");
    assert_eq!(notification.title, "Image Saved");
    assert_eq!(notification.body, "New photo saved to gallery: cat.png");
}

#[tokio::test]
async fn test_direct_write_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let fs = Arc::new(TokioFileSystem::with_pictures_directory(dir.path().to_path_buf()));
    let payload = png_10x10();

    let mut fetcher = MockFetcher::new();
    let image = DecodedImage::from_bytes(payload.clone()).unwrap();
    fetcher
        .expect_fetch()
        .returning(move |_, _| Ok(image.clone()));
    let (sink, _shown) = notifier();

    let coordinator = TransferCoordinator::new(
        Arc::new(fetcher),
        Arc::new(DirectPersister::new(fs.clone())),
        sink,
    );
    let outcome = coordinator
        .run("https://example.test/cat.png", "cat.png")
        .await;

    let target = dir.path().join("cat.png");
    assert_eq!(outcome, TransferOutcome::Success(PersistedLocation::File(target.clone())));
    assert_eq!(fs.read_file(&target).await.unwrap(), payload);
}

#[tokio::test]
async fn test_same_name_creates_distinct_media_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalMediaStore::with_root(dir.path().to_path_buf()));

    let mut fetcher = MockFetcher::new();
    let image = DecodedImage::from_bytes(png_10x10()).unwrap();
    fetcher
        .expect_fetch()
        .times(2)
        .returning(move |_, _| Ok(image.clone()));
    let (sink, _shown) = notifier();

    let coordinator = TransferCoordinator::new(
        Arc::new(fetcher),
        Arc::new(MediatedPersister::new(store.clone())),
        sink,
    );
    assert!(coordinator.run("https://example.test/a.png", "cat.png").await.is_success());
    assert!(coordinator.run("https://example.test/b.png", "cat.png").await.is_success());

    assert_eq!(store.find_by_display_name("cat.png").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_denied_permission_skips_fetch() {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().times(0);
    let mut persister = MockPersister::new();
    persister.expect_persist().times(0);
    let (sink, mut shown) = notifier();

    let coordinator = TransferCoordinator::new(Arc::new(fetcher), Arc::new(persister), sink)
        .with_permission_gate(Arc::new(FixedGate(PermissionStatus::Denied)));
    let outcome = coordinator
        .run("https://example.test/cat.png", "cat.png")
        .await;

    assert!(matches!(
        outcome,
        TransferOutcome::PersistFailed(PersistError::PermissionDenied(_))
    ));
    assert_eq!(outcome.error_code(), Some("PERMISSION_DENIED"));
    assert!(!outcome.is_retryable());
    assert_eq!(single_notification(&mut shown).await.title, "Permission Denied");
}

#[tokio::test]
async fn test_transient_store_failure_is_retryable() {
    let mut fetcher = MockFetcher::new();
    let image = DecodedImage::from_bytes(png_10x10()).unwrap();
    fetcher
        .expect_fetch()
        .returning(move |_, _| Ok(image.clone()));
    let mut persister = MockPersister::new();
    persister
        .expect_persist()
        .times(1)
        .returning(|_, _| Err(PersistError::StoreUnavailable("broker restarting".into())));
    let (sink, mut shown) = notifier();

    let coordinator = TransferCoordinator::new(Arc::new(fetcher), Arc::new(persister), sink);
    let outcome = coordinator
        .run("https://example.test/cat.png", "cat.png")
        .await;

    assert_eq!(outcome.error_code(), Some("SAVE_FAILED"));
    assert!(outcome.is_retryable());
    let notification = single_notification(&mut shown).await;
    assert_eq!(notification.title, "Save Failed");
    assert_eq!(notification.body, "Failed to save image to gallery");
}

#[tokio::test]
async fn test_notification_failure_keeps_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let fs: Arc<dyn FileSystemAccess> =
        Arc::new(TokioFileSystem::with_pictures_directory(dir.path().to_path_buf()));

    let mut fetcher = MockFetcher::new();
    let image = DecodedImage::from_bytes(png_10x10()).unwrap();
    fetcher
        .expect_fetch()
        .returning(move |_, _| Ok(image.clone()));
    let (sink, mut shown) = notifier_with(true);

    let coordinator =
        TransferCoordinator::new(Arc::new(fetcher), Arc::new(DirectPersister::new(fs)), sink);
    let outcome = coordinator
        .run("https://example.test/cat.png", "cat.png")
        .await;

    assert!(outcome.is_success());
    assert_eq!(single_notification(&mut shown).await.title, "Image Saved");
}

#[tokio::test]
async fn test_transfer_events_published() {
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_fetch()
        .returning(|_, _| Err(FetchError::ConnectionFailed("refused".into())));
    let mut persister = MockPersister::new();
    persister.expect_persist().times(0);
    let (sink, _shown) = notifier();

    let bus = EventBus::new(8);
    let mut events = bus.subscribe();
    let coordinator = TransferCoordinator::new(Arc::new(fetcher), Arc::new(persister), sink)
        .with_event_bus(bus);
    coordinator
        .run("https://example.test/cat.png", "cat.png")
        .await;

    match events.recv().await.unwrap() {
        CoreEvent::Transfer(TransferEvent::Started { display_name, .. }) => {
            assert_eq!(display_name, "cat.png")
        }
        other => panic!("unexpected event {:?}", other),
    }
    match events.recv().await.unwrap() {
        CoreEvent::Transfer(TransferEvent::Failed {
            code, retryable, ..
        }) => {
            assert_eq!(code, "DOWNLOAD_FAILED");
            assert!(retryable);
        }
        other => panic!("unexpected event {:?}", other),
    }
}
