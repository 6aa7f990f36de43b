//! Saving decoded images into the shared media library.
//!
//! Two strategies exist and exactly one is chosen per process from
//! [`PlatformCapabilities`]:
//!
//! - [`MediatedPersister`] registers an entry with the platform media broker,
//!   streams into the sink it hands back and publishes it.
//! - [`DirectPersister`] stages into a hidden file in the public pictures
//!   directory and renames it over any file of the same name. Concurrent
//!   writes of one name each stage separately; the last rename wins.
//!
//! Neither leaves a visible partial item behind on failure.

use crate::error::PersistError;
use crate::fetcher::DecodedImage;
use async_trait::async_trait;
use bridge_traits::platform::PlatformCapabilities;
use bridge_traits::storage::{FileSystemAccess, MediaEntry, MediaStore, MediaUri};
use bytes::Bytes;
use core_runtime::config::BridgeConfig;
use core_runtime::logging::strip_path;
use image::ImageFormat;
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Formats stored byte-for-byte as downloaded.
const PASSTHROUGH_FORMATS: [ImageFormat; 6] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];

/// Where a persisted image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistedLocation {
    /// Entry owned by the platform media broker
    Media(MediaUri),
    /// File in the public pictures directory
    File(PathBuf),
}

impl fmt::Display for PersistedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistedLocation::Media(uri) => write!(f, "{}", uri),
            PersistedLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStrategy {
    Mediated,
    Direct,
}

/// Writes a decoded image under a display name.
#[async_trait]
pub trait MediaPersister: Send + Sync {
    async fn persist(
        &self,
        image: &DecodedImage,
        display_name: &str,
    ) -> Result<PersistedLocation, PersistError>;

    fn strategy(&self) -> PersistStrategy;
}

/// Bytes and MIME type as they will land in the library.
#[derive(Debug, Clone)]
struct EncodedImage {
    bytes: Bytes,
    mime_type: &'static str,
}

/// Keep common formats verbatim; losslessly re-encode anything else to PNG.
fn encode_for_library(image: &DecodedImage) -> Result<EncodedImage, PersistError> {
    if PASSTHROUGH_FORMATS.contains(&image.format()) {
        return Ok(EncodedImage {
            bytes: image.bytes().clone(),
            mime_type: image.format().to_mime_type(),
        });
    }

    let mut out = Cursor::new(Vec::new());
    image
        .pixels()
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| PersistError::EncodeFailed(e.to_string()))?;

    debug!(from = ?image.format(), "Re-encoded image as PNG");
    Ok(EncodedImage {
        bytes: Bytes::from(out.into_inner()),
        mime_type: ImageFormat::Png.to_mime_type(),
    })
}

/// Persister backed by the platform media broker.
pub struct MediatedPersister {
    store: Arc<dyn MediaStore>,
}

impl MediatedPersister {
    pub fn new(store: Arc<dyn MediaStore>) -> Self {
        Self { store }
    }

    async fn write_entry(&self, uri: &MediaUri, bytes: &Bytes) -> Result<(), PersistError> {
        let mut sink = self
            .store
            .open_write_stream(uri)
            .await
            .map_err(PersistError::store)?;

        sink.write_all(bytes)
            .await
            .map_err(|e| PersistError::IoFailed(e.to_string()))?;
        sink.shutdown()
            .await
            .map_err(|e| PersistError::IoFailed(e.to_string()))?;
        drop(sink);

        self.store.publish(uri).await.map_err(PersistError::io)
    }
}

#[async_trait]
impl MediaPersister for MediatedPersister {
    async fn persist(
        &self,
        image: &DecodedImage,
        display_name: &str,
    ) -> Result<PersistedLocation, PersistError> {
        let encoded = encode_for_library(image)?;
        let entry = MediaEntry::picture(display_name, encoded.mime_type);

        let uri = self
            .store
            .insert(&entry)
            .await
            .map_err(PersistError::store)?
            .ok_or_else(|| {
                PersistError::StoreUnavailable("media store did not create an entry".to_string())
            })?;

        if let Err(err) = self.write_entry(&uri, &encoded.bytes).await {
            if let Err(cleanup) = self.store.delete(&uri).await {
                warn!(uri = %uri, error = %cleanup, "Failed to remove pending media entry");
            }
            return Err(err);
        }

        debug!(uri = %uri, mime_type = encoded.mime_type, "Published media entry");
        Ok(PersistedLocation::Media(uri))
    }

    fn strategy(&self) -> PersistStrategy {
        PersistStrategy::Mediated
    }
}

/// Persister writing into the public pictures directory.
pub struct DirectPersister {
    fs: Arc<dyn FileSystemAccess>,
}

impl DirectPersister {
    pub fn new(fs: Arc<dyn FileSystemAccess>) -> Self {
        Self { fs }
    }

    /// Hidden staging file, unique per write and independent of the name length
    fn partial_path(dir: &Path) -> PathBuf {
        dir.join(format!(".{}.partial", Uuid::new_v4().simple()))
    }

    async fn write_partial(&self, partial: &Path, bytes: &Bytes) -> Result<(), PersistError> {
        let mut file = self
            .fs
            .open_write_stream(partial)
            .await
            .map_err(PersistError::io)?;

        file.write_all(bytes)
            .await
            .map_err(|e| PersistError::IoFailed(e.to_string()))?;
        file.shutdown()
            .await
            .map_err(|e| PersistError::IoFailed(e.to_string()))
    }
}

#[async_trait]
impl MediaPersister for DirectPersister {
    async fn persist(
        &self,
        image: &DecodedImage,
        display_name: &str,
    ) -> Result<PersistedLocation, PersistError> {
        let encoded = encode_for_library(image)?;

        let dir = self
            .fs
            .get_pictures_directory()
            .await
            .map_err(PersistError::io)?;
        self.fs.create_dir_all(&dir).await.map_err(PersistError::io)?;

        let target = dir.join(display_name);
        let partial = Self::partial_path(&dir);

        let written = match self.write_partial(&partial, &encoded.bytes).await {
            Ok(()) => self
                .fs
                .rename(&partial, &target)
                .await
                .map_err(PersistError::io),
            Err(err) => Err(err),
        };

        if let Err(err) = written {
            if let Err(cleanup) = self.fs.delete_file(&partial).await {
                debug!(
                    file = %strip_path(&partial.to_string_lossy()),
                    error = %cleanup,
                    "No partial file to remove"
                );
            }
            return Err(err);
        }

        debug!(file = %strip_path(&target.to_string_lossy()), "Wrote image file");
        Ok(PersistedLocation::File(target))
    }

    fn strategy(&self) -> PersistStrategy {
        PersistStrategy::Direct
    }
}

/// Pick the persister matching the platform's capabilities.
///
/// # Errors
///
/// `CapabilityMissing` when the bridge the capability calls for is absent.
pub fn select_persister(config: &BridgeConfig) -> core_runtime::Result<Arc<dyn MediaPersister>> {
    select_for(
        config.capabilities,
        config.media_store.clone(),
        config.file_system.clone(),
    )
}

fn select_for(
    capabilities: PlatformCapabilities,
    media_store: Option<Arc<dyn MediaStore>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
) -> core_runtime::Result<Arc<dyn MediaPersister>> {
    if capabilities.mediated_media_store {
        let store = media_store.ok_or_else(|| core_runtime::Error::CapabilityMissing {
            capability: "media_store".to_string(),
            message: "Mediated persistence requires a MediaStore bridge".to_string(),
        })?;
        Ok(Arc::new(MediatedPersister::new(store)))
    } else {
        let fs = file_system.ok_or_else(|| core_runtime::Error::CapabilityMissing {
            capability: "file_system".to_string(),
            message: "Direct persistence requires a FileSystemAccess bridge".to_string(),
        })?;
        Ok(Arc::new(DirectPersister::new(fs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::{LocalMediaStore, TokioFileSystem};
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::storage::DynAsyncWrite;
    use image::DynamicImage;
    use mockall::mock;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::AsyncWrite;
    use tokio::sync::Barrier;

    mock! {
        Store {}

        #[async_trait]
        impl MediaStore for Store {
            async fn insert(&self, entry: &MediaEntry) -> BridgeResult<Option<MediaUri>>;
            async fn open_write_stream(&self, uri: &MediaUri) -> BridgeResult<Box<DynAsyncWrite>>;
            async fn publish(&self, uri: &MediaUri) -> BridgeResult<()>;
            async fn delete(&self, uri: &MediaUri) -> BridgeResult<()>;
            async fn read(&self, uri: &MediaUri) -> BridgeResult<Bytes>;
            async fn find_by_display_name(&self, display_name: &str) -> BridgeResult<Vec<MediaUri>>;
        }
    }

    /// Sink that rejects every write, like a full disk
    struct FullDisk;

    impl AsyncWrite for FullDisk {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "no space left")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Desktop store with injectable write and publish failures
    struct FaultyStore {
        inner: LocalMediaStore,
        fail_write: bool,
        fail_publish: bool,
    }

    #[async_trait]
    impl MediaStore for FaultyStore {
        async fn insert(&self, entry: &MediaEntry) -> BridgeResult<Option<MediaUri>> {
            self.inner.insert(entry).await
        }

        async fn open_write_stream(&self, uri: &MediaUri) -> BridgeResult<Box<DynAsyncWrite>> {
            let sink = self.inner.open_write_stream(uri).await?;
            if self.fail_write {
                drop(sink);
                return Ok(Box::new(FullDisk));
            }
            Ok(sink)
        }

        async fn publish(&self, uri: &MediaUri) -> BridgeResult<()> {
            if self.fail_publish {
                return Err(BridgeError::OperationFailed("broker rejected entry".into()));
            }
            self.inner.publish(uri).await
        }

        async fn delete(&self, uri: &MediaUri) -> BridgeResult<()> {
            self.inner.delete(uri).await
        }

        async fn read(&self, uri: &MediaUri) -> BridgeResult<Bytes> {
            self.inner.read(uri).await
        }

        async fn find_by_display_name(&self, display_name: &str) -> BridgeResult<Vec<MediaUri>> {
            self.inner.find_by_display_name(display_name).await
        }
    }

    /// Desktop file system with injectable write and rename behaviour
    struct FaultyFs {
        inner: TokioFileSystem,
        fail_write: bool,
        fail_rename: bool,
        rename_barrier: Option<Arc<Barrier>>,
    }

    impl FaultyFs {
        fn over(dir: &Path) -> Self {
            Self {
                inner: TokioFileSystem::with_pictures_directory(dir.to_path_buf()),
                fail_write: false,
                fail_rename: false,
                rename_barrier: None,
            }
        }
    }

    #[async_trait]
    impl FileSystemAccess for FaultyFs {
        async fn get_pictures_directory(&self) -> BridgeResult<PathBuf> {
            self.inner.get_pictures_directory().await
        }

        async fn exists(&self, path: &Path) -> BridgeResult<bool> {
            self.inner.exists(path).await
        }

        async fn create_dir_all(&self, path: &Path) -> BridgeResult<()> {
            self.inner.create_dir_all(path).await
        }

        async fn read_file(&self, path: &Path) -> BridgeResult<Bytes> {
            self.inner.read_file(path).await
        }

        async fn write_file(&self, path: &Path, data: Bytes) -> BridgeResult<()> {
            self.inner.write_file(path, data).await
        }

        async fn open_write_stream(&self, path: &Path) -> BridgeResult<Box<DynAsyncWrite>> {
            let file = self.inner.open_write_stream(path).await?;
            if self.fail_write {
                drop(file);
                return Ok(Box::new(FullDisk));
            }
            Ok(file)
        }

        async fn rename(&self, from: &Path, to: &Path) -> BridgeResult<()> {
            if let Some(barrier) = &self.rename_barrier {
                barrier.wait().await;
            }
            if self.fail_rename {
                return Err(BridgeError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    "device removed",
                )));
            }
            self.inner.rename(from, to).await
        }

        async fn delete_file(&self, path: &Path) -> BridgeResult<()> {
            self.inner.delete_file(path).await
        }
    }

    fn dir_listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn image_in(format: ImageFormat) -> DecodedImage {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(10, 10)
            .write_to(&mut out, format)
            .unwrap();
        DecodedImage::from_bytes(Bytes::from(out.into_inner())).unwrap()
    }

    #[test]
    fn test_passthrough_keeps_bytes() {
        let image = image_in(ImageFormat::Jpeg);
        let encoded = encode_for_library(&image).unwrap();
        assert_eq!(&encoded.bytes, image.bytes());
        assert_eq!(encoded.mime_type, "image/jpeg");
    }

    #[test]
    fn test_other_formats_become_png() {
        let image = image_in(ImageFormat::Qoi);
        let encoded = encode_for_library(&image).unwrap();
        assert_eq!(encoded.mime_type, "image/png");
        assert_eq!(image::guess_format(&encoded.bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_selection_follows_capabilities() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn MediaStore> =
            Arc::new(LocalMediaStore::with_root(dir.path().to_path_buf()));
        let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::with_pictures_directory(
            dir.path().to_path_buf(),
        ));

        let mediated = select_for(
            PlatformCapabilities::from_api_level(30),
            Some(store.clone()),
            Some(fs.clone()),
        )
        .unwrap();
        assert_eq!(mediated.strategy(), PersistStrategy::Mediated);

        let direct = select_for(PlatformCapabilities::from_api_level(28), None, Some(fs)).unwrap();
        assert_eq!(direct.strategy(), PersistStrategy::Direct);

        assert!(select_for(PlatformCapabilities::photo_library(), None, None).is_err());
    }

    #[tokio::test]
    async fn test_direct_write_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let persister = DirectPersister::new(Arc::new(
            TokioFileSystem::with_pictures_directory(dir.path().to_path_buf()),
        ));

        let location = persister
            .persist(&image_in(ImageFormat::Png), "cat.png")
            .await
            .unwrap();

        assert_eq!(location, PersistedLocation::File(dir.path().join("cat.png")));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["cat.png".to_string()]);
    }

    #[tokio::test]
    async fn test_direct_write_overwrites_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let persister = DirectPersister::new(Arc::new(
            TokioFileSystem::with_pictures_directory(dir.path().to_path_buf()),
        ));

        persister
            .persist(&image_in(ImageFormat::Png), "cat.png")
            .await
            .unwrap();
        let second = image_in(ImageFormat::Bmp);
        persister.persist(&second, "cat.png").await.unwrap();

        let on_disk = std::fs::read(dir.path().join("cat.png")).unwrap();
        assert_eq!(on_disk, second.bytes().to_vec());
    }

    #[tokio::test]
    async fn test_concurrent_direct_writes_of_one_name_both_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = FaultyFs::over(dir.path());
        fs.rename_barrier = Some(Arc::new(Barrier::new(2)));
        let persister = DirectPersister::new(Arc::new(fs));

        let first = image_in(ImageFormat::Png);
        let second = image_in(ImageFormat::Bmp);
        let (a, b) = tokio::join!(
            persister.persist(&first, "cat.png"),
            persister.persist(&second, "cat.png"),
        );

        let target = PersistedLocation::File(dir.path().join("cat.png"));
        assert_eq!(a.unwrap(), target);
        assert_eq!(b.unwrap(), target);
        assert_eq!(dir_listing(dir.path()), vec!["cat.png".to_string()]);

        let on_disk = std::fs::read(dir.path().join("cat.png")).unwrap();
        assert!(on_disk == first.bytes().to_vec() || on_disk == second.bytes().to_vec());
    }

    #[tokio::test]
    async fn test_direct_write_accepts_names_near_the_length_limit() {
        let dir = tempfile::tempdir().unwrap();
        let persister = DirectPersister::new(Arc::new(FaultyFs::over(dir.path())));
        let name = format!("{}.png", "a".repeat(246));

        persister
            .persist(&image_in(ImageFormat::Png), &name)
            .await
            .unwrap();
        assert_eq!(dir_listing(dir.path()), vec![name]);
    }

    #[tokio::test]
    async fn test_failed_direct_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = FaultyFs::over(dir.path());
        fs.fail_write = true;
        let persister = DirectPersister::new(Arc::new(fs));

        let err = persister
            .persist(&image_in(ImageFormat::Png), "cat.png")
            .await
            .unwrap_err();

        assert!(matches!(err, PersistError::IoFailed(_)));
        assert!(dir_listing(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_direct_rename_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cat.png"), b"previous").unwrap();
        let mut fs = FaultyFs::over(dir.path());
        fs.fail_rename = true;
        let persister = DirectPersister::new(Arc::new(fs));

        let err = persister
            .persist(&image_in(ImageFormat::Png), "cat.png")
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(dir_listing(dir.path()), vec!["cat.png".to_string()]);
        assert_eq!(std::fs::read(dir.path().join("cat.png")).unwrap(), b"previous");
    }

    #[tokio::test]
    async fn test_failed_mediated_write_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FaultyStore {
            inner: LocalMediaStore::with_root(dir.path().to_path_buf()),
            fail_write: true,
            fail_publish: false,
        });
        let persister = MediatedPersister::new(store.clone());

        let err = persister
            .persist(&image_in(ImageFormat::Png), "cat.png")
            .await
            .unwrap_err();

        assert!(matches!(err, PersistError::IoFailed(_)));
        assert!(store.find_by_display_name("cat.png").await.unwrap().is_empty());
        assert!(dir_listing(&dir.path().join(".pending")).is_empty());
        assert!(!dir.path().join("Pictures").exists());
    }

    #[tokio::test]
    async fn test_failed_publish_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FaultyStore {
            inner: LocalMediaStore::with_root(dir.path().to_path_buf()),
            fail_write: false,
            fail_publish: true,
        });
        let persister = MediatedPersister::new(store.clone());

        let err = persister
            .persist(&image_in(ImageFormat::Png), "cat.png")
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert!(store.find_by_display_name("cat.png").await.unwrap().is_empty());
        assert!(dir_listing(&dir.path().join(".pending")).is_empty());
    }

    #[tokio::test]
    async fn test_unopenable_sink_deletes_pending_entry() {
        let uri = MediaUri::new("content://media/external/images/media/7");
        let mut store = MockStore::new();
        let inserted = uri.clone();
        store
            .expect_insert()
            .times(1)
            .returning(move |_| Ok(Some(inserted.clone())));
        store
            .expect_open_write_stream()
            .times(1)
            .returning(|_| Err(BridgeError::NotAvailable("resolver gone".into())));
        store.expect_publish().times(0);
        let expected = uri.clone();
        store
            .expect_delete()
            .withf(move |u| *u == expected)
            .times(1)
            .returning(|_| Ok(()));

        let err = MediatedPersister::new(Arc::new(store))
            .persist(&image_in(ImageFormat::Png), "cat.png")
            .await
            .unwrap_err();

        assert!(matches!(err, PersistError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_declined_insert_is_store_unavailable() {
        let mut store = MockStore::new();
        store.expect_insert().times(1).returning(|_| Ok(None));
        store.expect_open_write_stream().times(0);
        store.expect_delete().times(0);

        let err = MediatedPersister::new(Arc::new(store))
            .persist(&image_in(ImageFormat::Png), "cat.png")
            .await
            .unwrap_err();

        assert!(matches!(err, PersistError::StoreUnavailable(_)));
    }
}
