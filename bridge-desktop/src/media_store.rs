//! Pictures directory acting as a mediated media store

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{DynAsyncWrite, MediaCollection, MediaEntry, MediaStore, MediaUri},
};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

const URI_SCHEME: &str = "media://";
const PENDING_DIR: &str = ".pending";

/// An inserted entry that has not been published yet
#[derive(Debug, Clone)]
struct PendingEntry {
    pending_path: PathBuf,
    target: PathBuf,
}

/// Desktop media store
///
/// The final file name is reserved on insert, appending ` (n)` when the
/// display name is already taken on disk or by another pending entry, and the
/// URI names that file: `media://<collection>/<file name>`. Content is written
/// to a hidden pending area under the volume root and moved into place on
/// publish.
///
/// Only pending entries are tracked in memory. Published entries are resolved
/// from the directory, so a fresh store over the same root sees them too.
pub struct LocalMediaStore {
    root: PathBuf,
    pending: Arc<Mutex<HashMap<MediaUri, PendingEntry>>>,
}

impl LocalMediaStore {
    /// Store rooted at the user's home directory
    pub fn new() -> Self {
        Self::with_root(dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Store rooted at a custom volume directory
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            root,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn uri_for(collection: MediaCollection, file_name: &str) -> MediaUri {
        MediaUri::new(format!(
            "{}{}/{}",
            URI_SCHEME,
            collection.relative_path(),
            file_name
        ))
    }

    /// Published location a URI refers to
    fn path_for(&self, uri: &MediaUri) -> Result<PathBuf> {
        let relative = uri
            .as_str()
            .strip_prefix(URI_SCHEME)
            .ok_or_else(|| BridgeError::OperationFailed(format!("Unknown media URI: {}", uri)))?;
        let (collection, file_name) = relative
            .split_once('/')
            .ok_or_else(|| Self::unknown(uri))?;
        if !is_plain_file_name(collection) || !is_plain_file_name(file_name) {
            return Err(Self::unknown(uri));
        }
        Ok(self.root.join(collection).join(file_name))
    }

    fn unknown(uri: &MediaUri) -> BridgeError {
        BridgeError::OperationFailed(format!("No media entry for {}", uri))
    }

    /// First name among `name`, `name (1)`, `name (2)`, ... that is neither on
    /// disk nor reserved.
    async fn allocate_path(
        dir: &Path,
        display_name: &str,
        reserved: &HashSet<PathBuf>,
    ) -> Result<PathBuf> {
        let (stem, ext) = split_display_name(display_name);

        let mut n = 0u32;
        loop {
            let name = match (n, ext) {
                (0, _) => display_name.to_string(),
                (_, Some(ext)) => format!("{} ({}).{}", stem, n, ext),
                (_, None) => format!("{} ({})", stem, n),
            };
            let candidate = dir.join(name);
            if !reserved.contains(&candidate) && !fs::try_exists(&candidate).await? {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}

impl Default for LocalMediaStore {
    fn default() -> Self {
        Self::new()
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

fn split_display_name(display_name: &str) -> (&str, Option<&str>) {
    match display_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (display_name, None),
    }
}

/// Whether `file_name` is `display_name` or one of its ` (n)` variants
fn allocated_from(file_name: &str, display_name: &str) -> bool {
    if file_name == display_name {
        return true;
    }

    let (stem, ext) = split_display_name(display_name);
    let rest = match ext {
        Some(ext) => file_name
            .strip_suffix(ext)
            .and_then(|s| s.strip_suffix('.')),
        None => Some(file_name),
    };

    rest.and_then(|s| s.strip_prefix(stem))
        .and_then(|s| s.strip_prefix(" ("))
        .and_then(|s| s.strip_suffix(')'))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn insert(&self, entry: &MediaEntry) -> Result<Option<MediaUri>> {
        if !is_plain_file_name(&entry.display_name) {
            return Err(BridgeError::OperationFailed(format!(
                "Invalid display name: {}",
                entry.display_name
            )));
        }

        let pending_dir = self.root.join(PENDING_DIR);
        fs::create_dir_all(&pending_dir).await?;
        let dir = self.root.join(entry.collection.relative_path());

        // Held across allocation so two pending entries never reserve one name
        let mut pending = self.pending.lock().await;
        let reserved: HashSet<PathBuf> = pending.values().map(|p| p.target.clone()).collect();
        let target = Self::allocate_path(&dir, &entry.display_name, &reserved).await?;
        let file_name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let uri = Self::uri_for(entry.collection, &file_name);

        pending.insert(
            uri.clone(),
            PendingEntry {
                pending_path: pending_dir.join(uuid::Uuid::new_v4().to_string()),
                target,
            },
        );

        debug!(uri = %uri, mime_type = %entry.mime_type, "Inserted pending media entry");
        Ok(Some(uri))
    }

    async fn open_write_stream(&self, uri: &MediaUri) -> Result<Box<DynAsyncWrite>> {
        let pending_path = self
            .pending
            .lock()
            .await
            .get(uri)
            .map(|entry| entry.pending_path.clone());
        let path = match pending_path {
            Some(path) => path,
            None if fs::try_exists(self.path_for(uri)?).await? => {
                return Err(BridgeError::OperationFailed(format!(
                    "Media entry {} is already published",
                    uri
                )));
            }
            None => return Err(Self::unknown(uri)),
        };

        let file = fs::File::create(&path).await?;
        Ok(Box::new(file))
    }

    async fn publish(&self, uri: &MediaUri) -> Result<()> {
        let mut pending = self.pending.lock().await;
        let Some(entry) = pending.get(uri) else {
            return if fs::try_exists(self.path_for(uri)?).await? {
                Ok(())
            } else {
                Err(Self::unknown(uri))
            };
        };

        if let Some(dir) = entry.target.parent() {
            fs::create_dir_all(dir).await?;
        }
        fs::rename(&entry.pending_path, &entry.target).await?;
        pending.remove(uri);

        debug!(uri = %uri, "Published media entry");
        Ok(())
    }

    async fn delete(&self, uri: &MediaUri) -> Result<()> {
        let removed = self.pending.lock().await.remove(uri);
        let path = match removed {
            Some(entry) => entry.pending_path,
            None => self.path_for(uri)?,
        };

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        debug!(uri = %uri, "Deleted media entry");
        Ok(())
    }

    async fn read(&self, uri: &MediaUri) -> Result<Bytes> {
        if self.pending.lock().await.contains_key(uri) {
            return Err(Self::unknown(uri));
        }

        match fs::read(self.path_for(uri)?).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Self::unknown(uri)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_display_name(&self, display_name: &str) -> Result<Vec<MediaUri>> {
        let collection = MediaCollection::Pictures;
        let dir = self.root.join(collection.relative_path());
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_file() && allocated_from(&name, display_name) {
                found.push(Self::uri_for(collection, &name));
            }
        }
        found.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(found)
    }
}
