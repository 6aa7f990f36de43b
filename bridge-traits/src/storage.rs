//! Storage Abstractions
//!
//! Platform-agnostic traits for direct file I/O in public directories and for
//! brokered insertion into the shared media store.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Boxed async writer handed out by storage bridges
pub type DynAsyncWrite = dyn tokio::io::AsyncWrite + Send + Unpin;

/// File system access trait
///
/// Abstracts file I/O needed for writing straight into a public directory:
/// - Desktop: `~/Pictures` (XDG / Known Folders)
/// - Android (pre-scoped storage): `Environment.DIRECTORY_PICTURES`
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn save(fs: &dyn FileSystemAccess, data: bytes::Bytes) -> Result<()> {
///     let dir = fs.get_pictures_directory().await?;
///     fs.write_file(&dir.join("cat.png"), data).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the platform's public pictures directory
    async fn get_pictures_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, truncating any existing content
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Open a file for streaming writes, truncating any existing content
    async fn open_write_stream(&self, path: &Path) -> Result<Box<DynAsyncWrite>>;

    /// Atomically move `from` to `to`, replacing `to` if it exists
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;
}

/// Target collection inside the shared media store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaCollection {
    Pictures,
}

impl MediaCollection {
    /// Relative directory name used by stores that expose one
    pub fn relative_path(&self) -> &'static str {
        match self {
            MediaCollection::Pictures => "Pictures",
        }
    }
}

/// Attributes for a new media-store entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    pub display_name: String,
    pub mime_type: String,
    pub collection: MediaCollection,
}

impl MediaEntry {
    pub fn picture(display_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            mime_type: mime_type.into(),
            collection: MediaCollection::Pictures,
        }
    }
}

/// Opaque handle to a media-store entry (content URI, asset identifier)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaUri(pub String);

impl MediaUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mediated media store trait
///
/// A broker that allocates the final storage location for new media:
/// - **Android 10+**: `MediaStore` via `ContentResolver`
/// - **iOS**: `PHPhotoLibrary` change requests
/// - **Desktop**: indexed pictures directory
///
/// Entries are created pending; readers only see them after [`publish`].
/// Inserting an entry with a display name that already exists creates a
/// distinct entry.
///
/// [`publish`]: MediaStore::publish
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Register a new pending entry.
    ///
    /// Returns `Ok(None)` when the store declines to create the entry.
    async fn insert(&self, entry: &MediaEntry) -> Result<Option<MediaUri>>;

    /// Obtain a writable sink for a pending entry
    async fn open_write_stream(&self, uri: &MediaUri) -> Result<Box<DynAsyncWrite>>;

    /// Make a fully written entry visible to users
    async fn publish(&self, uri: &MediaUri) -> Result<()>;

    /// Remove an entry (pending or published)
    async fn delete(&self, uri: &MediaUri) -> Result<()>;

    /// Read back the content of a published entry
    async fn read(&self, uri: &MediaUri) -> Result<Bytes>;

    /// List published entries with the given display name
    async fn find_by_display_name(&self, display_name: &str) -> Result<Vec<MediaUri>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_entry_picture() {
        let entry = MediaEntry::picture("cat.png", "image/png");
        assert_eq!(entry.display_name, "cat.png");
        assert_eq!(entry.mime_type, "image/png");
        assert_eq!(entry.collection, MediaCollection::Pictures);
        assert_eq!(entry.collection.relative_path(), "Pictures");
    }

    #[test]
    fn test_media_uri_display() {
        let uri = MediaUri::new("content://media/external/images/media/42");
        assert_eq!(uri.to_string(), "content://media/external/images/media/42");
        assert_eq!(uri.as_str(), uri.0);
    }
}
