//! The filesystem-shaped contract between the FTP engine and a storage backend.
//!
//! The engine owns one [`FileSystemDriver`] per connection, obtained from a
//! shared [`DriverFactory`]. Drivers carry the session's working directory,
//! so they are never shared between connections.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;

use crate::error::DriverResult;

/// Streaming object body handed back by [`FileSystemDriver::read`].
pub type ByteReader = Pin<Box<dyn AsyncRead + Send>>;

/// Upload source handed to [`FileSystemDriver::write`].
pub type UploadSource<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirEntry {
    /// A directory synthesized from a `/`-separated key.
    Directory {
        /// First path segment after the listed prefix.
        name: String,
    },
    /// A stored object directly under the listed prefix.
    File {
        /// Full object key.
        key: String,
        /// Key with the listed prefix removed.
        name: String,
        /// Object size in bytes.
        size: u64,
        /// Last modification time reported by the store.
        last_modified: DateTime<Utc>,
    },
}

impl DirEntry {
    /// Entry name relative to the listed directory.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Directory { name } | Self::File { name, .. } => name,
        }
    }

    /// Whether this is a synthesized directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }

    /// Size in bytes; zero for directories.
    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            Self::Directory { .. } => 0,
            Self::File { size, .. } => *size,
        }
    }

    /// Modification time; the Unix epoch for directories.
    #[must_use]
    pub fn last_modified(&self) -> DateTime<Utc> {
        match self {
            Self::Directory { .. } => DateTime::<Utc>::default(),
            Self::File { last_modified, .. } => *last_modified,
        }
    }
}

/// Per-session filesystem operations.
///
/// Paths are client paths: absolute when they start with `/`, otherwise
/// relative to the driver's working directory.
#[async_trait]
pub trait FileSystemDriver: Send + Sync + fmt::Debug {
    /// Check a login attempt against the configured credentials.
    fn authenticate(&self, username: &str, password: &str) -> bool;

    /// Current working directory in client form (always starts with `/`).
    fn working_directory(&self) -> String;

    /// Size in bytes of the object at `path`.
    async fn size(&self, path: &str) -> DriverResult<u64>;

    /// Last modification time of the object at `path`.
    async fn modified_time(&self, path: &str) -> DriverResult<DateTime<Utc>>;

    /// Change the working directory. On error it is left unchanged.
    async fn change_directory(&mut self, path: &str) -> DriverResult<()>;

    /// List the directory at `path`.
    async fn list_directory(&self, path: &str) -> DriverResult<Vec<DirEntry>>;

    /// Remove a directory.
    async fn delete_directory(&self, path: &str) -> DriverResult<()>;

    /// Remove the object at `path`.
    async fn delete_file(&self, path: &str) -> DriverResult<()>;

    /// Move an object.
    async fn rename(&self, from: &str, to: &str) -> DriverResult<()>;

    /// Create a directory.
    async fn make_directory(&self, path: &str) -> DriverResult<()>;

    /// Open the object at `path` for reading. `resume_offset` comes from a
    /// preceding `REST` command.
    async fn read(&self, path: &str, resume_offset: u64) -> DriverResult<ByteReader>;

    /// Store everything `source` yields at `path`, returning the byte count.
    async fn write(&self, path: &str, source: UploadSource<'_>) -> DriverResult<u64>;
}

/// Produces one independent driver per accepted connection.
pub trait DriverFactory: Send + Sync + fmt::Debug {
    /// Create a driver whose working directory is the root.
    fn new_driver(&self) -> Box<dyn FileSystemDriver>;
}
