//! Object-store primitives consumed by the driver.
//!
//! [`ObjectStore`] is the narrow seam between the filesystem emulation and a
//! concrete store: one bucket, five primitives, every failure already
//! classified into a [`DriverError`]. [`S3ObjectStore`] talks to S3 through
//! the AWS SDK; [`MemoryObjectStore`] keeps objects in a sorted map and can
//! inject failures for tests.

pub mod memory;
pub mod s3;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use ftp2s3_core::{ByteReader, DriverResult};

pub use memory::MemoryObjectStore;
pub use s3::{BucketRef, S3ObjectStore};

/// Maximum number of keys requested per listing page.
pub const LIST_PAGE_SIZE: i32 = 1000;

/// Store primitive names, used in errors, logs and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// List-by-prefix.
    List,
    /// Metadata lookup.
    Head,
    /// Body download.
    Get,
    /// Full-object upload.
    Put,
    /// Single-key delete.
    Delete,
}

impl StoreOp {
    /// Number of primitives.
    pub const COUNT: usize = 5;

    /// Dense index in `0..COUNT`.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Static name of the primitive.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Head => "head",
            Self::Get => "get",
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One object descriptor from a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Full object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
}

/// One page of a list-by-prefix call.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Objects in key order.
    pub objects: Vec<ObjectSummary>,
    /// Whether more keys follow.
    pub is_truncated: bool,
    /// Marker for the next page, when the store supplies one.
    pub next_marker: Option<String>,
}

/// Result of a metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Content length in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Stored `Content-Type`, if any.
    pub content_type: Option<String>,
}

/// The five primitives of a flat, single-bucket object store.
///
/// Each call is one request; implementations do not retry.
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// List up to `max_keys` objects whose key starts with `prefix`, strictly
    /// after `marker` when given.
    async fn list_page(
        &self,
        prefix: &str,
        max_keys: i32,
        marker: Option<&str>,
    ) -> DriverResult<ListPage>;

    /// Fetch object metadata without the body.
    async fn head(&self, key: &str) -> DriverResult<ObjectMeta>;

    /// Open the object body as a stream.
    async fn get(&self, key: &str) -> DriverResult<ByteReader>;

    /// Upload a complete object, replacing any existing one.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> DriverResult<()>;

    /// Delete a single key.
    async fn delete(&self, key: &str) -> DriverResult<()>;
}
