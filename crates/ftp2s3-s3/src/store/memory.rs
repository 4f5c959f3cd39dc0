//! In-memory [`ObjectStore`].
//!
//! Keys live in a `BTreeMap` so listings come back in key order, which is
//! what marker-based pagination relies on. Faults can be injected per
//! primitive and key to exercise the failure paths of the driver.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::trace;

use ftp2s3_core::{ByteReader, DriverError, DriverResult, ErrorKind};

use super::{ListPage, ObjectMeta, ObjectStore, ObjectSummary, StoreOp};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Fault {
    op: StoreOp,
    target: String,
    kind: ErrorKind,
}

/// Thread-safe in-memory object store.
///
/// # Examples
///
/// ```
/// use ftp2s3_s3::store::{MemoryObjectStore, ObjectStore};
///
/// # tokio_test::block_on(async {
/// let store = MemoryObjectStore::new();
/// store.insert("a/b.txt", "hello");
/// let meta = store.head("a/b.txt").await.unwrap();
/// assert_eq!(meta.size, 5);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    faults: RwLock<Vec<Fault>>,
    calls: [AtomicUsize; StoreOp::COUNT],
}

impl MemoryObjectStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing fault injection.
    pub fn insert(&self, key: impl Into<String>, body: impl Into<Bytes>) {
        self.objects.write().insert(
            key.into(),
            StoredObject {
                body: body.into(),
                content_type: mime::APPLICATION_OCTET_STREAM.to_string(),
                last_modified: Utc::now(),
            },
        );
    }

    /// Make every future `op` call on `target` fail with `kind`.
    ///
    /// For [`StoreOp::List`] the target is the marker of the page to fail
    /// (`""` for the first page); for every other primitive it is the key.
    pub fn inject_fault(&self, op: StoreOp, target: impl Into<String>, kind: ErrorKind) {
        self.faults.write().push(Fault {
            op,
            target: target.into(),
            kind,
        });
    }

    /// Drop all injected faults.
    pub fn clear_faults(&self) {
        self.faults.write().clear();
    }

    /// Raw body of `key`, if present.
    #[must_use]
    pub fn body(&self, key: &str) -> Option<Bytes> {
        self.objects.read().get(key).map(|o| o.body.clone())
    }

    /// Stored content type of `key`, if present.
    #[must_use]
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.read().get(key).map(|o| o.content_type.clone())
    }

    /// All keys in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    /// Number of calls made for `op` so far.
    #[must_use]
    pub fn call_count(&self, op: StoreOp) -> usize {
        self.calls[op.index()].load(Ordering::Relaxed)
    }

    fn check(&self, op: StoreOp, target: &str) -> DriverResult<()> {
        self.calls[op.index()].fetch_add(1, Ordering::Relaxed);
        let faults = self.faults.read();
        let Some(fault) = faults.iter().find(|f| f.op == op && f.target == target) else {
            return Ok(());
        };
        trace!(operation = %op, fault_target = target, kind = %fault.kind, "injected store fault");

        let key = target.to_owned();
        Err(match fault.kind {
            ErrorKind::NotFound => DriverError::NotFound { key },
            ErrorKind::AccessDenied => DriverError::AccessDenied { key },
            ErrorKind::Rejected => DriverError::Rejected {
                operation: op.as_str(),
                key,
                message: "InternalError: injected".to_owned(),
            },
            ErrorKind::Transient | ErrorKind::Unsupported => DriverError::Transient {
                operation: op.as_str(),
                key,
                message: "connection reset by peer (injected)".to_owned(),
            },
        })
    }

    fn lookup(&self, key: &str) -> DriverResult<StoredObject> {
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| DriverError::NotFound {
                key: key.to_owned(),
            })
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_page(
        &self,
        prefix: &str,
        max_keys: i32,
        marker: Option<&str>,
    ) -> DriverResult<ListPage> {
        self.check(StoreOp::List, marker.unwrap_or_default())?;

        let max_keys = usize::try_from(max_keys).unwrap_or(0);
        let objects = self.objects.read();
        let mut matching = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| marker.is_none_or(|m| key.as_str() > m));

        let page: Vec<ObjectSummary> = matching
            .by_ref()
            .take(max_keys)
            .map(|(key, obj)| ObjectSummary {
                key: key.clone(),
                size: obj.body.len() as u64,
                last_modified: obj.last_modified,
            })
            .collect();
        let is_truncated = matching.next().is_some();

        // Like S3 v1 listings without a delimiter: no NextMarker, callers
        // continue from the last key.
        Ok(ListPage {
            objects: page,
            is_truncated,
            next_marker: None,
        })
    }

    async fn head(&self, key: &str) -> DriverResult<ObjectMeta> {
        self.check(StoreOp::Head, key)?;
        let obj = self.lookup(key)?;
        Ok(ObjectMeta {
            size: obj.body.len() as u64,
            last_modified: obj.last_modified,
            content_type: Some(obj.content_type),
        })
    }

    async fn get(&self, key: &str) -> DriverResult<ByteReader> {
        self.check(StoreOp::Get, key)?;
        let obj = self.lookup(key)?;
        Ok(Box::pin(Cursor::new(obj.body)))
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> DriverResult<()> {
        self.check(StoreOp::Put, key)?;
        self.objects.write().insert(
            key.to_owned(),
            StoredObject {
                body,
                content_type: content_type.to_owned(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> DriverResult<()> {
        self.check(StoreOp::Delete, key)?;
        // S3 deletes are idempotent; so is this.
        self.objects.write().remove(key);
        Ok(())
    }
}
