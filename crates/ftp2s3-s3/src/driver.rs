//! [`FileSystemDriver`] over an object store.
//!
//! One [`S3Driver`] exists per FTP session and owns that session's working
//! directory. Everything else (store client, credentials) is shared through
//! the [`S3DriverFactory`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use ftp2s3_core::path::{display, prefix_for, resolve};
use ftp2s3_core::{
    ByteReader, Credentials, DirEntry, DriverError, DriverFactory, DriverResult, FileSystemDriver,
    Ftp2S3Config, UploadSource,
};

use crate::auth::Authenticator;
use crate::listing::DirectoryLister;
use crate::store::ObjectStore;
use crate::transfer::FileTransferAdapter;

/// Per-session driver. The working directory is kept in key form (`""` is the root).
#[derive(Debug)]
pub struct S3Driver {
    working_dir: String,
    auth: Authenticator,
    lister: DirectoryLister,
    transfer: FileTransferAdapter,
}

impl S3Driver {
    /// Create a driver rooted at `/`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        credentials: Arc<Credentials>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            working_dir: String::new(),
            auth: Authenticator::new(credentials),
            lister: DirectoryLister::new(Arc::clone(&store)),
            transfer: FileTransferAdapter::new(store, max_upload_bytes),
        }
    }

    /// Resolve `path` to the key of a single object.
    fn object_key(&self, operation: &'static str, path: &str) -> DriverResult<String> {
        let key = resolve(&self.working_dir, path);
        if key.is_empty() {
            return Err(DriverError::Rejected {
                operation,
                key,
                message: "the root directory is not an object".to_owned(),
            });
        }
        Ok(key)
    }
}

#[async_trait]
impl FileSystemDriver for S3Driver {
    fn authenticate(&self, username: &str, password: &str) -> bool {
        self.auth.authenticate(username, password)
    }

    fn working_directory(&self) -> String {
        display(&self.working_dir)
    }

    async fn size(&self, path: &str) -> DriverResult<u64> {
        let key = self.object_key("size", path)?;
        self.transfer.size(&key).await
    }

    async fn modified_time(&self, path: &str) -> DriverResult<DateTime<Utc>> {
        let key = self.object_key("mdtm", path)?;
        self.transfer.modified_time(&key).await
    }

    async fn change_directory(&mut self, path: &str) -> DriverResult<()> {
        let target = resolve(&self.working_dir, path);
        if !target.is_empty() && !self.lister.exists(&prefix_for(&target)).await? {
            debug!(path, target = %target, "no keys under directory");
            return Err(DriverError::NotFound { key: target });
        }

        debug!(from = %self.working_dir, to = %target, "changed directory");
        self.working_dir = target;
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> DriverResult<Vec<DirEntry>> {
        let prefix = prefix_for(&resolve(&self.working_dir, path));
        self.lister.list(&prefix).await
    }

    async fn delete_directory(&self, path: &str) -> DriverResult<()> {
        debug!(path, "directory removal is not supported");
        Err(DriverError::Unsupported { operation: "rmdir" })
    }

    async fn delete_file(&self, path: &str) -> DriverResult<()> {
        let key = self.object_key("delete", path)?;
        self.transfer.delete(&key).await
    }

    async fn rename(&self, from: &str, to: &str) -> DriverResult<()> {
        debug!(from, to, "rename is not supported");
        Err(DriverError::Unsupported { operation: "rename" })
    }

    async fn make_directory(&self, path: &str) -> DriverResult<()> {
        debug!(path, "directory creation is not supported");
        Err(DriverError::Unsupported { operation: "mkdir" })
    }

    async fn read(&self, path: &str, resume_offset: u64) -> DriverResult<ByteReader> {
        let key = self.object_key("get", path)?;
        self.transfer.read(&key, resume_offset).await
    }

    async fn write(&self, path: &str, source: UploadSource<'_>) -> DriverResult<u64> {
        let key = self.object_key("put", path)?;
        self.transfer.write(&key, source).await
    }
}

/// Hands out one [`S3Driver`] per session over a shared store.
#[derive(Debug, Clone)]
pub struct S3DriverFactory {
    store: Arc<dyn ObjectStore>,
    credentials: Arc<Credentials>,
    max_upload_bytes: u64,
}

impl S3DriverFactory {
    /// Create a factory over `store`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        credentials: Credentials,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            store,
            credentials: Arc::new(credentials),
            max_upload_bytes,
        }
    }

    /// Create a factory with the login and upload limit taken from `config`.
    #[must_use]
    pub fn from_config(store: Arc<dyn ObjectStore>, config: &Ftp2S3Config) -> Self {
        info!(
            username = %config.ftp_username,
            max_upload_bytes = config.max_upload_bytes,
            "driver factory ready"
        );
        Self::new(store, config.credentials(), config.max_upload_bytes)
    }
}

impl DriverFactory for S3DriverFactory {
    fn new_driver(&self) -> Box<dyn FileSystemDriver> {
        Box::new(S3Driver::new(
            Arc::clone(&self.store),
            Arc::clone(&self.credentials),
            self.max_upload_bytes,
        ))
    }
}
