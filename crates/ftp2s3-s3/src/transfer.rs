//! Single-object transfers: metadata, download, upload, delete.
//!
//! Uploads are buffered whole: the client stream is read to the end, then one
//! `PutObject` is issued. That bounds file size by memory and by
//! `max_upload_bytes`; a multipart upload would slot in behind [`FileTransferAdapter::write`]
//! without touching the driver contract.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use mime::Mime;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use ftp2s3_core::{ByteReader, DriverError, DriverResult, UploadSource};

use crate::store::ObjectStore;

/// Reads and writes whole objects through an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct FileTransferAdapter {
    store: Arc<dyn ObjectStore>,
    max_upload_bytes: u64,
}

impl FileTransferAdapter {
    /// Create an adapter that refuses uploads above `max_upload_bytes`.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, max_upload_bytes: u64) -> Self {
        Self {
            store,
            max_upload_bytes,
        }
    }

    /// Content length of `key`.
    pub async fn size(&self, key: &str) -> DriverResult<u64> {
        Ok(self.store.head(key).await?.size)
    }

    /// Last modification time of `key`.
    pub async fn modified_time(&self, key: &str) -> DriverResult<DateTime<Utc>> {
        Ok(self.store.head(key).await?.last_modified)
    }

    /// Stream the whole object from its first byte.
    ///
    /// `resume_offset` is accepted but not applied: the full body is always
    /// returned. Honouring it needs a ranged `GetObject`.
    pub async fn read(&self, key: &str, resume_offset: u64) -> DriverResult<ByteReader> {
        if resume_offset > 0 {
            debug!(key, resume_offset, "resume offset ignored, streaming from start");
        }
        self.store.get(key).await
    }

    /// Buffer `source` completely, then upload it as one object.
    pub async fn write(&self, key: &str, source: UploadSource<'_>) -> DriverResult<u64> {
        let mut buf = Vec::new();
        source
            .take(self.max_upload_bytes.saturating_add(1))
            .read_to_end(&mut buf)
            .await?;

        let size = buf.len() as u64;
        if size > self.max_upload_bytes {
            return Err(DriverError::EntityTooLarge {
                key: key.to_owned(),
                limit: self.max_upload_bytes,
            });
        }

        let content_type = content_type_for(key);
        self.store
            .put(key, Bytes::from(buf), content_type.as_ref())
            .await?;

        info!(key, size, content_type = %content_type, "stored object");
        Ok(size)
    }

    /// Delete exactly one existing key.
    ///
    /// S3 reports success for missing keys, so existence is checked first.
    pub async fn delete(&self, key: &str) -> DriverResult<()> {
        self.store.head(key).await?;
        self.store.delete(key).await?;
        info!(key, "deleted object");
        Ok(())
    }
}

/// Content type for `key`, from a fixed table keyed by lower-cased extension.
///
/// Unknown or missing extensions map to `application/octet-stream`.
///
/// # Examples
///
/// ```
/// use ftp2s3_s3::transfer::content_type_for;
///
/// assert_eq!(content_type_for("x.txt"), mime::TEXT_PLAIN);
/// assert_eq!(content_type_for("photos/IMG_01.JPG"), mime::IMAGE_JPEG);
/// assert_eq!(content_type_for("blob"), mime::APPLICATION_OCTET_STREAM);
/// ```
#[must_use]
pub fn content_type_for(key: &str) -> Mime {
    let Some(ext) = Path::new(key).extension().and_then(|e| e.to_str()) else {
        return mime::APPLICATION_OCTET_STREAM;
    };

    let essence = match ext.to_ascii_lowercase().as_str() {
        "txt" | "log" | "md" => return mime::TEXT_PLAIN,
        "htm" | "html" => return mime::TEXT_HTML,
        "css" => return mime::TEXT_CSS,
        "csv" => return mime::TEXT_CSV,
        "xml" => return mime::TEXT_XML,
        "js" | "mjs" => return mime::TEXT_JAVASCRIPT,
        "json" => return mime::APPLICATION_JSON,
        "pdf" => return mime::APPLICATION_PDF,
        "png" => return mime::IMAGE_PNG,
        "jpg" | "jpeg" => return mime::IMAGE_JPEG,
        "gif" => return mime::IMAGE_GIF,
        "bmp" => return mime::IMAGE_BMP,
        "svg" => return mime::IMAGE_SVG,
        "woff" => return mime::FONT_WOFF,
        "woff2" => return mime::FONT_WOFF2,
        "webp" => "image/webp",
        "ico" => "image/vnd.microsoft.icon",
        "tif" | "tiff" => "image/tiff",
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "tar" => "application/x-tar",
        "wasm" => "application/wasm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => return mime::APPLICATION_OCTET_STREAM,
    };

    essence
        .parse()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}
