//! S3 implementation of [`ObjectStore`].
//!
//! Every SDK call goes through [`classify`], which is the only place service
//! and transport failures are told apart. Nothing on these paths panics: a
//! dropped connection or a timeout becomes [`DriverError::Transient`] and the
//! session carries on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials as AwsCredentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as AwsDateTime};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use ftp2s3_core::{ByteReader, DriverError, DriverResult, Ftp2S3Config};

use super::{ListPage, ObjectMeta, ObjectStore, ObjectSummary, StoreOp};

/// Everything needed to address the bucket. Immutable and shared.
#[derive(Debug, Clone)]
pub struct BucketRef {
    /// AWS region of the bucket.
    pub region: String,
    /// Bucket name.
    pub bucket: String,
    /// Static credentials; `None` defers to the SDK default provider chain.
    pub credentials: Option<AwsCredentials>,
    /// Endpoint override for S3-compatible stores (implies path-style).
    pub endpoint_url: Option<String>,
    /// Deadline for a single store operation.
    pub operation_timeout: Duration,
}

impl BucketRef {
    /// Build the bucket reference from process configuration.
    #[must_use]
    pub fn from_config(config: &Ftp2S3Config) -> Self {
        let credentials = (!config.aws_access_key_id.is_empty()).then(|| {
            AwsCredentials::new(
                config.aws_access_key_id.clone(),
                config.aws_secret_access_key.clone(),
                None,
                None,
                "ftp2s3",
            )
        });

        Self {
            region: config.aws_region.clone(),
            bucket: config.aws_bucket_name.clone(),
            credentials,
            endpoint_url: config.aws_endpoint_url.clone(),
            operation_timeout: Duration::from_secs(config.store_timeout_secs),
        }
    }
}

/// [`ObjectStore`] backed by an `aws_sdk_s3::Client`.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: Arc<BucketRef>,
}

impl S3ObjectStore {
    /// Build an S3 client for `bucket`.
    ///
    /// Retries are disabled: each primitive is attempted exactly once and the
    /// configured operation timeout bounds it.
    pub async fn connect(bucket: BucketRef) -> Self {
        let mut builder = if let Some(credentials) = bucket.credentials.clone() {
            aws_sdk_s3::config::Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .credentials_provider(credentials)
        } else {
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(bucket.region.clone()))
                .load()
                .await;
            aws_sdk_s3::config::Builder::from(&shared)
        };

        builder = builder
            .region(Region::new(bucket.region.clone()))
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(bucket.operation_timeout)
                    .build(),
            );
        if let Some(endpoint) = &bucket.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        debug!(
            bucket = %bucket.bucket,
            region = %bucket.region,
            endpoint = ?bucket.endpoint_url,
            static_credentials = bucket.credentials.is_some(),
            "configured S3 client"
        );

        Self::from_client(aws_sdk_s3::Client::from_conf(builder.build()), bucket)
    }

    /// Wrap an already configured client.
    #[must_use]
    pub fn from_client(client: aws_sdk_s3::Client, bucket: BucketRef) -> Self {
        Self {
            client,
            bucket: Arc::new(bucket),
        }
    }

    /// The bucket this store addresses.
    #[must_use]
    pub fn bucket(&self) -> &BucketRef {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_page(
        &self,
        prefix: &str,
        max_keys: i32,
        marker: Option<&str>,
    ) -> DriverResult<ListPage> {
        let output = self
            .client
            .list_objects()
            .bucket(&self.bucket.bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .set_marker(marker.map(ToOwned::to_owned))
            .send()
            .await
            .map_err(|e| classify(StoreOp::List, prefix, e))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|obj| {
                Some(ObjectSummary {
                    key: obj.key()?.to_owned(),
                    size: non_negative(obj.size()),
                    last_modified: to_utc(obj.last_modified()),
                })
            })
            .collect();

        Ok(ListPage {
            objects,
            is_truncated: output.is_truncated().unwrap_or(false),
            next_marker: output.next_marker().map(ToOwned::to_owned),
        })
    }

    async fn head(&self, key: &str) -> DriverResult<ObjectMeta> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(StoreOp::Head, key, e))?;

        Ok(ObjectMeta {
            size: non_negative(output.content_length()),
            last_modified: to_utc(output.last_modified()),
            content_type: output.content_type().map(ToOwned::to_owned),
        })
    }

    async fn get(&self, key: &str) -> DriverResult<ByteReader> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(StoreOp::Get, key, e))?;

        Ok(Box::pin(output.body.into_async_read()))
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> DriverResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| classify(StoreOp::Put, key, e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> DriverResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(StoreOp::Delete, key, e))?;
        Ok(())
    }
}

/// Turn an SDK failure into a [`DriverError`], logging it once.
///
/// Service errors are classified by error code, falling back to the HTTP
/// status for bodiless responses (`HEAD`). Everything else (dispatch
/// failures, timeouts, unparseable responses) is transient.
fn classify<E>(op: StoreOp, key: &str, err: SdkError<E>) -> DriverError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    if let SdkError::ServiceError(service_err) = &err {
        let status = service_err.raw().status().as_u16();
        let code = err.code().unwrap_or_default().to_owned();
        let message = err.message().unwrap_or_default().to_owned();
        warn!(
            operation = %op,
            key,
            status,
            code = %code,
            message = %message,
            "object store returned an error"
        );

        return match (code.as_str(), status) {
            ("NoSuchKey" | "NotFound" | "NoSuchBucket", _) | ("", 404) => DriverError::NotFound {
                key: key.to_owned(),
            },
            ("AccessDenied" | "Forbidden", _) | ("", 403) => DriverError::AccessDenied {
                key: key.to_owned(),
            },
            _ => DriverError::Rejected {
                operation: op.as_str(),
                key: key.to_owned(),
                message: if message.is_empty() {
                    format!("{code} (HTTP {status})")
                } else {
                    format!("{code}: {message}")
                },
            },
        };
    }

    let message = DisplayErrorContext(&err).to_string();
    warn!(operation = %op, key, error = %message, "object store request did not complete");
    DriverError::Transient {
        operation: op.as_str(),
        key: key.to_owned(),
        message,
    }
}

fn non_negative(value: Option<i64>) -> u64 {
    value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0)
}

fn to_utc(value: Option<&AwsDateTime>) -> DateTime<Utc> {
    value
        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or_default()
}
