//! Process configuration for ftp2s3.
//!
//! Provides [`Ftp2S3Config`], built once at startup and passed by reference to
//! the driver factory and the FTP server. Every field has a default, so
//! `Ftp2S3Config::default()` is a usable local configuration apart from the
//! bucket name for the S3 backend. The server binary layers command-line
//! flags and environment variables on top.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{Ftp2S3Error, Ftp2S3Result};
use crate::types::Credentials;

/// Largest object a single S3 `PutObject` request accepts (5 GiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Which object store implementation backs the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Amazon S3 or an S3-compatible endpoint.
    #[default]
    S3,
    /// Process-local in-memory store, for development and tests.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = Ftp2S3Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(Ftp2S3Error::Config(format!(
                "unknown store backend: {other} (expected \"s3\" or \"memory\")"
            ))),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S3 => f.write_str("s3"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// ftp2s3 configuration.
///
/// # Examples
///
/// ```
/// use ftp2s3_core::Ftp2S3Config;
///
/// let config = Ftp2S3Config::default();
/// assert_eq!(config.port, 2121);
/// assert_eq!(config.ftp_username, "ftp2s3");
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct Ftp2S3Config {
    /// Host the control listener binds to.
    #[builder(default = String::from("127.0.0.1"))]
    pub host: String,

    /// Port the control listener binds to.
    #[builder(default = 2121)]
    pub port: u16,

    /// The single FTP login name.
    #[builder(default = String::from("ftp2s3"))]
    pub ftp_username: String,

    /// The single FTP password.
    #[builder(default = String::from("ftp2s3"))]
    pub ftp_password: String,

    /// Name announced in the FTP greeting.
    #[builder(default = String::from("FTP2S3"))]
    pub server_name: String,

    /// AWS region of the bucket.
    #[builder(default = String::from("us-east-1"))]
    pub aws_region: String,

    /// Static access key ID. Empty means "use the SDK default provider chain".
    #[builder(default)]
    pub aws_access_key_id: String,

    /// Static secret access key.
    #[builder(default)]
    pub aws_secret_access_key: String,

    /// Bucket every session operates in.
    #[builder(default)]
    pub aws_bucket_name: String,

    /// Endpoint override for S3-compatible stores.
    #[builder(default)]
    pub aws_endpoint_url: Option<String>,

    /// Lowest port handed out for passive data connections.
    #[builder(default = 42_000)]
    pub passive_port_low: u16,

    /// Highest port handed out for passive data connections.
    #[builder(default = 45_000)]
    pub passive_port_high: u16,

    /// Address advertised in `227` replies. Defaults to the control
    /// connection's local address.
    #[builder(default)]
    pub passive_address: Option<String>,

    /// Uploads larger than this are refused before reaching the store.
    #[builder(default = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: u64,

    /// Per-operation deadline for store calls, in seconds.
    #[builder(default = 60)]
    pub store_timeout_secs: u64,

    /// Store implementation.
    #[builder(default)]
    pub store_backend: StoreBackend,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl fmt::Debug for Ftp2S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ftp2S3Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ftp_username", &self.ftp_username)
            .field("ftp_password", &"***")
            .field("server_name", &self.server_name)
            .field("aws_region", &self.aws_region)
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field(
                "aws_secret_access_key",
                &(!self.aws_secret_access_key.is_empty()).then_some("***"),
            )
            .field("aws_bucket_name", &self.aws_bucket_name)
            .field("aws_endpoint_url", &self.aws_endpoint_url)
            .field("passive_port_low", &self.passive_port_low)
            .field("passive_port_high", &self.passive_port_high)
            .field("passive_address", &self.passive_address)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("store_timeout_secs", &self.store_timeout_secs)
            .field("store_backend", &self.store_backend)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Default for Ftp2S3Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Ftp2S3Config {
    /// Check cross-field constraints that the defaults cannot guarantee.
    pub fn validate(&self) -> Ftp2S3Result<()> {
        if self.ftp_username.is_empty() || self.ftp_password.is_empty() {
            return Err(Ftp2S3Error::Config(
                "FTP username and password must not be empty".to_owned(),
            ));
        }
        if self.store_backend == StoreBackend::S3 && self.aws_bucket_name.is_empty() {
            return Err(Ftp2S3Error::Config(
                "AWS_BUCKET_NAME is required for the s3 store backend".to_owned(),
            ));
        }
        if self.passive_port_low == 0 || self.passive_port_low > self.passive_port_high {
            return Err(Ftp2S3Error::Config(format!(
                "invalid passive port range {}-{}",
                self.passive_port_low, self.passive_port_high
            )));
        }
        if self.store_timeout_secs == 0 {
            return Err(Ftp2S3Error::Config(
                "store timeout must be at least one second".to_owned(),
            ));
        }
        Ok(())
    }

    /// `host:port` of the control listener.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The login pair every session authenticates against.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.ftp_username.clone(), self.ftp_password.clone())
    }
}
